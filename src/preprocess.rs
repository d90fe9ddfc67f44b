//! Source clean-up ahead of every other pass.
//!
//! Line endings and trailing whitespace are normalised and text is brought to
//! NFC. `#@` preprocessor lines are dropped here; surviving lines keep the line
//! number they had in the author's file so later errors point at it.

use crate::error::{CompileError, Location};
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static RE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#@([a-z_]+)(?:\((.*)\))?").unwrap());
static RE_CONTROL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x08\x0b-\x1f\x7f]").unwrap());

/// Chapter text after preprocessing: the surviving lines and the 1-based line
/// number each one had in the author's file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Source {
    pub file: String,
    pub lines: Vec<String>,
    pub origins: Vec<usize>,
}

impl Source {
    /// Source whose lines map one-to-one onto the input, with no filtering.
    pub fn verbatim(file: &str, text: &str) -> Self {
        let lines = split_lines(text);
        let origins = (1..=lines.len()).collect();
        Source {
            file: file.to_string(),
            lines,
            origins,
        }
    }
}

fn split_lines(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = text.split('\n').map(|l| l.trim_end().to_string()).collect();
    // A final newline terminates the last line rather than opening an empty one.
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// Normalise `text` and strip author-only `#@` directive lines.
pub fn preprocess(file: &str, text: &str) -> Result<Source, CompileError> {
    let text: String = text.nfc().collect();
    let mut source = Source {
        file: file.to_string(),
        ..Source::default()
    };

    for (i, line) in split_lines(&text).into_iter().enumerate() {
        let lineno = i + 1;
        if RE_CONTROL.is_match(&line) {
            return Err(CompileError::syntax(
                &Location::new(file, lineno),
                "invalid character in input",
            ));
        }
        if line.starts_with("#@") {
            directive(file, lineno, &line);
            continue;
        }
        source.lines.push(line);
        source.origins.push(lineno);
    }
    Ok(source)
}

fn directive(file: &str, line: usize, text: &str) {
    if text.starts_with("#@#") {
        return;
    }
    match RE_DIRECTIVE.captures(text) {
        Some(caps) if &caps[1] == "warn" => {
            let message = caps.get(2).map_or("", |m| m.as_str());
            tracing::warn!(file, line, "{}", message);
        }
        Some(caps) => {
            tracing::warn!(file, line, "unsupported preprocessor directive: #@{}", &caps[1]);
        }
        None => {
            tracing::warn!(file, line, "malformed preprocessor directive: {}", text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crlf_normalization() {
        let result = preprocess("a.re", "hello\r\nworld").unwrap();
        assert_eq!(result.lines, vec!["hello", "world"]);
    }

    #[test]
    fn test_cr_normalization() {
        let result = preprocess("a.re", "hello\rworld").unwrap();
        assert_eq!(result.lines, vec!["hello", "world"]);
    }

    #[test]
    fn test_trailing_whitespace() {
        let result = preprocess("a.re", "hello   \nworld  \n").unwrap();
        assert_eq!(result.lines, vec!["hello", "world"]);
    }

    #[test]
    fn test_empty_input() {
        let result = preprocess("a.re", "").unwrap();
        assert_eq!(result.lines, vec![""]);
    }

    #[test]
    fn test_nfc_keeps_fullwidth() {
        // Decomposed が composes; the ideographic space must survive.
        let result = preprocess("a.re", "\u{304B}\u{3099}\u{3000}").unwrap();
        assert_eq!(result.lines, vec!["\u{304C}\u{3000}"]);
    }

    #[test]
    fn test_comment_lines_are_removed_with_origins() {
        let result = preprocess("a.re", "one\n#@# note to self\ntwo\n#@warn(check)\nthree\n").unwrap();
        assert_eq!(result.lines, vec!["one", "two", "three"]);
        assert_eq!(result.origins, vec![1, 3, 5]);
    }

    #[test]
    fn test_unknown_directive_is_removed() {
        let result = preprocess("a.re", "#@mapfile(x.rb)\nbody\n").unwrap();
        assert_eq!(result.lines, vec!["body"]);
        assert_eq!(result.origins, vec![2]);
    }

    #[test]
    fn test_control_character_is_syntax_error() {
        let err = preprocess("a.re", "ok\nbad\u{0001}\n").unwrap_err();
        assert_eq!(err.location(), Some(&Location::new("a.re", 2)));
    }

    #[test]
    fn test_tab_is_allowed() {
        let result = preprocess("a.re", "a\tb\n").unwrap();
        assert_eq!(result.lines, vec!["a\tb"]);
    }

    #[test]
    fn test_verbatim_source() {
        let source = Source::verbatim("x.re", "a\n#@# b\n");
        assert_eq!(source.lines, vec!["a", "#@# b"]);
        assert_eq!(source.origins, vec![1, 2]);
    }
}
