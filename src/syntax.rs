//! Line-level lexical rules shared by the index pass and the block compiler.

use regex::Regex;
use std::sync::LazyLock;

pub static RE_HEADLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(=+)(?:\[([^\]]+)\])?(?:\{([^}]+)\})?(.*)$").unwrap()
});
pub static RE_HEADLINE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=+[\[\s{]").unwrap());
pub static RE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^//([a-z]+)(.*)$").unwrap());
pub static RE_BLOCK_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^//\}").unwrap());
pub static RE_ULIST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+(\*+)").unwrap());
pub static RE_OLIST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+(\d+)\.").unwrap());
pub static RE_DLIST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+:\s").unwrap());
pub static RE_DLIST_DEPRECATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:\s").unwrap());
pub static RE_TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[=\-]{12}").unwrap());

/// A parsed headline line before any numbering is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineLine {
    pub level: usize,
    pub tag: Option<String>,
    pub label: Option<String>,
    pub caption: String,
}

pub fn is_headline(line: &str) -> bool {
    RE_HEADLINE_START.is_match(line)
}

pub fn parse_headline(line: &str) -> Option<HeadlineLine> {
    if !is_headline(line) {
        return None;
    }
    let caps = RE_HEADLINE.captures(line)?;
    Some(HeadlineLine {
        level: caps[1].len(),
        tag: caps.get(2).map(|m| m.as_str().to_string()),
        label: caps.get(3).map(|m| m.as_str().to_string()),
        caption: caps.get(4).map_or("", |m| m.as_str()).trim().to_string(),
    })
}

/// A `//name[a][b]{` line split into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveLine {
    pub name: String,
    pub args: Vec<String>,
    pub opens_block: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgError(pub String);

pub fn parse_directive(line: &str) -> Option<Result<DirectiveLine, ArgError>> {
    let caps = RE_DIRECTIVE.captures(line)?;
    let name = caps[1].to_string();
    let rest = caps[2].trim_end();
    let opens_block = rest.ends_with('{');
    let rest = rest.strip_suffix('{').unwrap_or(rest);
    Some(parse_args(rest).map(|args| DirectiveLine {
        name,
        args,
        opens_block,
    }))
}

/// Split `[a][b\]c][]` into `["a", "b]c", ""]`.
///
/// Inside a bracket a backslash escapes `]`; any other backslash pair is kept
/// as written so inline commands in captions still see their own escapes.
pub fn parse_args(text: &str) -> Result<Vec<String>, ArgError> {
    let mut args = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '[' {
            let rest: String = std::iter::once(c).chain(chars.by_ref()).collect();
            return Err(ArgError(format!(
                "argument syntax error: {} in {:?}",
                rest, text
            )));
        }
        let mut word = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(']') => word.push(']'),
                    Some(other) => {
                        word.push('\\');
                        word.push(other);
                    }
                    None => word.push('\\'),
                },
                ']' => {
                    closed = true;
                    break;
                }
                _ => word.push(c),
            }
        }
        if !closed {
            return Err(ArgError(format!(
                "argument syntax error: unterminated '[' in {:?}",
                text
            )));
        }
        args.push(word);
    }
    Ok(args)
}

/// Remove leading tabs, returning how many there were.
pub fn split_leading_tabs(line: &str) -> (usize, &str) {
    let body = line.trim_start_matches('\t');
    (line.len() - body.len(), body)
}
