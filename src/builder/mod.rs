//! The builder contract and the table mapping each target to its builder.
//!
//! The block compiler recognises constructs and hands them over one at a time;
//! a builder turns each into text in its target syntax. Anything a builder does
//! not override fails with [`BuildError::NotImplemented`] so content is never
//! dropped silently.

pub mod html;
pub mod idgxml;
pub mod latex;
pub mod markdown;
pub mod plaintext;
pub mod rst;
pub mod top;

use crate::config::Target;
use crate::context::Context;
use crate::error::{BuildError, BuildResult};
use crate::ir::{Block, ColumnHead, Headline, Inline, ListBlock, Paragraph};
use fancy_regex::Regex as FancyRegex;
use std::sync::LazyLock;

pub trait Builder {
    fn target(&self) -> Target;

    /// Escape literal author text for this target.
    fn escape(&self, text: &str) -> String;

    /// Inverse of [`escape`](Self::escape), where the target defines one.
    fn unescape(&self, _text: &str) -> Option<String> {
        None
    }

    fn headline(&mut self, headline: &Headline, ctx: &Context<'_>) -> BuildResult;

    fn paragraph(&mut self, paragraph: &Paragraph, ctx: &Context<'_>) -> BuildResult;

    fn list(&mut self, list: &ListBlock, ctx: &Context<'_>) -> BuildResult;

    fn block(&mut self, block: &Block, ctx: &Context<'_>) -> BuildResult;

    fn inline(&self, node: &Inline, ctx: &Context<'_>) -> BuildResult;

    fn column_begin(&mut self, _column: &ColumnHead, _ctx: &Context<'_>) -> BuildResult {
        Err(self.unsupported("column"))
    }

    fn column_end(&mut self, _level: usize, _ctx: &Context<'_>) -> BuildResult {
        Err(self.unsupported("column"))
    }

    /// Wrap the chapter body into a complete document.
    fn finish(&mut self, body: String, _ctx: &Context<'_>) -> String {
        body
    }

    fn unsupported(&self, construct: &str) -> BuildError {
        BuildError::not_implemented(self.target().name(), construct)
    }
}

pub fn create(target: Target) -> Box<dyn Builder> {
    match target {
        Target::Html => Box::new(html::HtmlBuilder::new()),
        Target::Epub => Box::new(html::HtmlBuilder::epub()),
        Target::Latex => Box::new(latex::LatexBuilder::new()),
        Target::Idgxml => Box::new(idgxml::IdgxmlBuilder::new()),
        Target::Plaintext => Box::new(plaintext::PlaintextBuilder::new()),
        Target::Rst => Box::new(rst::RstBuilder::new()),
        Target::Markdown => Box::new(markdown::MarkdownBuilder::new()),
        Target::Md2inao => Box::new(markdown::MarkdownBuilder::md2inao()),
        Target::Top => Box::new(top::TopBuilder::new()),
    }
}

const CJK: &str = r"[\p{Han}\p{Hiragana}\p{Katakana}ー、。，．「」（）]";

static RE_CJK_BREAK: LazyLock<FancyRegex> =
    LazyLock::new(|| FancyRegex::new(&format!(r"(?<={})\n(?={})", CJK, CJK)).unwrap());

/// Join paragraph lines. With `by_lang`, lines are separated by a space except
/// where both sides of the break are CJK; otherwise they are concatenated.
pub fn join_lines(lines: &[String], by_lang: bool) -> String {
    if !by_lang {
        return lines.concat();
    }
    let joined = lines.join("\n");
    RE_CJK_BREAK.replace_all(&joined, "").replace('\n', " ")
}

/// Escape `&<>"` for the XML-family targets.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// `リスト1.2`, `図1.1` and friends.
pub fn caption_label(ctx: &Context<'_>, key: &str, number: &str) -> String {
    format!("{}{}", ctx.locale.t(key, &[]), number)
}

/// Markup-free text for targets that only keep captions and body text.
pub fn plain(text: &str) -> String {
    crate::inline::strip_tags(text)
}

/// Render a note label such as `ノート` followed by an optional caption.
pub fn note_title(ctx: &Context<'_>, key: &str, caption: Option<&str>) -> String {
    match caption {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => ctx.locale.t(key, &[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_join_lines_plain_concat() {
        assert_eq!(join_lines(&s(&["foo", "bar"]), false), "foobar");
    }

    #[test]
    fn test_join_lines_by_lang() {
        assert_eq!(join_lines(&s(&["foo", "bar"]), true), "foo bar");
        assert_eq!(join_lines(&s(&["日本", "語です"]), true), "日本語です");
        assert_eq!(join_lines(&s(&["日本", "abc"]), true), "日本 abc");
    }

    #[test]
    fn test_escape_xml_round_trip() {
        let raw = r#"a < b && "c" > d"#;
        let escaped = escape_xml(raw);
        assert_eq!(escaped, "a &lt; b &amp;&amp; &quot;c&quot; &gt; d");
        assert_eq!(unescape_xml(&escaped), raw);
    }

    #[test]
    fn test_every_target_has_a_builder() {
        for target in Target::ALL {
            assert_eq!(create(target).target(), target);
        }
    }
}
