//! Markup-free text: captions and body text survive, everything else goes.

use super::{caption_label, note_title, plain, Builder};
use crate::config::Target;
use crate::context::Context;
use crate::error::BuildResult;
use crate::index::HeadlineKind;
use crate::ir::{
    Block, BulletItem, CodeBlock, ColumnHead, Figure, FigureKind, Headline, Inline, ListBlock,
    Paragraph, Style, Table, TableKind,
};

pub struct PlaintextBuilder;

impl PlaintextBuilder {
    pub fn new() -> Self {
        PlaintextBuilder
    }

    /// `リスト1.1　caption`, or whichever half is present.
    pub(crate) fn caption(ctx: &Context<'_>, key: &str, number: Option<&str>, caption: Option<&str>) -> String {
        match (number, caption) {
            (Some(n), Some(c)) => format!(
                "{}{}{}",
                caption_label(ctx, key, n),
                ctx.locale.t("caption_prefix", &[]),
                c
            ),
            (Some(n), None) => caption_label(ctx, key, n),
            (None, Some(c)) => c.to_string(),
            (None, None) => String::new(),
        }
    }

    pub(crate) fn code_lines(code: &CodeBlock) -> String {
        let mut out = String::new();
        for (i, line) in code.lines.iter().enumerate() {
            if code.kind.numbered_lines() {
                out.push_str(&format!("{:>2}: ", code.first_line + i));
            }
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    pub(crate) fn table_caption(table: &Table, ctx: &Context<'_>) -> String {
        match table.kind {
            TableKind::Table => Self::caption(ctx, "table", table.number.as_deref(), table.caption.as_deref()),
            TableKind::EmTable => table.caption.clone().unwrap_or_default(),
        }
    }

    pub(crate) fn figure_caption(figure: &Figure, ctx: &Context<'_>) -> String {
        let key = if figure.kind == FigureKind::ImageTable {
            "table"
        } else {
            "image"
        };
        Self::caption(ctx, key, figure.number.as_deref(), figure.caption.as_deref())
    }

    fn bullets(items: &[BulletItem], out: &mut String) {
        for item in items {
            out.push_str(&item.text);
            out.push('\n');
            Self::bullets(&item.children, out);
        }
    }

    fn framed(caption: &str, body: &str) -> String {
        let mut out = String::new();
        if !caption.is_empty() {
            out.push_str(caption);
            out.push_str("\n\n");
        }
        out.push_str(body);
        out.push('\n');
        out
    }
}

impl Default for PlaintextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for PlaintextBuilder {
    fn target(&self) -> Target {
        Target::Plaintext
    }

    fn escape(&self, text: &str) -> String {
        text.to_string()
    }

    fn headline(&mut self, h: &Headline, _ctx: &Context<'_>) -> BuildResult {
        if h.kind == HeadlineKind::Nodisp {
            return Ok(String::new());
        }
        Ok(format!("{}{}\n", h.prefix.as_deref().unwrap_or(""), h.caption))
    }

    fn paragraph(&mut self, p: &Paragraph, _ctx: &Context<'_>) -> BuildResult {
        Ok(format!("{}\n", p.text))
    }

    fn list(&mut self, list: &ListBlock, _ctx: &Context<'_>) -> BuildResult {
        let mut out = String::new();
        match list {
            ListBlock::Unordered(items) => Self::bullets(items, &mut out),
            ListBlock::Ordered(items) => {
                for item in items {
                    out.push_str(&format!("{}　{}\n", item.number, item.text));
                }
            }
            ListBlock::Definition(items) => {
                for item in items {
                    out.push_str(&item.term);
                    out.push('\n');
                    for line in &item.body {
                        out.push_str(line);
                        out.push('\n');
                    }
                }
            }
        }
        out.push('\n');
        Ok(out)
    }

    fn block(&mut self, block: &Block, ctx: &Context<'_>) -> BuildResult {
        let out = match block {
            Block::Code(code) => Self::framed(
                &Self::caption(ctx, "list", code.number.as_deref(), code.caption.as_deref()),
                &Self::code_lines(code),
            ),
            Block::Table(table) => {
                let rows: String = table
                    .header
                    .iter()
                    .chain(table.body.iter())
                    .map(|row| format!("{}\n", row.join("\t")))
                    .collect();
                Self::framed(&Self::table_caption(table, ctx), &rows)
            }
            Block::Figure(figure) => {
                let dummy: String = figure.dummy.iter().map(|l| format!("{}\n", l)).collect();
                Self::framed(&Self::figure_caption(figure, ctx), &dummy)
            }
            Block::Quote(paragraphs) | Block::Aligned { paragraphs, .. } => {
                format!("{}\n\n", paragraphs.join("\n"))
            }
            Block::Box { caption, lines } => {
                let body: String = lines.iter().map(|l| format!("{}\n", l)).collect();
                Self::framed(caption.as_deref().unwrap_or(""), &body)
            }
            Block::Note {
                kind,
                caption,
                paragraphs,
            } => format!(
                "{}\n{}\n\n",
                note_title(ctx, kind.name(), caption.as_deref()),
                paragraphs.join("\n")
            ),
            Block::Footnote(note) => format!(
                "{}{} {}\n",
                ctx.locale.t("footnote_mark", &[]),
                note.number,
                note.content
            ),
            Block::Endnotes(notes) => {
                let mut out: String = notes
                    .iter()
                    .map(|n| format!("({}) {}\n", n.number, n.content))
                    .collect();
                out.push('\n');
                out
            }
            Block::Bibpaper {
                number,
                caption,
                paragraphs,
                ..
            } => {
                let mut out = format!("[{}] {}\n", number, caption);
                for p in paragraphs {
                    out.push_str(p);
                    out.push('\n');
                }
                out.push('\n');
                out
            }
            Block::Equation {
                number,
                caption,
                lines,
                ..
            } => {
                let body: String = lines.iter().map(|l| format!("{}\n", l)).collect();
                Self::framed(
                    &Self::caption(ctx, "equation", number.as_deref(), caption.as_deref()),
                    &body,
                )
            }
            Block::Comment(lines) => format!("◆→{}←◆\n", lines.join("\n")),
            Block::Label(_) | Block::PageBreak => String::new(),
            Block::BlankLine => "\n".to_string(),
            Block::Hr => format!("{}\n", "-".repeat(40)),
        };
        Ok(out)
    }

    fn inline(&self, node: &Inline, ctx: &Context<'_>) -> BuildResult {
        let out = match node {
            Inline::Styled(Style::Q, body) => format!("「{}」", body),
            Inline::Styled(_, body) => body.clone(),
            Inline::Code(text) | Inline::Math(text) => text.clone(),
            Inline::Index { term, hidden } => {
                if *hidden {
                    String::new()
                } else {
                    term.clone()
                }
            }
            Inline::Comment(text) => format!("◆→{}←◆", text),
            Inline::Dtp(_) => String::new(),
            Inline::Ruby { base, ruby } => format!("{}（{}）", base, ruby),
            Inline::Keyword { word, alt } => match alt {
                Some(alt) => format!("{}（{}）", word, alt),
                None => word.clone(),
            },
            Inline::Href { url, label } => match label {
                Some(label) => format!("{}（{}）", label, url),
                None => url.clone(),
            },
            Inline::List(item) => caption_label(ctx, "list", &item.number),
            Inline::Table(item) => caption_label(ctx, "table", &item.number),
            Inline::Image(item) => caption_label(ctx, "image", &item.number),
            Inline::Equation(item) => caption_label(ctx, "equation", &item.number),
            Inline::Icon { id, .. } => format!("[{}]", id),
            Inline::Footnote(note) => format!("【{}{}】", ctx.locale.t("footnote_mark", &[]), note.number),
            Inline::Endnote(note) => format!("({})", note.number),
            Inline::Headline(r) => match &r.number {
                Some(n) => ctx.locale.t("hd_quote", &[n, &r.caption]),
                None => ctx.locale.t("hd_quote_without_number", &[&r.caption]),
            },
            Inline::SectionNumber(r) => r.number.clone().unwrap_or_default(),
            Inline::SectionTitle(r) => r.caption.clone(),
            Inline::Column { caption, .. } => ctx.locale.t("column", &[caption]),
            Inline::ChapterNumber(c) => c.number.clone().unwrap_or_else(|| c.title.clone()),
            Inline::ChapterTitle(c) => c.title.clone(),
            Inline::ChapterLink(c) => match &c.number {
                Some(n) => format!("{}{}", n, ctx.locale.t("chapter_quote", &[&c.title])),
                None => ctx.locale.t("chapter_quote_without_number", &[&c.title]),
            },
            Inline::Bib { number, .. } => ctx.locale.t("bib_quote", &[&number.to_string()]),
            Inline::Uchar(c) => c.to_string(),
            Inline::Br => "\n".to_string(),
            Inline::PageRef(_) => "●●".to_string(),
        };
        Ok(out)
    }

    fn column_begin(&mut self, column: &ColumnHead, _ctx: &Context<'_>) -> BuildResult {
        Ok(format!("{}\n\n", plain(&column.caption)))
    }

    fn column_end(&mut self, _level: usize, _ctx: &Context<'_>) -> BuildResult {
        Ok("\n".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_is_identity() {
        assert_eq!(PlaintextBuilder::new().escape("<a & b>"), "<a & b>");
    }

    #[test]
    fn test_framed() {
        assert_eq!(PlaintextBuilder::framed("cap", "a\nb\n"), "cap\n\na\nb\n\n");
        assert_eq!(PlaintextBuilder::framed("", "a\n"), "a\n\n");
    }
}
