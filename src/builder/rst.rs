//! reStructuredText for Sphinx.

use super::{caption_label, note_title, plain, Builder};
use crate::config::Target;
use crate::context::Context;
use crate::error::BuildResult;
use crate::ids::norm_label;
use crate::index::HeadlineKind;
use crate::ir::{
    AlignKind, Block, BulletItem, CodeBlock, ColumnHead, Figure, FigureKind, Headline, Inline,
    ListBlock, NoteKind, Paragraph, Style, Table,
};

const UNDERLINES: [char; 6] = ['=', '-', '^', '~', '"', '\''];
const ESCAPED: [char; 5] = ['\\', '*', '`', '_', '|'];

pub struct RstBuilder;

/// Columns a caption occupies in a monospace terminal; wide characters count twice.
fn display_width(text: &str) -> usize {
    text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|l| {
            if l.is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn target_label(id: &str) -> String {
    format!(".. _{}:\n\n", norm_label(id))
}

impl RstBuilder {
    pub fn new() -> Self {
        RstBuilder
    }

    fn caption(&self, ctx: &Context<'_>, key: &str, number: Option<&str>, caption: Option<&str>) -> String {
        match (number, caption) {
            (Some(n), Some(c)) => format!("{} {}", caption_label(ctx, key, n), c),
            (Some(n), None) => caption_label(ctx, key, n),
            (None, Some(c)) => c.to_string(),
            (None, None) => String::new(),
        }
    }

    fn code(&self, code: &CodeBlock, ctx: &Context<'_>) -> String {
        let mut out = code.id.as_deref().map(target_label).unwrap_or_default();
        out.push_str(&format!(
            ".. code-block:: {}\n",
            code.lang.as_deref().unwrap_or("none")
        ));
        let caption = self.caption(ctx, "list", code.number.as_deref(), code.caption.as_deref());
        if !caption.is_empty() {
            out.push_str(&format!("   :caption: {}\n", caption));
        }
        if code.kind.numbered_lines() {
            out.push_str("   :linenos:\n");
            if code.first_line != 1 {
                out.push_str(&format!("   :lineno-start: {}\n", code.first_line));
            }
        }
        out.push('\n');
        for line in &code.lines {
            out.push_str(&indent(line, "   "));
            out.push('\n');
        }
        out.push('\n');
        out
    }

    fn table(&self, table: &Table, ctx: &Context<'_>) -> String {
        let mut out = table.id.as_deref().map(target_label).unwrap_or_default();
        let caption = self.caption(ctx, "table", table.number.as_deref(), table.caption.as_deref());
        if caption.is_empty() {
            out.push_str(".. list-table::\n");
        } else {
            out.push_str(&format!(".. list-table:: {}\n", caption));
        }
        if !table.header.is_empty() {
            out.push_str(&format!("   :header-rows: {}\n", table.header.len()));
        }
        out.push('\n');
        for row in table.header.iter().chain(table.body.iter()) {
            for (i, cell) in row.iter().enumerate() {
                let bullet = if i == 0 { "   * - " } else { "     - " };
                out.push_str(bullet);
                out.push_str(cell);
                out.push('\n');
            }
        }
        out.push('\n');
        out
    }

    fn figure(&self, figure: &Figure, ctx: &Context<'_>) -> String {
        let mut out = if figure.id.is_empty() {
            String::new()
        } else {
            target_label(&figure.id)
        };
        let caption = match figure.kind {
            FigureKind::ImageTable => {
                self.caption(ctx, "table", figure.number.as_deref(), figure.caption.as_deref())
            }
            _ => self.caption(ctx, "image", figure.number.as_deref(), figure.caption.as_deref()),
        };
        match &figure.path {
            Some(path) => {
                out.push_str(&format!(".. figure:: {}\n", path.to_string_lossy()));
                if let Some(scale) = figure
                    .metric
                    .as_deref()
                    .and_then(|m| m.split(',').find_map(|p| p.trim().strip_prefix("scale=")))
                    .and_then(|s| s.parse::<f64>().ok())
                {
                    out.push_str(&format!("   :scale: {}%\n", (scale * 100.0).round() as u32));
                }
                out.push('\n');
                if !caption.is_empty() {
                    out.push_str(&format!("   {}\n\n", caption));
                }
            }
            None => {
                if !caption.is_empty() {
                    out.push_str(&format!("{}\n\n", caption));
                }
                out.push_str("::\n\n");
                for line in &figure.dummy {
                    out.push_str(&format!("   {}\n", line));
                }
                out.push('\n');
            }
        }
        out
    }

    fn indented(&self, paragraphs: &[String]) -> String {
        paragraphs
            .iter()
            .map(|p| format!("{}\n\n", indent(p, "   ")))
            .collect()
    }

    fn bullets(items: &[BulletItem], depth: usize, out: &mut String) {
        for item in items {
            let pad = "  ".repeat(depth);
            out.push_str(&format!("{}* {}\n", pad, item.text));
            if !item.children.is_empty() {
                out.push('\n');
                Self::bullets(&item.children, depth + 1, out);
                out.push('\n');
            }
        }
    }
}

impl Default for RstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for RstBuilder {
    fn target(&self) -> Target {
        Target::Rst
    }

    fn escape(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if ESCAPED.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }

    fn unescape(&self, text: &str) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(&next) = chars.peek() {
                    if ESCAPED.contains(&next) {
                        out.push(next);
                        chars.next();
                        continue;
                    }
                }
            }
            out.push(c);
        }
        Some(out)
    }

    fn headline(&mut self, h: &Headline, _ctx: &Context<'_>) -> BuildResult {
        let mut out = h.label.as_deref().map(target_label).unwrap_or_default();
        if h.kind == HeadlineKind::Nodisp {
            return Ok(out);
        }
        let mark = UNDERLINES[h.level.clamp(1, UNDERLINES.len()) - 1];
        let rule: String = std::iter::repeat(mark)
            .take(display_width(&plain(&h.caption)).max(1))
            .collect();
        if h.level == 1 {
            out.push_str(&format!("{}\n{}\n{}\n\n", rule, h.caption, rule));
        } else {
            out.push_str(&format!("{}\n{}\n\n", h.caption, rule));
        }
        Ok(out)
    }

    fn paragraph(&mut self, p: &Paragraph, _ctx: &Context<'_>) -> BuildResult {
        if p.tabs > 0 {
            return Ok(format!("{}\n\n", indent(&p.text, &"   ".repeat(p.tabs))));
        }
        Ok(format!("{}\n\n", p.text))
    }

    fn list(&mut self, list: &ListBlock, _ctx: &Context<'_>) -> BuildResult {
        let mut out = String::new();
        match list {
            ListBlock::Unordered(items) => Self::bullets(items, 0, &mut out),
            ListBlock::Ordered(items) => {
                for item in items {
                    out.push_str(&format!("{}. {}\n", item.number, item.text));
                }
            }
            ListBlock::Definition(items) => {
                for item in items {
                    out.push_str(&format!("{}\n", item.term));
                    for line in &item.body {
                        out.push_str(&format!("   {}\n", line));
                    }
                }
            }
        }
        out.push('\n');
        Ok(out)
    }

    fn block(&mut self, block: &Block, ctx: &Context<'_>) -> BuildResult {
        let out = match block {
            Block::Code(code) => self.code(code, ctx),
            Block::Table(table) => self.table(table, ctx),
            Block::Figure(figure) => self.figure(figure, ctx),
            Block::Quote(paragraphs) => self.indented(paragraphs),
            Block::Aligned { kind, paragraphs } => {
                let class = match kind {
                    AlignKind::Lead => "lead",
                    AlignKind::FlushRight => "right",
                    AlignKind::Centering => "center",
                };
                format!(".. rst-class:: {}\n\n{}", class, self.indented(paragraphs))
            }
            Block::Box { caption, lines } => {
                let mut out = caption
                    .as_deref()
                    .map(|c| format!("**{}**\n\n", c))
                    .unwrap_or_default();
                out.push_str("::\n\n");
                for line in lines {
                    out.push_str(&format!("   {}\n", line));
                }
                out.push('\n');
                out
            }
            Block::Note {
                kind,
                caption,
                paragraphs,
            } => {
                let head = match kind {
                    NoteKind::Note
                    | NoteKind::Tip
                    | NoteKind::Warning
                    | NoteKind::Important
                    | NoteKind::Caution => format!(".. {}::\n\n", kind.name()),
                    _ => format!(
                        ".. admonition:: {}\n   :class: {}\n\n",
                        note_title(ctx, kind.name(), None),
                        kind.name()
                    ),
                };
                let mut out = head;
                if let Some(c) = caption {
                    out.push_str(&format!("   **{}**\n\n", c));
                }
                out.push_str(&self.indented(paragraphs));
                out
            }
            Block::Footnote(note) => format!(".. [#{}] {}\n\n", note.id, note.content),
            Block::Endnotes(notes) => notes
                .iter()
                .map(|n| format!(".. [#{}] {}\n\n", n.id, n.content))
                .collect(),
            Block::Bibpaper {
                id,
                caption,
                paragraphs,
                ..
            } => format!(".. [{}] {}\n\n{}", id, caption, self.indented(paragraphs)),
            Block::Equation { id, lines, .. } => {
                let mut out = String::from(".. math::\n");
                if let Some(id) = id {
                    out.push_str(&format!("   :label: {}\n", norm_label(id)));
                }
                out.push('\n');
                for line in lines {
                    out.push_str(&format!("   {}\n", line));
                }
                out.push('\n');
                out
            }
            Block::Comment(lines) => {
                let mut out = String::from("..\n");
                for line in lines {
                    out.push_str(&format!("   {}\n", line));
                }
                out.push('\n');
                out
            }
            Block::Label(id) => target_label(id),
            Block::BlankLine => "|\n\n".to_string(),
            Block::PageBreak => ".. raw:: latex\n\n   \\clearpage\n\n".to_string(),
            Block::Hr => "----\n\n".to_string(),
        };
        Ok(out)
    }

    fn inline(&self, node: &Inline, ctx: &Context<'_>) -> BuildResult {
        let out = match node {
            Inline::Styled(style, body) => match style {
                Style::Bold | Style::Strong => format!("**{}**", body),
                Style::Italic | Style::Em | Style::Cite | Style::Dfn | Style::Var => {
                    format!("*{}*", body)
                }
                Style::Tt | Style::TtItalic | Style::TtBold | Style::Kbd | Style::Samp => {
                    format!("``{}``", body)
                }
                Style::Sup => format!(":sup:`{}`", body),
                Style::Sub => format!(":sub:`{}`", body),
                Style::Abbr | Style::Acronym => format!(":abbr:`{}`", body),
                Style::Q => format!("「{}」", body),
                _ => body.clone(),
            },
            Inline::Code(code) => format!("``{}``", code),
            Inline::Math(math) => format!(":math:`{}`", math),
            Inline::Index { term, hidden } => {
                if *hidden {
                    format!(":index:`{}`", term)
                } else {
                    format!("{} :index:`{}`", self.escape(term), term)
                }
            }
            Inline::Comment(text) => format!("[{}]", self.escape(text)),
            Inline::Ruby { base, ruby } => {
                format!("{}（{}）", self.escape(base), self.escape(ruby))
            }
            Inline::Keyword { word, alt } => match alt {
                Some(alt) => format!("**{}** （{}）", self.escape(word), self.escape(alt)),
                None => format!("**{}**", self.escape(word)),
            },
            Inline::Href { url, label } => match label {
                Some(label) => format!("`{} <{}>`_", self.escape(label), url),
                None => format!("`{} <{}>`_", url, url),
            },
            Inline::List(item) | Inline::Table(item) | Inline::Image(item) => {
                format!(":numref:`{}`", norm_label(&item.id))
            }
            Inline::Equation(item) => format!(":math:numref:`{}`", norm_label(&item.id)),
            Inline::Footnote(note) | Inline::Endnote(note) => format!(" [#{}]_", note.id),
            Inline::Headline(r) => match &r.number {
                Some(n) => ctx.locale.t("hd_quote", &[n, &r.caption]),
                None => ctx.locale.t("hd_quote_without_number", &[&r.caption]),
            },
            Inline::SectionNumber(r) => r.number.clone().unwrap_or_default(),
            Inline::SectionTitle(r) => r.caption.clone(),
            Inline::Column { caption, .. } => ctx.locale.t("column", &[caption]),
            Inline::ChapterNumber(c) => c.number.clone().unwrap_or_else(|| c.title.clone()),
            Inline::ChapterTitle(c) | Inline::ChapterLink(c) => format!(":doc:`{}`", c.id),
            Inline::Bib { id, .. } => format!(" [{}]_", id),
            Inline::Uchar(c) => c.to_string(),
            Inline::Br => "\n".to_string(),
            Inline::Icon { .. } | Inline::Dtp(_) | Inline::PageRef(_) => {
                return Err(self.unsupported(node.name()))
            }
        };
        Ok(out)
    }

    fn column_begin(&mut self, column: &ColumnHead, _ctx: &Context<'_>) -> BuildResult {
        let mut out = column.label.as_deref().map(target_label).unwrap_or_default();
        out.push_str(&format!(".. rubric:: {}\n\n", column.caption));
        Ok(out)
    }

    fn column_end(&mut self, _level: usize, _ctx: &Context<'_>) -> BuildResult {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_and_unescape() {
        let b = RstBuilder::new();
        assert_eq!(b.escape("a*b_c`d|e"), "a\\*b\\_c\\`d\\|e");
        let raw = "\\*_`| plain";
        assert_eq!(b.unescape(&b.escape(raw)).as_deref(), Some(raw));
    }

    #[test]
    fn test_target_label_collapses_whitespace() {
        assert_eq!(target_label("my  label"), ".. _my_label:\n\n");
    }

    #[test]
    fn test_display_width_counts_wide_chars_twice() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("日本"), 4);
    }

    #[test]
    fn test_indent_skips_empty_lines() {
        assert_eq!(indent("a\n\nb", "   "), "   a\n\n   b");
    }
}
