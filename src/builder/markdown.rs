//! Markdown, plus the MD2INAO dialect used for magazine manuscripts.

use super::plaintext::PlaintextBuilder;
use super::{caption_label, note_title, Builder};
use crate::config::Target;
use crate::context::Context;
use crate::error::{BuildError, BuildResult};
use crate::index::{HeadlineKind, IndexError};
use crate::ir::{
    AlignKind, Block, BulletItem, CodeBlock, ColumnHead, Figure, Headline, Inline, ListBlock,
    Paragraph, Style, Table,
};

pub struct MarkdownBuilder {
    inao: bool,
}

impl MarkdownBuilder {
    pub fn new() -> Self {
        MarkdownBuilder { inao: false }
    }

    pub fn md2inao() -> Self {
        MarkdownBuilder { inao: true }
    }

    fn code(&self, code: &CodeBlock, ctx: &Context<'_>) -> String {
        let body = PlaintextBuilder::code_lines(code);
        if self.inao {
            let label = code
                .number
                .as_deref()
                .map(|n| caption_label(ctx, "list", n))
                .unwrap_or_default();
            let head = match (&code.number, &code.caption) {
                (None, None) => String::new(),
                _ => format!(
                    "●{}::{}\n\n",
                    label,
                    code.caption.as_deref().unwrap_or("")
                ),
            };
            return format!("```\n{}{}```\n\n", head, body);
        }
        let caption =
            PlaintextBuilder::caption(ctx, "list", code.number.as_deref(), code.caption.as_deref());
        let mut out = String::new();
        if !caption.is_empty() {
            out.push_str(&format!("{}\n\n", caption));
        }
        out.push_str(&format!(
            "```{}\n{}```\n\n",
            code.lang.as_deref().unwrap_or(""),
            body
        ));
        out
    }

    fn table(&self, table: &Table, ctx: &Context<'_>) -> String {
        let mut out = String::new();
        let caption = PlaintextBuilder::table_caption(table, ctx);
        if !caption.is_empty() {
            out.push_str(&format!("{}\n\n", caption));
        }
        let columns = table.columns().max(1);
        let row = |cells: &[String]| -> String {
            let mut cells: Vec<&str> = cells.iter().map(|c| c.as_str()).collect();
            cells.resize(columns, "");
            format!("|{}|\n", cells.join("|"))
        };
        let (head, body) = match table.header.split_first() {
            Some((first, rest)) => (
                row(first.as_slice()),
                rest.iter()
                    .chain(table.body.iter())
                    .map(|r| row(r.as_slice()))
                    .collect::<String>(),
            ),
            None => (
                row(&[]),
                table.body.iter().map(|r| row(r.as_slice())).collect::<String>(),
            ),
        };
        out.push_str(&head);
        out.push_str(&format!("|{}|\n", vec![":--"; columns].join("|")));
        out.push_str(&body);
        out.push('\n');
        out
    }

    fn figure(&self, figure: &Figure, ctx: &Context<'_>) -> String {
        let caption = PlaintextBuilder::figure_caption(figure, ctx);
        match &figure.path {
            Some(path) => format!("![{}]({})\n\n", caption, path.to_string_lossy()),
            None => {
                let mut out = String::new();
                if !caption.is_empty() {
                    out.push_str(&format!("{}\n\n", caption));
                }
                out.push_str("```\n");
                for line in &figure.dummy {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("```\n\n");
                out
            }
        }
    }

    fn div(&self, class: &str, paragraphs: &[String]) -> String {
        format!(
            "<div class=\"{}\">\n\n{}\n\n</div>\n\n",
            class,
            paragraphs.join("\n\n")
        )
    }

    fn bullets(items: &[BulletItem], depth: usize, out: &mut String) {
        for item in items {
            out.push_str(&format!("{}* {}\n", "  ".repeat(depth), item.text));
            Self::bullets(&item.children, depth + 1, out);
        }
    }
}

impl Default for MarkdownBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for MarkdownBuilder {
    fn target(&self) -> Target {
        if self.inao {
            Target::Md2inao
        } else {
            Target::Markdown
        }
    }

    fn escape(&self, text: &str) -> String {
        text.to_string()
    }

    fn headline(&mut self, h: &Headline, _ctx: &Context<'_>) -> BuildResult {
        if h.kind == HeadlineKind::Nodisp {
            return Ok(String::new());
        }
        Ok(format!("{} {}\n\n", "#".repeat(h.level), h.caption))
    }

    fn paragraph(&mut self, p: &Paragraph, _ctx: &Context<'_>) -> BuildResult {
        if self.inao && !p.noindent {
            Ok(format!("　{}\n\n", p.text))
        } else {
            Ok(format!("{}\n\n", p.text))
        }
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
                out.push_str("<dl>\n");
                for item in items {
                    out.push_str(&format!("<dt>{}</dt>\n<dd>{}</dd>\n", item.term, item.body.join("")));
                }
                out.push_str("</dl>\n");
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
            Block::Quote(paragraphs) => {
                let quoted: Vec<String> = paragraphs.iter().map(|p| format!("> {}", p)).collect();
                format!("{}\n\n", quoted.join("\n>\n"))
            }
            Block::Aligned { kind, paragraphs } => {
                let class = match kind {
                    AlignKind::Centering => "center",
                    other => other.name(),
                };
                self.div(class, paragraphs)
            }
            Block::Box { caption, lines } => {
                let mut out = caption
                    .as_deref()
                    .map(|c| format!("{}\n\n", c))
                    .unwrap_or_default();
                out.push_str("```\n");
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("```\n\n");
                out
            }
            Block::Note {
                kind,
                caption,
                paragraphs,
            } => {
                let mut body = vec![format!(
                    "**{}**",
                    note_title(ctx, kind.name(), caption.as_deref())
                )];
                body.extend(paragraphs.iter().cloned());
                self.div(kind.name(), &body)
            }
            Block::Footnote(note) => format!("[^{}]: {}\n\n", note.id, note.content),
            Block::Endnotes(notes) => notes
                .iter()
                .map(|n| format!("[^endnote-{}]: {}\n\n", n.id, n.content))
                .collect(),
            Block::Bibpaper {
                id,
                number,
                caption,
                paragraphs,
            } => {
                let mut out = format!("<a id=\"bib-{}\">[{}]</a> {}\n\n", id, number, caption);
                for p in paragraphs {
                    out.push_str(p);
                    out.push_str("\n\n");
                }
                out
            }
            Block::Equation {
                number,
                caption,
                lines,
                ..
            } => {
                let caption =
                    PlaintextBuilder::caption(ctx, "equation", number.as_deref(), caption.as_deref());
                let mut out = String::new();
                if !caption.is_empty() {
                    out.push_str(&format!("{}\n\n", caption));
                }
                out.push_str(&format!("$$\n{}\n$$\n\n", lines.join("\n")));
                out
            }
            Block::Comment(lines) => {
                if self.inao {
                    format!("<span class='red'>{}</span>\n\n", lines.join("\n"))
                } else {
                    format!("<!-- {} -->\n\n", lines.join("\n"))
                }
            }
            Block::Label(id) => format!("<a id=\"{}\"></a>\n\n", id),
            Block::BlankLine => "<br />\n\n".to_string(),
            Block::PageBreak => String::new(),
            Block::Hr => "----\n\n".to_string(),
        };
        Ok(out)
    }

    fn inline(&self, node: &Inline, ctx: &Context<'_>) -> BuildResult {
        let out = match node {
            Inline::Styled(style, body) => match style {
                Style::Bold | Style::Strong => format!("**{}**", body),
                Style::Italic | Style::Em => format!("*{}*", body),
                Style::Tt | Style::Kbd | Style::Samp => format!("`{}`", body),
                Style::TtItalic => format!("*`{}`*", body),
                Style::TtBold => format!("**`{}`**", body),
                Style::Del => format!("~~{}~~", body),
                Style::Sup => format!("<sup>{}</sup>", body),
                Style::Sub => format!("<sub>{}</sub>", body),
                Style::Q => format!("「{}」", body),
                Style::Underline | Style::Bou | Style::Ami | Style::Tcy if self.inao => {
                    let class = if *style == Style::Underline {
                        "underline"
                    } else {
                        style.name()
                    };
                    format!("<span class='{}'>{}</span>", class, body)
                }
                Style::Underline | Style::Ins => format!("<u>{}</u>", body),
                _ => body.clone(),
            },
            Inline::Code(code) => format!("`{}`", code),
            Inline::Math(math) => format!("${}$", math),
            Inline::Index { term, hidden } => {
                if *hidden {
                    String::new()
                } else {
                    term.clone()
                }
            }
            Inline::Comment(text) => {
                if self.inao {
                    format!("<span class='red'>{}</span>", text)
                } else {
                    format!("<!-- {} -->", text)
                }
            }
            Inline::Ruby { base, ruby } => {
                if self.inao {
                    format!("{{{}|{}}}", base, ruby)
                } else {
                    format!("<ruby>{}<rt>{}</rt></ruby>", base, ruby)
                }
            }
            Inline::Keyword { word, alt } => match alt {
                Some(alt) => format!("**{}**（{}）", word, alt),
                None => format!("**{}**", word),
            },
            Inline::Href { url, label } => match label {
                Some(label) => format!("[{}]({})", label, url),
                None => format!("<{}>", url),
            },
            Inline::List(item) => caption_label(ctx, "list", &item.number),
            Inline::Table(item) => caption_label(ctx, "table", &item.number),
            Inline::Image(item) => caption_label(ctx, "image", &item.number),
            Inline::Equation(item) => caption_label(ctx, "equation", &item.number),
            Inline::Icon { id, path } => match path {
                Some(path) => format!("![]({})", path.to_string_lossy()),
                None => {
                    return Err(BuildError::Reference(IndexError::NotFound {
                        kind: "image file",
                        id: id.clone(),
                    }))
                }
            },
            Inline::Footnote(note) => format!("[^{}]", note.id),
            Inline::Endnote(note) => format!("[^endnote-{}]", note.id),
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
            Inline::Bib { id, number } => format!(
                "[{}](#bib-{})",
                ctx.locale.t("bib_quote", &[&number.to_string()]),
                id
            ),
            Inline::Uchar(c) => c.to_string(),
            Inline::Br => "<br />".to_string(),
            Inline::Dtp(_) | Inline::PageRef(_) => return Err(self.unsupported(node.name())),
        };
        Ok(out)
    }

    fn column_begin(&mut self, column: &ColumnHead, _ctx: &Context<'_>) -> BuildResult {
        Ok(format!(
            "<div class=\"column\" markdown=\"1\">\n\n{} {}\n\n",
            "#".repeat(column.level),
            column.caption
        ))
    }

    fn column_end(&mut self, _level: usize, _ctx: &Context<'_>) -> BuildResult {
        Ok("</div>\n\n".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavors() {
        assert_eq!(MarkdownBuilder::new().target(), Target::Markdown);
        assert_eq!(MarkdownBuilder::md2inao().target(), Target::Md2inao);
    }
}
