//! IDGXML, the tagged XML InDesign imports.
//!
//! InDesign treats newlines as paragraph breaks, so constructs are emitted
//! without separating newlines; only preformatted bodies carry them.

use super::{caption_label, escape_xml, unescape_xml, Builder};
use crate::config::Target;
use crate::context::Context;
use crate::error::{BuildError, BuildResult};
use crate::ids::norm_id;
use crate::index::{HeadlineKind, IndexError};
use crate::ir::{
    AlignKind, Block, BulletItem, CodeBlock, CodeKind, ColumnHead, Figure, FigureKind, Headline,
    Inline, ListBlock, Paragraph, Style, Table, TableKind,
};

const AID_NS: &str = "http://ns.adobe.com/AdobeInDesign/4.0/";
const AID5_NS: &str = "http://ns.adobe.com/AdobeInDesign/5.0/";

pub struct IdgxmlBuilder;

impl IdgxmlBuilder {
    pub fn new() -> Self {
        IdgxmlBuilder
    }

    fn caption(&self, ctx: &Context<'_>, key: &str, number: Option<&str>, caption: Option<&str>) -> String {
        match (number, caption) {
            (Some(n), Some(c)) => format!(
                "{}{}{}",
                caption_label(ctx, key, n),
                ctx.locale.t("caption_prefix_idgxml", &[]),
                c
            ),
            (Some(n), None) => caption_label(ctx, key, n),
            (None, Some(c)) => c.to_string(),
            (None, None) => String::new(),
        }
    }

    fn link(&self, ctx: &Context<'_>, href: &str, text: String) -> String {
        if ctx.config().chapterlink {
            format!("<link href=\"{}\">{}</link>", href, text)
        } else {
            text
        }
    }

    fn code(&self, code: &CodeBlock, ctx: &Context<'_>) -> String {
        let kind = code.kind.name().trim_end_matches("num");
        let mut out = if code.kind == CodeKind::Source {
            "<source>".to_string()
        } else {
            format!("<list type='{}'>", kind)
        };
        let caption = self.caption(ctx, "list", code.number.as_deref(), code.caption.as_deref());
        if !caption.is_empty() {
            out.push_str(&format!("<caption aid:pstyle='{}title'>{}</caption>", kind, caption));
        }
        out.push_str("<pre>");
        for (i, line) in code.lines.iter().enumerate() {
            if code.kind.numbered_lines() {
                out.push_str(&format!("<span type='lineno'>{:>2}: </span>", code.first_line + i));
            }
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("</pre>");
        out.push_str(if code.kind == CodeKind::Source {
            "</source>"
        } else {
            "</list>"
        });
        out
    }

    fn table(&self, table: &Table, ctx: &Context<'_>) -> String {
        let mut out = String::from("<table>");
        let caption = match table.kind {
            TableKind::Table => {
                self.caption(ctx, "table", table.number.as_deref(), table.caption.as_deref())
            }
            TableKind::EmTable => table.caption.clone().unwrap_or_default(),
        };
        if !caption.is_empty() {
            out.push_str(&format!("<caption aid:pstyle=\"tablecaption\">{}</caption>", caption));
        }
        let rows = table.header.len() + table.body.len();
        out.push_str(&format!(
            "<tbody xmlns:aid5=\"{}\" aid:table=\"table\" aid:trows=\"{}\" aid:tcols=\"{}\">",
            AID5_NS,
            rows,
            table.columns()
        ));
        for row in &table.header {
            for cell in row {
                out.push_str(&format!(
                    "<td aid:table=\"cell\" aid:theader=\"1\" aid:crows=\"1\" aid:ccols=\"1\">{}</td>",
                    cell
                ));
            }
        }
        for row in &table.body {
            for cell in row {
                out.push_str(&format!(
                    "<td aid:table=\"cell\" aid:crows=\"1\" aid:ccols=\"1\">{}</td>",
                    cell
                ));
            }
        }
        out.push_str("</tbody></table>");
        out
    }

    fn figure(&self, figure: &Figure, ctx: &Context<'_>) -> String {
        let key = if figure.kind == FigureKind::ImageTable {
            "table"
        } else {
            "image"
        };
        let mut out = String::from("<img>");
        match &figure.path {
            Some(path) => out.push_str(&format!(
                "<Image href=\"file://{}\"/>",
                escape_xml(&path.to_string_lossy())
            )),
            None => {
                out.push_str("<pre aid:pstyle=\"dummyimage\">");
                for line in &figure.dummy {
                    out.push_str(&escape_xml(line));
                    out.push('\n');
                }
                out.push_str("</pre>");
            }
        }
        let caption = self.caption(ctx, key, figure.number.as_deref(), figure.caption.as_deref());
        if !caption.is_empty() {
            out.push_str(&format!("<caption>{}</caption>", caption));
        }
        out.push_str("</img>");
        out
    }

    fn paragraphs(&self, paragraphs: &[String]) -> String {
        paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect()
    }

    fn bullets(&self, items: &[BulletItem], depth: usize, out: &mut String) {
        out.push_str(&format!("<ul{}>", if depth > 1 { format!(" level=\"{}\"", depth) } else { String::new() }));
        for item in items {
            out.push_str(&format!("<li aid:pstyle=\"ul-item\">{}", item.text));
            if !item.children.is_empty() {
                self.bullets(&item.children, depth + 1, out);
            }
            out.push_str("</li>");
        }
        out.push_str("</ul>");
    }
}

impl Default for IdgxmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for IdgxmlBuilder {
    fn target(&self) -> Target {
        Target::Idgxml
    }

    fn escape(&self, text: &str) -> String {
        escape_xml(text)
    }

    fn unescape(&self, text: &str) -> Option<String> {
        Some(unescape_xml(text))
    }

    fn headline(&mut self, h: &Headline, _ctx: &Context<'_>) -> BuildResult {
        let id_attr = h
            .label
            .as_deref()
            .map(|l| format!(" id=\"{}\"", norm_id(l)))
            .unwrap_or_default();
        let text = format!("{}{}", h.prefix.as_deref().unwrap_or(""), h.caption);
        let out = match h.kind {
            HeadlineKind::Nodisp => format!(
                "<?dtp level=\"{}\" section=\"{}\"?>",
                h.level,
                escape_xml(&text)
            ),
            _ => format!(
                "<title{} aid:pstyle=\"h{}\">{}</title><?dtp level=\"{}\" section=\"{}\"?>",
                id_attr,
                h.level,
                text,
                h.level,
                escape_xml(&text)
            ),
        };
        Ok(out)
    }

    fn paragraph(&mut self, p: &Paragraph, _ctx: &Context<'_>) -> BuildResult {
        if p.noindent {
            Ok(format!("<p aid:pstyle=\"noindent\" noindent='1'>{}</p>", p.text))
        } else if p.tabs > 0 {
            Ok(format!("<p inlist=\"{}\">{}</p>", p.tabs, p.text))
        } else {
            Ok(format!("<p>{}</p>", p.text))
        }
    }

    fn list(&mut self, list: &ListBlock, _ctx: &Context<'_>) -> BuildResult {
        let mut out = String::new();
        match list {
            ListBlock::Unordered(items) => self.bullets(items, 1, &mut out),
            ListBlock::Ordered(items) => {
                out.push_str("<ol>");
                for (i, item) in items.iter().enumerate() {
                    out.push_str(&format!(
                        "<li aid:pstyle=\"ol-item\" olnum=\"{}\" num=\"{}\">{}</li>",
                        i + 1,
                        item.number,
                        item.text
                    ));
                }
                out.push_str("</ol>");
            }
            ListBlock::Definition(items) => {
                out.push_str("<dl>");
                for item in items {
                    out.push_str(&format!("<dt>{}</dt><dd>{}</dd>", item.term, item.body.join("")));
                }
                out.push_str("</dl>");
            }
        }
        Ok(out)
    }

    fn block(&mut self, block: &Block, ctx: &Context<'_>) -> BuildResult {
        let out = match block {
            Block::Code(code) => self.code(code, ctx),
            Block::Table(table) => self.table(table, ctx),
            Block::Figure(figure) => self.figure(figure, ctx),
            Block::Quote(paragraphs) => format!("<quote>{}</quote>", self.paragraphs(paragraphs)),
            Block::Aligned { kind, paragraphs } => match kind {
                AlignKind::Lead => format!("<lead>{}</lead>", self.paragraphs(paragraphs)),
                AlignKind::FlushRight => paragraphs
                    .iter()
                    .map(|p| format!("<p align='right'>{}</p>", p))
                    .collect(),
                AlignKind::Centering => paragraphs
                    .iter()
                    .map(|p| format!("<p align='center'>{}</p>", p))
                    .collect(),
            },
            Block::Box { caption, lines } => {
                let mut out = String::from("<box>");
                if let Some(c) = caption {
                    out.push_str(&format!("<caption aid:pstyle=\"boxtitle\">{}</caption>", c));
                }
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("</box>");
                out
            }
            Block::Note {
                kind,
                caption,
                paragraphs,
            } => {
                let name = kind.name();
                let mut out = format!("<{}>", name);
                if let Some(c) = caption {
                    out.push_str(&format!("<title aid:pstyle='{}-title'>{}</title>", name, c));
                }
                out.push_str(&self.paragraphs(paragraphs));
                out.push_str(&format!("</{}>", name));
                out
            }
            // The text travels with the @<fn> reference.
            Block::Footnote(_) => String::new(),
            Block::Endnotes(notes) => {
                let mut out = String::from("<endnotes>");
                for note in notes {
                    out.push_str(&format!(
                        "<endnote id=\"endnote-{}\"><span type='endnotenumber'>({})</span>\t{}</endnote>",
                        norm_id(&note.id),
                        note.number,
                        note.content
                    ));
                }
                out.push_str("</endnotes>");
                out
            }
            Block::Bibpaper {
                id,
                number,
                caption,
                paragraphs,
            } => format!(
                "<bibitem id=\"bib-{}\"><caption><span type='bibno'>[{}] </span>{}</caption>{}</bibitem>",
                norm_id(id),
                number,
                caption,
                self.paragraphs(paragraphs)
            ),
            Block::Equation {
                id,
                number,
                caption,
                lines,
            } => {
                let body = format!("<equation><pre>{}\n</pre></equation>", escape_xml(&lines.join("\n")));
                match id {
                    Some(_) => format!(
                        "<equationblock><caption>{}</caption>{}</equationblock>",
                        self.caption(ctx, "equation", number.as_deref(), caption.as_deref()),
                        body
                    ),
                    None => body,
                }
            }
            Block::Comment(lines) => {
                let lines: Vec<String> = lines.iter().map(|l| escape_xml(l)).collect();
                format!("<msg>{}</msg>", lines.join("\n"))
            }
            Block::Label(id) => format!("<label id='{}' />", norm_id(id)),
            Block::BlankLine => "<p/>".to_string(),
            Block::PageBreak => "<pagebreak />".to_string(),
            Block::Hr => "<hr/>".to_string(),
        };
        Ok(out)
    }

    fn inline(&self, node: &Inline, ctx: &Context<'_>) -> BuildResult {
        let e = |s: &str| escape_xml(s);
        let out = match node {
            Inline::Styled(style, body) => match style {
                Style::Bold => format!("<b>{}</b>", body),
                Style::Italic => format!("<i>{}</i>", body),
                Style::Em => format!("<em>{}</em>", body),
                Style::Strong => format!("<strong>{}</strong>", body),
                Style::Tt => format!("<tt>{}</tt>", body),
                Style::TtItalic => format!("<tt style='italic'>{}</tt>", body),
                Style::TtBold => format!("<tt style='bold'>{}</tt>", body),
                Style::Underline => format!("<underline>{}</underline>", body),
                Style::Ins => format!("<ins>{}</ins>", body),
                Style::Del => format!("<del>{}</del>", body),
                Style::Sup => format!("<sup>{}</sup>", body),
                Style::Sub => format!("<sub>{}</sub>", body),
                Style::Bou | Style::Ami | Style::Tcy | Style::Balloon => {
                    format!("<{tag}>{}</{tag}>", body, tag = style.name())
                }
                Style::Big | Style::Small => format!("<span type='{}'>{}</span>", style.name(), body),
                Style::Q => format!("「{}」", body),
                Style::Abbr
                | Style::Acronym
                | Style::Cite
                | Style::Dfn
                | Style::Kbd
                | Style::Samp
                | Style::Var => body.clone(),
            },
            Inline::Code(code) => format!("<tt type='inline-code'>{}</tt>", e(code)),
            Inline::Math(math) => format!("<m>{}</m>", e(math)),
            Inline::Index { term, hidden } => {
                let marker = format!("<index value=\"{}\" />", e(term));
                if *hidden {
                    marker
                } else {
                    format!("{}{}", e(term), marker)
                }
            }
            Inline::Comment(text) => format!("<msg>{}</msg>", e(text)),
            Inline::Dtp(text) => format!("<?dtp {} ?>", e(text)),
            Inline::Ruby { base, ruby } => format!(
                "<GroupRuby><aid:ruby xmlns:aid=\"{}\"><aid:rb>{}</aid:rb><aid:rt>{}</aid:rt></aid:ruby></GroupRuby>",
                AID_NS,
                e(base),
                e(ruby)
            ),
            Inline::Keyword { word, alt } => match alt {
                Some(alt) => format!(
                    "<keyword>{}（{}）</keyword><index value=\"{}\" />",
                    e(word),
                    e(alt),
                    e(word)
                ),
                None => format!("<keyword>{}</keyword><index value=\"{}\" />", e(word), e(word)),
            },
            Inline::Href { url, label } => format!(
                "<a linkurl='{}'>{}</a>",
                e(url),
                e(label.as_deref().unwrap_or(url))
            ),
            Inline::List(item) => format!("<span type='list'>{}</span>", caption_label(ctx, "list", &item.number)),
            Inline::Table(item) => format!("<span type='table'>{}</span>", caption_label(ctx, "table", &item.number)),
            Inline::Image(item) => format!("<span type='image'>{}</span>", caption_label(ctx, "image", &item.number)),
            Inline::Equation(item) => format!("<span type='eq'>{}</span>", caption_label(ctx, "equation", &item.number)),
            Inline::Icon { id, path } => match path {
                Some(path) => format!(
                    "<Image href=\"file://{}\" type=\"inline\"/>",
                    e(&path.to_string_lossy())
                ),
                None => {
                    return Err(BuildError::Reference(IndexError::NotFound {
                        kind: "image file",
                        id: id.clone(),
                    }))
                }
            },
            Inline::Footnote(note) => format!("<footnote>{}</footnote>", note.content),
            Inline::Endnote(note) => format!(
                "<span type='endnoteref' idref='endnoteb-{}'>({})</span>",
                norm_id(&note.id),
                note.number
            ),
            Inline::Headline(r) => match &r.number {
                Some(n) => ctx.locale.t("hd_quote", &[n, &r.caption]),
                None => ctx.locale.t("hd_quote_without_number", &[&r.caption]),
            },
            Inline::SectionNumber(r) => r.number.clone().unwrap_or_default(),
            Inline::SectionTitle(r) => r.caption.clone(),
            Inline::Column { id, caption, .. } => self.link(
                ctx,
                &format!("column-{}", norm_id(id)),
                ctx.locale.t("column", &[caption]),
            ),
            Inline::ChapterNumber(c) => self.link(
                ctx,
                &c.id,
                c.number.clone().unwrap_or_else(|| c.title.clone()),
            ),
            Inline::ChapterTitle(c) => self.link(ctx, &c.id, c.title.clone()),
            Inline::ChapterLink(c) => {
                let text = match &c.number {
                    Some(n) => format!("{}{}", n, ctx.locale.t("chapter_quote", &[&c.title])),
                    None => ctx.locale.t("chapter_quote_without_number", &[&c.title]),
                };
                self.link(ctx, &c.id, text)
            }
            Inline::Bib { id, number } => format!(
                "<span type='bibref' idref='{}'>{}</span>",
                norm_id(id),
                ctx.locale.t("bib_quote", &[&number.to_string()])
            ),
            Inline::Uchar(c) => format!("&#x{:x};", *c as u32),
            Inline::Br => "\n".to_string(),
            Inline::PageRef(id) => format!("<pageref idref='{}'>●●</pageref>", e(id)),
        };
        Ok(out)
    }

    fn column_begin(&mut self, column: &ColumnHead, _ctx: &Context<'_>) -> BuildResult {
        let id = column
            .label
            .clone()
            .unwrap_or_else(|| format!("column-{}", column.number));
        Ok(format!(
            "<column id=\"column-{}\"><title aid:pstyle=\"columntitle\">{}</title>",
            norm_id(&id),
            column.caption
        ))
    }

    fn column_end(&mut self, _level: usize, _ctx: &Context<'_>) -> BuildResult {
        Ok("</column>".to_string())
    }

    fn finish(&mut self, body: String, _ctx: &Context<'_>) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<doc xmlns:aid=\"{}\">{}</doc>\n",
            AID_NS, body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        let b = IdgxmlBuilder::new();
        assert_eq!(b.escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_target() {
        assert_eq!(IdgxmlBuilder::new().target(), Target::Idgxml);
    }
}
