//! HTML and EPUB (XHTML) output.

use super::{caption_label, escape_xml, plain, unescape_xml, Builder};
use crate::config::Target;
use crate::context::Context;
use crate::error::{BuildError, BuildResult};
use crate::ids::norm_id;
use crate::index::{HeadlineKind, IndexError};
use crate::ir::{
    AlignKind, Block, BulletItem, CodeBlock, ColumnHead, Figure, FigureKind, Headline,
    Inline, ItemRef, ListBlock, Paragraph, Style, Table, TableKind,
};

pub struct HtmlBuilder {
    epub: bool,
    nonum: usize,
}

impl HtmlBuilder {
    pub fn new() -> Self {
        HtmlBuilder {
            epub: false,
            nonum: 0,
        }
    }

    pub fn epub() -> Self {
        HtmlBuilder {
            epub: true,
            nonum: 0,
        }
    }

    fn epub3(&self, ctx: &Context<'_>) -> bool {
        self.epub && ctx.config().epubversion >= 3
    }

    fn caption(&self, ctx: &Context<'_>, key: &str, number: Option<&str>, caption: Option<&str>) -> String {
        match (number, caption) {
            (Some(n), Some(c)) => format!(
                "{}{}{}",
                caption_label(ctx, key, n),
                ctx.locale.t("html_caption_prefix", &[]),
                c
            ),
            (Some(n), None) => caption_label(ctx, key, n),
            (None, Some(c)) => c.to_string(),
            (None, None) => String::new(),
        }
    }

    fn href(&self, ctx: &Context<'_>, chapter_id: &str, anchor: &str) -> String {
        format!("./{}.{}#{}", chapter_id, ctx.config().htmlext, anchor)
    }

    fn item_link(&self, ctx: &Context<'_>, class: &str, key: &str, item: &ItemRef) -> String {
        let label = caption_label(ctx, key, &item.number);
        if ctx.config().chapterlink {
            format!(
                "<span class=\"{}\"><a href=\"{}\">{}</a></span>",
                class,
                self.href(ctx, &item.chapter_id, &norm_id(&item.id)),
                label
            )
        } else {
            format!("<span class=\"{}\">{}</span>", class, label)
        }
    }

    fn code(&self, code: &CodeBlock, ctx: &Context<'_>) -> String {
        let mut out = String::new();
        let class = code.kind.name().trim_end_matches("num");
        match &code.id {
            Some(id) => out.push_str(&format!(
                "<div id=\"{}\" class=\"caption-code\">\n",
                norm_id(id)
            )),
            None => out.push_str(&format!("<div class=\"{}-code\">\n", class)),
        }
        let caption = self.caption(ctx, "list", code.number.as_deref(), code.caption.as_deref());
        if !caption.is_empty() {
            out.push_str(&format!("<p class=\"caption\">{}</p>\n", caption));
        }
        match &code.lang {
            Some(lang) => out.push_str(&format!(
                "<pre class=\"{} language-{}\">",
                class,
                escape_xml(lang)
            )),
            None => out.push_str(&format!("<pre class=\"{}\">", class)),
        }
        for (i, line) in code.lines.iter().enumerate() {
            if code.kind.numbered_lines() {
                out.push_str(&format!("{:>2}: ", code.first_line + i));
            }
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("</pre>\n</div>\n");
        out
    }

    fn table(&self, table: &Table, ctx: &Context<'_>) -> String {
        let mut out = String::new();
        match &table.id {
            Some(id) => out.push_str(&format!("<div id=\"{}\" class=\"table\">\n", norm_id(id))),
            None => out.push_str("<div class=\"table\">\n"),
        }
        let caption = match table.kind {
            TableKind::Table => {
                self.caption(ctx, "table", table.number.as_deref(), table.caption.as_deref())
            }
            TableKind::EmTable => table.caption.clone().unwrap_or_default(),
        };
        if !caption.is_empty() {
            out.push_str(&format!("<p class=\"caption\">{}</p>\n", caption));
        }
        out.push_str("<table>\n");
        for row in &table.header {
            out.push_str("<tr>");
            for cell in row {
                out.push_str(&format!("<th>{}</th>", cell));
            }
            out.push_str("</tr>\n");
        }
        for row in &table.body {
            out.push_str("<tr>");
            for cell in row {
                out.push_str(&format!("<td>{}</td>", cell));
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</table>\n</div>\n");
        out
    }

    fn figure(&self, figure: &Figure, ctx: &Context<'_>) -> String {
        let class = match figure.kind {
            FigureKind::ImageTable => "imgtable image",
            _ => "image",
        };
        let key = match figure.kind {
            FigureKind::ImageTable => "table",
            _ => "image",
        };
        let mut out = if figure.id.is_empty() {
            format!("<div class=\"{}\">\n", class)
        } else {
            format!("<div id=\"{}\" class=\"{}\">\n", norm_id(&figure.id), class)
        };
        let caption = self.caption(ctx, key, figure.number.as_deref(), figure.caption.as_deref());
        if figure.kind == FigureKind::ImageTable && !caption.is_empty() {
            out.push_str(&format!("<p class=\"caption\">{}</p>\n", caption));
        }
        match &figure.path {
            Some(path) => {
                let alt = escape_xml(&plain(figure.caption.as_deref().unwrap_or("")));
                let width = figure
                    .metric
                    .as_deref()
                    .and_then(scale_percent)
                    .map(|p| format!(" style=\"width: {}%\"", p))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"{} />\n",
                    escape_xml(&path.to_string_lossy()),
                    alt,
                    width
                ));
            }
            None => {
                out.push_str("<pre class=\"dummyimage\">\n");
                for line in &figure.dummy {
                    out.push_str(&escape_xml(line));
                    out.push('\n');
                }
                out.push_str("</pre>\n");
            }
        }
        if figure.kind != FigureKind::ImageTable && !caption.is_empty() {
            out.push_str(&format!("<p class=\"caption\">\n{}\n</p>\n", caption));
        }
        out.push_str("</div>\n");
        out
    }

    fn paragraphs(&self, paragraphs: &[String]) -> String {
        paragraphs
            .iter()
            .map(|p| format!("<p>{}</p>\n", p))
            .collect()
    }

    fn bullets(&self, items: &[BulletItem], out: &mut String) {
        out.push_str("<ul>\n");
        for item in items {
            out.push_str("<li>");
            out.push_str(&item.text);
            if !item.children.is_empty() {
                out.push('\n');
                self.bullets(&item.children, out);
            }
            out.push_str("</li>\n");
        }
        out.push_str("</ul>\n");
    }
}

impl Default for HtmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `scale=0.5` → `50`.
fn scale_percent(metric: &str) -> Option<u32> {
    metric.split(',').find_map(|part| {
        let value = part.trim().strip_prefix("scale=")?;
        let scale: f64 = value.trim().parse().ok()?;
        Some((scale * 100.0).round() as u32)
    })
}

impl Builder for HtmlBuilder {
    fn target(&self) -> Target {
        if self.epub {
            Target::Epub
        } else {
            Target::Html
        }
    }

    fn escape(&self, text: &str) -> String {
        escape_xml(text)
    }

    fn unescape(&self, text: &str) -> Option<String> {
        Some(unescape_xml(text))
    }

    fn headline(&mut self, h: &Headline, ctx: &Context<'_>) -> BuildResult {
        let level = h.level;
        if h.kind == HeadlineKind::Nodisp {
            return Ok(format!("<a id=\"h{}\"></a>\n", h.anchor));
        }
        let id_attr = h
            .label
            .as_deref()
            .map(|l| format!(" id=\"{}\"", norm_id(l)))
            .unwrap_or_default();
        if h.kind == HeadlineKind::Nonum {
            self.nonum += 1;
            let id_attr = if id_attr.is_empty() {
                format!(
                    " id=\"{}_nonum{}\"",
                    norm_id(ctx.chapter.id()),
                    self.nonum
                )
            } else {
                id_attr
            };
            return Ok(format!("<h{}{}>{}</h{}>\n", level, id_attr, h.caption, level));
        }
        let secno = h
            .prefix
            .as_deref()
            .map(|p| format!("<span class=\"secno\">{}</span>", escape_xml(p)))
            .unwrap_or_default();
        Ok(format!(
            "<h{level}{id_attr}><a id=\"h{anchor}\"></a>{secno}{caption}</h{level}>\n",
            level = level,
            id_attr = id_attr,
            anchor = h.anchor,
            secno = secno,
            caption = h.caption
        ))
    }

    fn paragraph(&mut self, p: &Paragraph, _ctx: &Context<'_>) -> BuildResult {
        if p.noindent {
            Ok(format!("<p class=\"noindent\">{}</p>\n", p.text))
        } else {
            Ok(format!("<p>{}</p>\n", p.text))
        }
    }

    fn list(&mut self, list: &ListBlock, _ctx: &Context<'_>) -> BuildResult {
        let mut out = String::new();
        match list {
            ListBlock::Unordered(items) => self.bullets(items, &mut out),
            ListBlock::Ordered(items) => {
                match items.first().map(|i| i.number.as_str()) {
                    Some(n) if n != "1" => out.push_str(&format!("<ol start=\"{}\">\n", n)),
                    _ => out.push_str("<ol>\n"),
                }
                for item in items {
                    out.push_str(&format!("<li>{}</li>\n", item.text));
                }
                out.push_str("</ol>\n");
            }
            ListBlock::Definition(items) => {
                out.push_str("<dl>\n");
                for item in items {
                    out.push_str(&format!("<dt>{}</dt>\n", item.term));
                    out.push_str(&format!("<dd>{}</dd>\n", item.body.join("")));
                }
                out.push_str("</dl>\n");
            }
        }
        Ok(out)
    }

    fn block(&mut self, block: &Block, ctx: &Context<'_>) -> BuildResult {
        let out = match block {
            Block::Code(code) => self.code(code, ctx),
            Block::Table(table) => self.table(table, ctx),
            Block::Figure(figure) => self.figure(figure, ctx),
            Block::Quote(paragraphs) => {
                format!("<blockquote>{}</blockquote>\n", self.paragraphs(paragraphs))
            }
            Block::Aligned { kind, paragraphs } => {
                let class = match kind {
                    AlignKind::Centering => "center",
                    other => other.name(),
                };
                format!("<div class=\"{}\">\n{}</div>\n", class, self.paragraphs(paragraphs))
            }
            Block::Box { caption, lines } => {
                let mut out = String::from("<div class=\"syntax\">\n");
                if let Some(c) = caption {
                    out.push_str(&format!("<p class=\"caption\">{}</p>\n", c));
                }
                out.push_str("<pre class=\"syntax\">");
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("</pre>\n</div>\n");
                out
            }
            Block::Note {
                kind,
                caption,
                paragraphs,
            } => {
                let mut out = format!("<div class=\"{}\">\n", kind.name());
                if let Some(c) = caption {
                    out.push_str(&format!("<p class=\"caption\">{}</p>\n", c));
                }
                out.push_str(&self.paragraphs(paragraphs));
                out.push_str("</div>\n");
                out
            }
            Block::Footnote(note) => {
                let epub_type = if self.epub3(ctx) {
                    " epub:type=\"footnote\""
                } else {
                    ""
                };
                format!(
                    "<div class=\"footnote\"{} id=\"fn-{}\"><p class=\"footnote\">[*{}] {}</p></div>\n",
                    epub_type,
                    norm_id(&note.id),
                    note.number,
                    note.content
                )
            }
            Block::Endnotes(notes) => {
                let mut out = String::from("<div class=\"endnotes\">\n");
                for note in notes {
                    out.push_str(&format!(
                        "<div class=\"endnote\" id=\"endnote-{}\"><p class=\"endnote\">[({})] {}</p></div>\n",
                        norm_id(&note.id),
                        note.number,
                        note.content
                    ));
                }
                out.push_str("</div>\n");
                out
            }
            Block::Bibpaper {
                id,
                number,
                caption,
                paragraphs,
            } => format!(
                "<div class=\"bibpaper\">\n<a id=\"bib-{}\">[{}]</a> {}\n{}</div>\n",
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
                let body = format!(
                    "<div class=\"equation\">\n<pre>{}\n</pre>\n</div>\n",
                    escape_xml(&lines.join("\n"))
                );
                match id {
                    Some(id) => format!(
                        "<div id=\"{}\" class=\"caption-equation\">\n<p class=\"caption\">{}</p>\n{}</div>\n",
                        norm_id(id),
                        self.caption(ctx, "equation", number.as_deref(), caption.as_deref()),
                        body
                    ),
                    None => body,
                }
            }
            Block::Comment(lines) => {
                let lines: Vec<String> = lines.iter().map(|l| escape_xml(l)).collect();
                format!("<div class=\"draft-comment\">{}</div>\n", lines.join("<br />"))
            }
            Block::Label(id) => format!("<a id=\"{}\"></a>\n", norm_id(id)),
            Block::BlankLine => "<p><br /></p>\n".to_string(),
            Block::PageBreak => "<br class=\"pagebreak\" />\n".to_string(),
            Block::Hr => "<hr />\n".to_string(),
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
                Style::Tt => format!("<code class=\"tt\">{}</code>", body),
                Style::TtItalic => format!("<code class=\"tt\"><i>{}</i></code>", body),
                Style::TtBold => format!("<code class=\"tt\"><b>{}</b></code>", body),
                Style::Underline => format!("<u>{}</u>", body),
                Style::Ins => format!("<ins>{}</ins>", body),
                Style::Del => format!("<del>{}</del>", body),
                Style::Sup => format!("<sup>{}</sup>", body),
                Style::Sub => format!("<sub>{}</sub>", body),
                Style::Bou | Style::Ami | Style::Tcy | Style::Balloon | Style::Big | Style::Small => {
                    format!("<span class=\"{}\">{}</span>", style.name(), body)
                }
                Style::Q => format!("<span class=\"quote\">「{}」</span>", body),
                Style::Abbr | Style::Acronym | Style::Cite | Style::Dfn | Style::Kbd | Style::Samp | Style::Var => {
                    format!("<{tag}>{}</{tag}>", body, tag = style.name())
                }
            },
            Inline::Code(code) => format!("<code class=\"inline-code tt\">{}</code>", e(code)),
            Inline::Math(math) => format!("<span class=\"equation\">{}</span>", e(math)),
            Inline::Index { term, hidden } => {
                let marker = format!("<!-- IDX:{} -->", e(term));
                if *hidden {
                    marker
                } else {
                    format!("{}{}", e(term), marker)
                }
            }
            Inline::Comment(text) => format!("<span class=\"draft-comment\">{}</span>", e(text)),
            Inline::Dtp(text) => format!("<?dtp {} ?>", e(text)),
            Inline::Ruby { base, ruby } => format!(
                "<ruby>{}<rp>（</rp><rt>{}</rt><rp>）</rp></ruby>",
                e(base),
                e(ruby)
            ),
            Inline::Keyword { word, alt } => match alt {
                Some(alt) => format!(
                    "<b class=\"kw\">{}（{}）</b><!-- IDX:{} -->",
                    e(word),
                    e(alt),
                    e(word)
                ),
                None => format!("<b class=\"kw\">{}</b><!-- IDX:{} -->", e(word), e(word)),
            },
            Inline::Href { url, label } => format!(
                "<a href=\"{}\" class=\"link\">{}</a>",
                e(url),
                e(label.as_deref().unwrap_or(url))
            ),
            Inline::List(item) => self.item_link(ctx, "listref", "list", item),
            Inline::Table(item) => self.item_link(ctx, "tableref", "table", item),
            Inline::Image(item) => self.item_link(ctx, "imgref", "image", item),
            Inline::Equation(item) => self.item_link(ctx, "eqref", "equation", item),
            Inline::Icon { id, path } => match path {
                Some(path) => format!(
                    "<img src=\"{}\" alt=\"[{}]\" />",
                    e(&path.to_string_lossy()),
                    e(id)
                ),
                None => {
                    return Err(BuildError::Reference(IndexError::NotFound {
                        kind: "image file",
                        id: id.clone(),
                    }))
                }
            },
            Inline::Footnote(note) => {
                let epub_type = if self.epub3(ctx) {
                    " epub:type=\"noteref\""
                } else {
                    ""
                };
                format!(
                    "<a id=\"fnb-{id}\" href=\"#fn-{id}\" class=\"noteref\"{}>*{}</a>",
                    epub_type,
                    note.number,
                    id = norm_id(&note.id)
                )
            }
            Inline::Endnote(note) => format!(
                "<a id=\"endnoteb-{id}\" href=\"#endnote-{id}\" class=\"noteref\">({})</a>",
                note.number,
                id = norm_id(&note.id)
            ),
            Inline::Headline(r) => {
                let text = match &r.number {
                    Some(n) => ctx.locale.t("hd_quote", &[n, &r.caption]),
                    None => ctx.locale.t("hd_quote_without_number", &[&r.caption]),
                };
                if ctx.config().chapterlink {
                    format!(
                        "<a href=\"{}\">{}</a>",
                        self.href(ctx, &r.chapter_id, &format!("h{}", r.anchor)),
                        text
                    )
                } else {
                    text
                }
            }
            Inline::SectionNumber(r) => r.number.clone().unwrap_or_default(),
            Inline::SectionTitle(r) => {
                if ctx.config().chapterlink {
                    format!(
                        "<a href=\"{}\">{}</a>",
                        self.href(ctx, &r.chapter_id, &format!("h{}", r.anchor)),
                        r.caption
                    )
                } else {
                    r.caption.clone()
                }
            }
            Inline::Column {
                chapter_id,
                id,
                caption,
            } => {
                let text = ctx.locale.t("column", &[caption]);
                if ctx.config().chapterlink {
                    format!(
                        "<a href=\"{}\" class=\"columnref\">{}</a>",
                        self.href(ctx, chapter_id, &norm_id(id)),
                        text
                    )
                } else {
                    text
                }
            }
            Inline::ChapterNumber(c) => c.number.clone().unwrap_or_else(|| c.title.clone()),
            Inline::ChapterTitle(c) | Inline::ChapterLink(c) => {
                let text = match (node, &c.number) {
                    (Inline::ChapterLink(_), Some(n)) => {
                        format!("{}{}", n, ctx.locale.t("chapter_quote", &[&c.title]))
                    }
                    (Inline::ChapterLink(_), None) => {
                        ctx.locale.t("chapter_quote_without_number", &[&c.title])
                    }
                    _ => c.title.clone(),
                };
                if ctx.config().chapterlink {
                    format!("<a href=\"./{}.{}\">{}</a>", c.id, ctx.config().htmlext, text)
                } else {
                    text
                }
            }
            Inline::Bib { id, number } => format!(
                "<a href=\"{}\">{}</a>",
                self.href(ctx, &ctx.config().bib_file, &format!("bib-{}", norm_id(id))),
                ctx.locale.t("bib_quote", &[&number.to_string()])
            ),
            Inline::Uchar(c) => format!("&#x{:x};", *c as u32),
            Inline::Br => "<br />".to_string(),
            Inline::PageRef(_) => return Err(self.unsupported(node.name())),
        };
        Ok(out)
    }

    fn column_begin(&mut self, column: &ColumnHead, _ctx: &Context<'_>) -> BuildResult {
        let id = column
            .label
            .clone()
            .unwrap_or_else(|| format!("column-{}", column.number));
        Ok(format!(
            "<div class=\"column\">\n\n<h{level}><a id=\"{}\"></a>{}</h{level}>\n",
            norm_id(&id),
            column.caption,
            level = column.level
        ))
    }

    fn column_end(&mut self, _level: usize, _ctx: &Context<'_>) -> BuildResult {
        Ok("</div>\n".to_string())
    }

    fn finish(&mut self, body: String, ctx: &Context<'_>) -> String {
        let lang = ctx.locale.language();
        let title = escape_xml(&plain(ctx.chapter.title()));
        let mut out = String::new();
        if self.epub {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n");
            out.push_str(&format!(
                "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" xml:lang=\"{}\" lang=\"{}\">\n",
                lang, lang
            ));
        } else {
            out.push_str(&format!("<!DOCTYPE html>\n<html lang=\"{}\">\n", lang));
        }
        out.push_str("<head>\n<meta charset=\"UTF-8\" />\n");
        out.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", title));
        out.push_str(&body);
        out.push_str("</body>\n</html>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_percent() {
        assert_eq!(scale_percent("scale=0.5"), Some(50));
        assert_eq!(scale_percent("latex::width=3cm,scale=1.2"), Some(120));
        assert_eq!(scale_percent("width=3cm"), None);
    }

    #[test]
    fn test_target_follows_flavor() {
        assert_eq!(HtmlBuilder::new().target(), Target::Html);
        assert_eq!(HtmlBuilder::epub().target(), Target::Epub);
    }

    #[test]
    fn test_escape() {
        let b = HtmlBuilder::new();
        assert_eq!(b.escape("<a & b>"), "&lt;a &amp; b&gt;");
        assert_eq!(b.unescape("&lt;a&gt;").as_deref(), Some("<a>"));
    }
}
