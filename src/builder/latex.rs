//! LaTeX output for the `review-*` style macros.

use super::{caption_label, Builder};
use crate::config::Target;
use crate::context::Context;
use crate::error::{BuildError, BuildResult};
use crate::index::{HeadlineKind, IndexError};
use crate::ir::{
    AlignKind, Block, BulletItem, CodeBlock, CodeKind, ColumnHead, Figure, FigureKind, Headline,
    Inline, ListBlock, Paragraph, Style, Table, TableKind,
};

const SECTIONS: [&str; 6] = [
    "chapter",
    "section",
    "subsection",
    "subsubsection",
    "paragraph",
    "subparagraph",
];

/// Escapes in the order `unescape` must try them: longest first.
const ESCAPES: &[(char, &str)] = &[
    ('\\', "\\reviewbackslash{}"),
    ('^', "\\textasciicircum{}"),
    ('~', "\\textasciitilde{}"),
    ('_', "\\textunderscore{}"),
    ('>', "\\textgreater{}"),
    ('$', "\\textdollar{}"),
    ('<', "\\textless{}"),
    ('|', "\\textbar{}"),
    ('{', "\\{"),
    ('}', "\\}"),
    ('#', "\\#"),
    ('%', "\\%"),
    ('&', "\\&"),
];

pub struct LatexBuilder;

impl LatexBuilder {
    pub fn new() -> Self {
        LatexBuilder
    }

    fn caption(&self, ctx: &Context<'_>, key: &str, number: Option<&str>, caption: Option<&str>) -> String {
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

    fn code(&self, code: &CodeBlock, ctx: &Context<'_>) -> String {
        let env = match code.kind {
            CodeKind::List | CodeKind::ListNum => "list",
            CodeKind::EmList | CodeKind::EmListNum => "emlist",
            CodeKind::Source => "source",
            CodeKind::Cmd => "cmd",
        };
        let mut out = format!("\\begin{{review{}block}}\n", env);
        let caption = self.caption(ctx, "list", code.number.as_deref(), code.caption.as_deref());
        if !caption.is_empty() {
            out.push_str(&format!("\\review{}caption{{{}}}\n", env, caption));
        }
        out.push_str(&format!("\\begin{{review{}}}\n", env));
        for (i, line) in code.lines.iter().enumerate() {
            if code.kind.numbered_lines() {
                out.push_str(&format!("{:>2}: ", code.first_line + i));
            }
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!("\\end{{review{}}}\n\\end{{review{}block}}\n", env, env));
        out
    }

    fn table_spec(&self, table: &Table) -> String {
        match &table.tsize {
            Some(spec) if spec.contains(|c| matches!(c, 'l' | 'c' | 'r' | 'p')) => spec.clone(),
            _ => format!("|{}", "l|".repeat(table.columns().max(1))),
        }
    }

    fn table(&self, table: &Table, ctx: &Context<'_>) -> String {
        let mut out = String::new();
        let floating = table.kind == TableKind::Table && table.id.is_some();
        if let (true, Some(id)) = (floating, &table.id) {
            out.push_str(&format!("\\begin{{table}}[h]%%{}\n", id));
            let caption = self.caption(ctx, "table", table.number.as_deref(), table.caption.as_deref());
            out.push_str(&format!("\\reviewtablecaption{{{}}}\n", caption));
            out.push_str(&format!("\\label{{table:{}:{}}}\n", ctx.chapter.id(), id));
        } else if let Some(caption) = &table.caption {
            out.push_str(&format!("\\reviewtablecaption*{{{}}}\n", caption));
        }
        out.push_str(&format!("\\begin{{reviewtable}}{{{}}}\n\\hline\n", self.table_spec(table)));
        for row in &table.header {
            let cells: Vec<String> = row.iter().map(|c| format!("\\reviewth{{{}}}", c)).collect();
            out.push_str(&format!("{} \\\\  \\hline\n", cells.join(" & ")));
        }
        for row in &table.body {
            out.push_str(&format!("{} \\\\  \\hline\n", row.join(" & ")));
        }
        out.push_str("\\end{reviewtable}\n");
        if floating {
            out.push_str("\\end{table}\n");
        }
        out
    }

    fn graphics(&self, figure: &Figure) -> String {
        let options = figure
            .metric
            .as_deref()
            .map(latex_metric)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "width=\\maxwidth".to_string());
        match &figure.path {
            Some(path) => format!(
                "\\includegraphics[{}]{{{}}}\n",
                options,
                path.to_string_lossy()
            ),
            None => {
                let lines: Vec<String> = figure.dummy.iter().map(|l| self.escape(l)).collect();
                format!(
                    "\\begin{{reviewdummyimage}}\n{}\n\\end{{reviewdummyimage}}\n",
                    lines.join("\\\\\n")
                )
            }
        }
    }

    fn figure(&self, figure: &Figure, ctx: &Context<'_>) -> String {
        let chapter = ctx.chapter.id();
        match figure.kind {
            FigureKind::Image | FigureKind::Graph => {
                let mut out = format!("\\begin{{reviewimage}}%%{}\n", figure.id);
                out.push_str(&self.graphics(figure));
                let caption =
                    self.caption(ctx, "image", figure.number.as_deref(), figure.caption.as_deref());
                out.push_str(&format!("\\reviewimagecaption{{{}}}\n", caption));
                out.push_str(&format!("\\label{{image:{}:{}}}\n", chapter, figure.id));
                out.push_str("\\end{reviewimage}\n");
                out
            }
            FigureKind::Independent | FigureKind::Numberless => {
                let mut out = format!("\\begin{{reviewimage}}%%{}\n", figure.id);
                out.push_str(&self.graphics(figure));
                if let Some(c) = &figure.caption {
                    out.push_str(&format!("\\reviewindepimagecaption{{{}}}\n", c));
                }
                out.push_str("\\end{reviewimage}\n");
                out
            }
            FigureKind::ImageTable => {
                let mut out = format!("\\begin{{table}}[h]%%{}\n", figure.id);
                let caption =
                    self.caption(ctx, "table", figure.number.as_deref(), figure.caption.as_deref());
                out.push_str(&format!("\\reviewimgtablecaption{{{}}}\n", caption));
                out.push_str(&format!("\\label{{table:{}:{}}}\n", chapter, figure.id));
                out.push_str("\\begin{reviewimage}\n");
                out.push_str(&self.graphics(figure));
                out.push_str("\\end{reviewimage}\n\\end{table}\n");
                out
            }
        }
    }

    fn env(&self, name: &str, paragraphs: &[String]) -> String {
        format!(
            "\\begin{{{}}}\n{}\n\\end{{{}}}\n",
            name,
            paragraphs.join("\n\n"),
            name
        )
    }

    fn bullets(&self, items: &[BulletItem], out: &mut String) {
        out.push_str("\\begin{itemize}\n");
        for item in items {
            out.push_str(&format!("\\item {}\n", item.text));
            if !item.children.is_empty() {
                self.bullets(&item.children, out);
            }
        }
        out.push_str("\\end{itemize}\n");
    }
}

/// Keep unprefixed and `latex::` metric entries: `scale=0.5,html::width=50%`
/// becomes `scale=0.5`.
fn latex_metric(metric: &str) -> String {
    metric
        .split(',')
        .map(str::trim)
        .filter_map(|part| match part.split_once("::") {
            Some(("latex", rest)) => Some(rest),
            Some(_) => None,
            None => Some(part),
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

impl Default for LatexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for LatexBuilder {
    fn target(&self) -> Target {
        Target::Latex
    }

    fn escape(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match ESCAPES.iter().find(|(raw, _)| *raw == c) {
                Some((_, escaped)) => out.push_str(escaped),
                None => out.push(c),
            }
        }
        out
    }

    fn unescape(&self, text: &str) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        'outer: while let Some(c) = rest.chars().next() {
            for (raw, escaped) in ESCAPES {
                if let Some(tail) = rest.strip_prefix(escaped) {
                    out.push(*raw);
                    rest = tail;
                    continue 'outer;
                }
            }
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
        Some(out)
    }

    fn headline(&mut self, h: &Headline, ctx: &Context<'_>) -> BuildResult {
        let command = SECTIONS[h.level.clamp(1, SECTIONS.len()) - 1];
        let label = if h.level == 1 {
            format!("chap:{}", ctx.chapter.id())
        } else {
            format!("sec:{}", h.anchor)
        };
        let out = match h.kind {
            HeadlineKind::Nodisp => format!(
                "\\addcontentsline{{toc}}{{{}}}{{{}}}\n",
                command, h.caption
            ),
            HeadlineKind::Nonum => format!(
                "\\{}*{{{}}}\n\\addcontentsline{{toc}}{{{}}}{{{}}}\n",
                command, h.caption, command, h.caption
            ),
            HeadlineKind::Notoc => format!("\\{}*{{{}}}\n\\label{{{}}}\n", command, h.caption, label),
            HeadlineKind::Numbered => {
                format!("\\{}{{{}}}\n\\label{{{}}}\n", command, h.caption, label)
            }
        };
        Ok(out)
    }

    fn paragraph(&mut self, p: &Paragraph, _ctx: &Context<'_>) -> BuildResult {
        if p.noindent {
            Ok(format!("\n\\noindent\n{}\n", p.text))
        } else {
            Ok(format!("\n{}\n", p.text))
        }
    }

    fn list(&mut self, list: &ListBlock, _ctx: &Context<'_>) -> BuildResult {
        let mut out = String::from("\n");
        match list {
            ListBlock::Unordered(items) => self.bullets(items, &mut out),
            ListBlock::Ordered(items) => {
                out.push_str("\\begin{enumerate}\n");
                if let Some(first) = items.first().and_then(|i| i.number.parse::<usize>().ok()) {
                    if first != 1 {
                        out.push_str(&format!("\\setcounter{{enumi}}{{{}}}\n", first - 1));
                    }
                }
                for item in items {
                    out.push_str(&format!("\\item {}\n", item.text));
                }
                out.push_str("\\end{enumerate}\n");
            }
            ListBlock::Definition(items) => {
                out.push_str("\\begin{description}\n");
                for item in items {
                    out.push_str(&format!("\\item[{}] \\mbox{{}}\n", item.term));
                    if !item.body.is_empty() {
                        out.push_str(&item.body.join("\n"));
                        out.push('\n');
                    }
                }
                out.push_str("\\end{description}\n");
            }
        }
        Ok(out)
    }

    fn block(&mut self, block: &Block, ctx: &Context<'_>) -> BuildResult {
        let out = match block {
            Block::Code(code) => self.code(code, ctx),
            Block::Table(table) => self.table(table, ctx),
            Block::Figure(figure) => self.figure(figure, ctx),
            Block::Quote(paragraphs) => self.env("quote", paragraphs),
            Block::Aligned { kind, paragraphs } => {
                let env = match kind {
                    AlignKind::Lead => "quotation",
                    AlignKind::FlushRight => "flushright",
                    AlignKind::Centering => "center",
                };
                self.env(env, paragraphs)
            }
            Block::Box { caption, lines } => {
                let mut out = String::from("\\begin{reviewboxblock}\n");
                if let Some(c) = caption {
                    out.push_str(&format!("\\reviewboxcaption{{{}}}\n", c));
                }
                out.push_str("\\begin{reviewbox}\n");
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("\\end{reviewbox}\n\\end{reviewboxblock}\n");
                out
            }
            Block::Note {
                kind,
                caption,
                paragraphs,
            } => {
                let option = caption
                    .as_deref()
                    .map(|c| format!("[{}]", c))
                    .unwrap_or_default();
                format!(
                    "\\begin{{review{}}}{}\n{}\n\\end{{review{}}}\n",
                    kind.name(),
                    option,
                    paragraphs.join("\n\n"),
                    kind.name()
                )
            }
            Block::Footnote(note) => {
                if ctx.config().footnotetext {
                    format!("\\footnotetext[{}]{{{}}}\n", note.number, note.content)
                } else {
                    String::new()
                }
            }
            Block::Endnotes(_) => "\n\\theendnotes\n".to_string(),
            Block::Bibpaper {
                id,
                number,
                caption,
                paragraphs,
            } => {
                let mut out = format!(
                    "[{}] {}\n\\label{{bib:{}}}\n",
                    number, caption, id
                );
                if !paragraphs.is_empty() {
                    out.push('\n');
                    out.push_str(&paragraphs.join("\n\n"));
                    out.push('\n');
                }
                out
            }
            Block::Equation {
                id,
                number,
                caption,
                lines,
            } => {
                let body = format!("\\begin{{equation*}}\n{}\n\\end{{equation*}}\n", lines.join("\n"));
                match id {
                    Some(_) => format!(
                        "\\begin{{reviewequationblock}}\n\\reviewequationcaption{{{}}}\n{}\\end{{reviewequationblock}}\n",
                        self.caption(ctx, "equation", number.as_deref(), caption.as_deref()),
                        body
                    ),
                    None => body,
                }
            }
            Block::Comment(lines) => {
                let lines: Vec<String> = lines.iter().map(|l| self.escape(l)).collect();
                format!("\\pdfcomment{{{}}}\n", lines.join("\\\\"))
            }
            Block::Label(id) => format!("\\label{{{}}}\n", id),
            Block::BlankLine => "\\vspace*{\\baselineskip}\n".to_string(),
            Block::PageBreak => "\\pagebreak\n".to_string(),
            Block::Hr => "\\hrule\n".to_string(),
        };
        Ok(out)
    }

    fn inline(&self, node: &Inline, ctx: &Context<'_>) -> BuildResult {
        let out = match node {
            Inline::Styled(style, body) => match style {
                Style::Bold => format!("\\reviewbold{{{}}}", body),
                Style::Italic | Style::Cite | Style::Dfn | Style::Var => {
                    format!("\\reviewit{{{}}}", body)
                }
                Style::Em => format!("\\reviewem{{{}}}", body),
                Style::Strong => format!("\\reviewstrong{{{}}}", body),
                Style::Tt | Style::Kbd | Style::Samp => format!("\\reviewtt{{{}}}", body),
                Style::TtItalic => format!("\\reviewtti{{{}}}", body),
                Style::TtBold => format!("\\reviewttb{{{}}}", body),
                Style::Underline => format!("\\reviewunderline{{{}}}", body),
                Style::Ins => format!("\\reviewinsert{{{}}}", body),
                Style::Del => format!("\\reviewstrike{{{}}}", body),
                Style::Sup => format!("\\textsuperscript{{{}}}", body),
                Style::Sub => format!("\\textsubscript{{{}}}", body),
                Style::Bou => format!("\\reviewbou{{{}}}", body),
                Style::Ami => format!("\\reviewami{{{}}}", body),
                Style::Tcy => format!("\\reviewtcy{{{}}}", body),
                Style::Balloon => format!("\\reviewballoon{{{}}}", body),
                Style::Big => format!("{{\\Large{{}}{}}}", body),
                Style::Small => format!("{{\\small{{}}{}}}", body),
                Style::Q => format!("「{}」", body),
                Style::Abbr | Style::Acronym => body.clone(),
            },
            Inline::Code(code) => format!("\\reviewcode{{{}}}", self.escape(code)),
            Inline::Math(math) => format!("${}$", math),
            Inline::Index { term, hidden } => {
                let index = format!("\\index{{{}}}", self.escape(term));
                if *hidden {
                    index
                } else {
                    format!("{}{}", self.escape(term), index)
                }
            }
            Inline::Comment(text) => format!("\\pdfcomment{{{}}}", self.escape(text)),
            Inline::Ruby { base, ruby } => {
                format!("\\ruby{{{}}}{{{}}}", self.escape(base), self.escape(ruby))
            }
            Inline::Keyword { word, alt } => match alt {
                Some(alt) => format!("\\reviewkw{{{}}}（{}）", self.escape(word), self.escape(alt)),
                None => format!("\\reviewkw{{{}}}", self.escape(word)),
            },
            Inline::Href { url, label } => match label {
                Some(label) => format!("\\href{{{}}}{{{}}}", url, self.escape(label)),
                None => format!("\\url{{{}}}", url),
            },
            Inline::List(item) => format!("\\reviewlistref{{{}}}", item.number),
            Inline::Table(item) => format!(
                "\\reviewtableref{{{}}}{{table:{}:{}}}",
                item.number, item.chapter_id, item.id
            ),
            Inline::Image(item) => format!(
                "\\reviewimageref{{{}}}{{image:{}:{}}}",
                item.number, item.chapter_id, item.id
            ),
            Inline::Equation(item) => format!("\\reviewequationref{{{}}}", item.number),
            Inline::Icon { id, path } => match path {
                Some(path) => format!("\\includegraphics{{{}}}", path.to_string_lossy()),
                None => {
                    return Err(BuildError::Reference(IndexError::NotFound {
                        kind: "image file",
                        id: id.clone(),
                    }))
                }
            },
            Inline::Footnote(note) => {
                if ctx.config().footnotetext {
                    format!("\\footnotemark[{}]", note.number)
                } else {
                    format!("\\footnote{{{}}}", note.content)
                }
            }
            Inline::Endnote(note) => format!("\\endnote{{{}}}", note.content),
            Inline::Headline(r) => {
                let text = match &r.number {
                    Some(n) => ctx.locale.t("hd_quote", &[n, &r.caption]),
                    None => ctx.locale.t("hd_quote_without_number", &[&r.caption]),
                };
                format!("\\reviewsecref{{{}}}{{sec:{}}}", text, r.anchor)
            }
            Inline::SectionNumber(r) => r.number.clone().unwrap_or_default(),
            Inline::SectionTitle(r) => format!("\\reviewsecref{{{}}}{{sec:{}}}", r.caption, r.anchor),
            Inline::Column {
                chapter_id,
                id,
                caption,
            } => format!(
                "\\reviewcolumnref{{{}}}{{column:{}:{}}}",
                ctx.locale.t("column", &[caption]),
                chapter_id,
                id
            ),
            Inline::ChapterNumber(c) => format!(
                "\\reviewchapref{{{}}}{{chap:{}}}",
                c.number.as_deref().unwrap_or(&c.title),
                c.id
            ),
            Inline::ChapterTitle(c) => format!("\\reviewchapref{{{}}}{{chap:{}}}", c.title, c.id),
            Inline::ChapterLink(c) => {
                let text = match &c.number {
                    Some(n) => format!("{}{}", n, ctx.locale.t("chapter_quote", &[&c.title])),
                    None => ctx.locale.t("chapter_quote_without_number", &[&c.title]),
                };
                format!("\\reviewchapref{{{}}}{{chap:{}}}", text, c.id)
            }
            Inline::Bib { id, number } => format!(
                "\\reviewbibref{{{}}}{{bib:{}}}",
                ctx.locale.t("bib_quote", &[&number.to_string()]),
                id
            ),
            Inline::Uchar(c) => format!("\\UTF{{{:04X}}}", *c as u32),
            Inline::Br => "\\\\\n".to_string(),
            Inline::PageRef(id) => format!("\\pageref{{{}}}", id),
            Inline::Dtp(_) => return Err(self.unsupported(node.name())),
        };
        Ok(out)
    }

    fn column_begin(&mut self, column: &ColumnHead, ctx: &Context<'_>) -> BuildResult {
        let id = column
            .label
            .clone()
            .unwrap_or_else(|| format!("column-{}", column.number));
        Ok(format!(
            "\\begin{{reviewcolumn}}[{}\\hypertarget{{column:{}:{}}}{{}}]\n",
            column.caption,
            ctx.chapter.id(),
            id
        ))
    }

    fn column_end(&mut self, _level: usize, _ctx: &Context<'_>) -> BuildResult {
        Ok("\\end{reviewcolumn}\n".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_specials() {
        let b = LatexBuilder::new();
        assert_eq!(b.escape("a_b"), "a\\textunderscore{}b");
        assert_eq!(b.escape("{}"), "\\{\\}");
        assert_eq!(b.escape("50% & #1"), "50\\% \\& \\#1");
        assert_eq!(b.escape("\\"), "\\reviewbackslash{}");
    }

    #[test]
    fn test_unescape_inverts_escape() {
        let b = LatexBuilder::new();
        let raw = r"\{#$%&_~^<>|} text";
        assert_eq!(b.unescape(&b.escape(raw)).as_deref(), Some(raw));
    }

    #[test]
    fn test_latex_metric_filters_other_targets() {
        assert_eq!(latex_metric("scale=0.5,html::width=50%"), "scale=0.5");
        assert_eq!(latex_metric("latex::width=3cm"), "width=3cm");
        assert_eq!(latex_metric("html::width=50%"), "");
    }

    #[test]
    fn test_table_spec_defaults_to_left_columns() {
        let table = Table {
            kind: TableKind::Table,
            id: None,
            number: None,
            caption: None,
            header: vec![vec!["a".into(), "b".into()]],
            body: vec![],
            tsize: None,
        };
        assert_eq!(LatexBuilder::new().table_spec(&table), "|l|l|");
    }
}
