//! TOP: plain text with `◆→...←◆` editor markers and `★...☆` style brackets.

use super::plaintext::PlaintextBuilder;
use super::{note_title, Builder};
use crate::config::Target;
use crate::context::Context;
use crate::error::BuildResult;
use crate::index::HeadlineKind;
use crate::ir::{
    AlignKind, Block, BulletItem, CodeKind, ColumnHead, Headline, Inline, ListBlock, Paragraph,
    Style,
};

pub struct TopBuilder {
    text: PlaintextBuilder,
}

fn begin(name: &str) -> String {
    format!("◆→開始:{}←◆\n", name)
}

fn end(name: &str) -> String {
    format!("◆→終了:{}←◆\n\n", name)
}

fn framed(name: &str, caption: &str, body: &str) -> String {
    let mut out = begin(name);
    if !caption.is_empty() {
        out.push_str(caption);
        out.push_str("\n\n");
    }
    out.push_str(body);
    out.push_str(&end(name));
    out
}

fn dtp(note: &str) -> String {
    format!("◆→DTP連絡:{}←◆", note)
}

impl TopBuilder {
    pub fn new() -> Self {
        TopBuilder {
            text: PlaintextBuilder::new(),
        }
    }

    fn bullets(items: &[BulletItem], depth: usize, out: &mut String) {
        for item in items {
            out.push_str(&format!("{}●\t{}\n", "\t".repeat(depth - 1), item.text));
            Self::bullets(&item.children, depth + 1, out);
        }
    }
}

impl Default for TopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for TopBuilder {
    fn target(&self) -> Target {
        Target::Top
    }

    fn escape(&self, text: &str) -> String {
        text.to_string()
    }

    fn headline(&mut self, h: &Headline, _ctx: &Context<'_>) -> BuildResult {
        if h.kind == HeadlineKind::Nodisp {
            return Ok(String::new());
        }
        Ok(format!(
            "■H{}■{}{}\n",
            h.level,
            h.prefix.as_deref().unwrap_or(""),
            h.caption
        ))
    }

    fn paragraph(&mut self, p: &Paragraph, _ctx: &Context<'_>) -> BuildResult {
        Ok(format!("{}\n", p.text))
    }

    fn list(&mut self, list: &ListBlock, _ctx: &Context<'_>) -> BuildResult {
        let mut out = String::new();
        match list {
            ListBlock::Unordered(items) => Self::bullets(items, 1, &mut out),
            ListBlock::Ordered(items) => {
                for item in items {
                    out.push_str(&format!("{}\t{}\n", item.number, item.text));
                }
            }
            ListBlock::Definition(items) => {
                for item in items {
                    out.push_str(&format!("★{}☆\n", item.term));
                    for line in &item.body {
                        out.push_str(&format!("\t{}\n", line));
                    }
                }
            }
        }
        out.push('\n');
        Ok(out)
    }

    fn block(&mut self, block: &Block, ctx: &Context<'_>) -> BuildResult {
        let out = match block {
            Block::Code(code) => {
                let name = match code.kind {
                    CodeKind::List | CodeKind::ListNum => "リスト",
                    CodeKind::EmList | CodeKind::EmListNum => "インラインリスト",
                    CodeKind::Source => "ソースコードリスト",
                    CodeKind::Cmd => "コマンド",
                };
                let caption = match code.kind {
                    CodeKind::List | CodeKind::ListNum => PlaintextBuilder::caption(
                        ctx,
                        "list",
                        code.number.as_deref(),
                        code.caption.as_deref(),
                    ),
                    _ => code
                        .caption
                        .as_deref()
                        .map(|c| format!("■{}", c))
                        .unwrap_or_default(),
                };
                framed(name, &caption, &PlaintextBuilder::code_lines(code))
            }
            Block::Table(table) => {
                let mut rows = String::new();
                for row in &table.header {
                    let cells: Vec<String> = row.iter().map(|c| format!("★{}☆", c)).collect();
                    rows.push_str(&format!("{}\n", cells.join("\t")));
                }
                for row in &table.body {
                    rows.push_str(&format!("{}\n", row.join("\t")));
                }
                framed("表", &PlaintextBuilder::table_caption(table, ctx), &rows)
            }
            Block::Figure(figure) => {
                let body = match &figure.path {
                    Some(path) => format!("◆→{}←◆\n", path.to_string_lossy()),
                    None => figure.dummy.iter().map(|l| format!("{}\n", l)).collect(),
                };
                framed("図", &PlaintextBuilder::figure_caption(figure, ctx), &body)
            }
            Block::Quote(paragraphs) => {
                framed("引用", "", &format!("{}\n", paragraphs.join("\n")))
            }
            Block::Aligned { kind, paragraphs } => {
                let name = match kind {
                    AlignKind::Lead => "リード",
                    AlignKind::FlushRight => "右寄せ",
                    AlignKind::Centering => "中央揃え",
                };
                framed(name, "", &format!("{}\n", paragraphs.join("\n")))
            }
            Block::Box { caption, lines } => {
                let body: String = lines.iter().map(|l| format!("{}\n", l)).collect();
                let caption = caption.as_deref().map(|c| format!("■{}", c)).unwrap_or_default();
                framed("書式", &caption, &body)
            }
            Block::Note {
                kind,
                caption,
                paragraphs,
            } => {
                let name = note_title(ctx, kind.name(), None);
                let caption = caption.as_deref().map(|c| format!("■{}", c)).unwrap_or_default();
                framed(&name, &caption, &format!("{}\n", paragraphs.join("\n")))
            }
            Block::Footnote(note) => format!(
                "【{}{}】{}\n",
                ctx.locale.t("footnote_mark", &[]),
                note.number,
                note.content
            ),
            Block::Endnotes(notes) => {
                let body: String = notes
                    .iter()
                    .map(|n| format!("({})\t{}\n", n.number, n.content))
                    .collect();
                framed(&ctx.locale.t("endnote_mark", &[]), "", &body)
            }
            Block::Equation {
                number,
                caption,
                lines,
                ..
            } => {
                let body: String = lines.iter().map(|l| format!("{}\n", l)).collect();
                framed(
                    "TeX式",
                    &PlaintextBuilder::caption(ctx, "equation", number.as_deref(), caption.as_deref()),
                    &body,
                )
            }
            Block::Comment(lines) => format!("{}\n", dtp(&lines.join("\n"))),
            Block::Label(id) => format!("◆→{}←◆\n", id),
            Block::PageBreak => "◆→改ページ←◆\n".to_string(),
            Block::Hr => "◆→区切り線←◆\n".to_string(),
            Block::Bibpaper { .. } | Block::BlankLine => return self.text.block(block, ctx),
        };
        Ok(out)
    }

    fn inline(&self, node: &Inline, ctx: &Context<'_>) -> BuildResult {
        let out = match node {
            Inline::Styled(style, body) => match style {
                Style::Bold | Style::Strong => format!("★{}☆", body),
                Style::Italic | Style::Em => format!("▲{}☆", body),
                Style::Tt | Style::Kbd | Style::Samp => format!("△{}☆", body),
                Style::TtItalic => format!("▲△{}☆☆", body),
                Style::TtBold => format!("★△{}☆☆", body),
                Style::Underline => format!("＠{}＠{}", body, dtp("＠〜＠部分に下線")),
                Style::Sup => format!("{}{}", body, dtp(&format!("「{}」は上付き", body))),
                Style::Sub => format!("{}{}", body, dtp(&format!("「{}」は下付き", body))),
                Style::Ami => format!("{}{}", body, dtp(&format!("「{}」に網カケ", body))),
                Style::Bou => format!("{}{}", body, dtp(&format!("「{}」に傍点", body))),
                Style::Tcy => format!("◆→開始:回転←◆{}◆→終了:縦回転←◆", body),
                Style::Balloon => format!("←{}", body),
                _ => return self.text.inline(node, ctx),
            },
            Inline::Code(code) => format!("△{}☆", code),
            Inline::Math(math) => format!("◆→TeX式:{}←◆", math),
            Inline::Index { term, hidden } => {
                let marker = format!("◆→索引項目:{}←◆", term);
                if *hidden {
                    marker
                } else {
                    format!("{}{}", term, marker)
                }
            }
            Inline::Comment(text) => dtp(text),
            Inline::Dtp(text) => dtp(text),
            Inline::Ruby { base, ruby } => {
                format!("{}{}", base, dtp(&format!("「{}」に「{}」とルビ", base, ruby)))
            }
            Inline::Keyword { word, alt } => match alt {
                Some(alt) => format!("★{}☆（{}）", word, alt),
                None => format!("★{}☆", word),
            },
            Inline::Href { url, label } => match label {
                Some(label) => format!("{}（△{}☆）", label, url),
                None => format!("△{}☆", url),
            },
            Inline::Icon { id, path } => format!(
                "◆→画像 {}←◆",
                path.as_ref()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_else(|| id.clone())
            ),
            Inline::PageRef(id) => format!("●●{}", dtp(&format!("{}のページ番号", id))),
            _ => return self.text.inline(node, ctx),
        };
        Ok(out)
    }

    fn column_begin(&mut self, column: &ColumnHead, _ctx: &Context<'_>) -> BuildResult {
        Ok(format!("{}■{}\n", begin("コラム"), column.caption))
    }

    fn column_end(&mut self, _level: usize, _ctx: &Context<'_>) -> BuildResult {
        Ok(end("コラム"))
    }
}
