//! Second pass: walk a chapter's lines and drive a builder construct by construct.

use crate::builder::{join_lines, Builder};
use crate::config::MAX_HEADLINE_LEVEL;
use crate::context::Context;
use crate::error::{BuildResult, CompileError, Location, Result};
use crate::index::{HeadlineKind, ImageKind};
use crate::inline;
use crate::ir::{
    AlignKind, Block, BulletItem, CodeBlock, CodeKind, ColumnHead, DefinitionItem, Figure,
    FigureKind, Headline, ListBlock, Note, NoteKind, OrderedItem, Paragraph, Table, TableKind,
};
use crate::line_reader::LineReader;
use crate::sec_counter::SecCounter;
use crate::syntax::{self, DirectiveLine};
use regex::Regex;
use std::sync::LazyLock;

static RE_CELL_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyPolicy {
    Required,
    Optional,
    Forbidden,
}

struct DirectiveSpec {
    name: &'static str,
    min_args: usize,
    max_args: usize,
    body: BodyPolicy,
}

const fn spec(name: &'static str, min_args: usize, max_args: usize, body: BodyPolicy) -> DirectiveSpec {
    DirectiveSpec {
        name,
        min_args,
        max_args,
        body,
    }
}

use BodyPolicy::{Forbidden, Optional, Required};

const DIRECTIVES: &[DirectiveSpec] = &[
    spec("list", 2, 3, Required),
    spec("listnum", 2, 3, Required),
    spec("emlist", 0, 2, Required),
    spec("emlistnum", 0, 2, Required),
    spec("source", 0, 2, Required),
    spec("cmd", 0, 1, Required),
    spec("table", 0, 2, Required),
    spec("emtable", 0, 1, Required),
    spec("imgtable", 1, 3, Optional),
    spec("image", 2, 3, Optional),
    spec("indepimage", 1, 3, Optional),
    spec("numberlessimage", 1, 3, Optional),
    spec("graph", 2, 3, Required),
    spec("quote", 0, 0, Required),
    spec("lead", 0, 1, Required),
    spec("flushright", 0, 0, Required),
    spec("centering", 0, 0, Required),
    spec("box", 0, 1, Required),
    spec("note", 0, 1, Required),
    spec("memo", 0, 1, Required),
    spec("tip", 0, 1, Required),
    spec("info", 0, 1, Required),
    spec("warning", 0, 1, Required),
    spec("important", 0, 1, Required),
    spec("caution", 0, 1, Required),
    spec("notice", 0, 1, Required),
    spec("footnote", 2, 2, Forbidden),
    spec("endnote", 2, 2, Forbidden),
    spec("printendnotes", 0, 0, Forbidden),
    spec("bibpaper", 2, 2, Optional),
    spec("texequation", 0, 2, Required),
    spec("comment", 0, 1, Optional),
    spec("label", 1, 1, Forbidden),
    spec("noindent", 0, 0, Forbidden),
    spec("blankline", 0, 0, Forbidden),
    spec("pagebreak", 0, 0, Forbidden),
    spec("hr", 0, 0, Forbidden),
    spec("firstlinenum", 1, 1, Forbidden),
    spec("tsize", 1, 1, Forbidden),
    spec("raw", 1, 1, Forbidden),
    spec("embed", 0, 1, Required),
    spec("beginchild", 0, 0, Forbidden),
    spec("endchild", 0, 0, Forbidden),
];

fn directive_spec(name: &str) -> Option<&'static DirectiveSpec> {
    DIRECTIVES.iter().find(|d| d.name == name)
}

/// Running sequence numbers for definition sites, counted the same way the
/// index pass counts them.
#[derive(Default)]
struct Counters {
    list: usize,
    table: usize,
    image: usize,
    equation: usize,
    footnote: usize,
    bibpaper: usize,
    column: usize,
}

pub struct Compiler<'c, 'a> {
    ctx: &'c Context<'a>,
    builder: &'c mut dyn Builder,
    reader: LineReader,
    counter: SecCounter,
    counters: Counters,
    out: String,
    location: Location,
    noindent: bool,
    first_line: Option<usize>,
    tsize: Option<String>,
    columns: Vec<usize>,
    /// Headlines seen inside the innermost open column.
    column_headlines: usize,
    children: usize,
}

fn non_empty(arg: Option<&String>) -> Option<&str> {
    arg.map(|s| s.as_str()).filter(|s| !s.is_empty())
}

fn ends_paragraph(line: &str) -> bool {
    line.trim().is_empty()
        || syntax::is_headline(line)
        || syntax::RE_DIRECTIVE.is_match(line)
        || syntax::RE_BLOCK_END.is_match(line)
}

fn is_list_marker(line: &str) -> bool {
    syntax::RE_ULIST.is_match(line)
        || syntax::RE_OLIST.is_match(line)
        || syntax::RE_DLIST.is_match(line)
}

/// Build a bullet tree from `(depth, text)` pairs whose depths never jump by
/// more than one level.
fn nest(items: &[(usize, String)], depth: usize) -> Vec<BulletItem> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < items.len() {
        let end = items[i + 1..]
            .iter()
            .position(|(d, _)| *d <= depth)
            .map_or(items.len(), |p| i + 1 + p);
        out.push(BulletItem {
            text: items[i].1.clone(),
            children: nest(&items[i + 1..end], depth + 1),
        });
        i = end;
    }
    out
}

/// Group lines into blank-line separated runs.
fn split_paragraphs(lines: &[String]) -> Vec<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim().to_string());
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

impl<'c, 'a> Compiler<'c, 'a> {
    pub fn new(ctx: &'c Context<'a>, builder: &'c mut dyn Builder) -> Self {
        let chapter = ctx.chapter;
        let mut counter = SecCounter::new(ctx.config().max_depth, chapter.number())
            .with_postfix(ctx.locale.t("chapter_postfix", &[]));
        if let Some(label) = chapter.label() {
            counter = counter.with_label(label);
        }
        Compiler {
            ctx,
            builder,
            reader: LineReader::from_source(chapter.source().clone()),
            counter,
            counters: Counters::default(),
            out: String::new(),
            location: Location::new(chapter.source().file.clone(), 0),
            noindent: false,
            first_line: None,
            tsize: None,
            columns: Vec::new(),
            column_headlines: 0,
            children: 0,
        }
    }

    pub fn run(mut self) -> Result<String> {
        tracing::debug!(
            chapter = self.ctx.chapter.id(),
            target = self.ctx.target.name(),
            "compiling chapter"
        );
        while let Some(line) = self.reader.gets() {
            self.mark();
            if syntax::is_headline(&line) {
                self.headline(&line)?;
            } else if syntax::RE_BLOCK_END.is_match(&line) {
                return Err(self.syntax("'//}' without an open block"));
            } else if let Some(parsed) = syntax::parse_directive(&line) {
                let directive = parsed.map_err(|e| self.syntax(e.0))?;
                self.directive(directive)?;
            } else if syntax::RE_ULIST.is_match(&line) {
                self.reader.ungets(line);
                self.ulist()?;
            } else if syntax::RE_OLIST.is_match(&line) {
                self.reader.ungets(line);
                self.olist()?;
            } else if syntax::RE_DLIST.is_match(&line) || syntax::RE_DLIST_DEPRECATED.is_match(&line) {
                self.reader.ungets(line);
                self.dlist()?;
            } else if !line.trim().is_empty() {
                self.reader.ungets(line);
                self.paragraph()?;
            }
        }
        self.close_columns(0, false)?;
        if self.children > 0 {
            return Err(self.syntax("//beginchild is not closed by //endchild"));
        }
        let body = std::mem::take(&mut self.out);
        Ok(self.builder.finish(body, self.ctx))
    }

    fn mark(&mut self) {
        self.location.line = self.reader.source_line();
    }

    fn syntax(&self, message: impl Into<String>) -> CompileError {
        CompileError::syntax(&self.location, message)
    }

    fn located(&self, result: BuildResult) -> Result<String> {
        result.map_err(|e| e.at(&self.location))
    }

    fn render(&self, text: &str) -> Result<String> {
        self.located(inline::render(text, &*self.builder, self.ctx))
    }

    fn render_opt(&self, text: Option<&str>) -> Result<Option<String>> {
        text.map(|t| self.render(t)).transpose()
    }

    fn render_paragraphs(&self, lines: &[String]) -> Result<Vec<String>> {
        let by_lang = self.ctx.config().join_lines_by_lang;
        split_paragraphs(lines)
            .iter()
            .map(|group| self.render(&join_lines(group, by_lang)))
            .collect()
    }

    fn emit_block(&mut self, block: Block) -> Result<()> {
        let out = self.builder.block(&block, self.ctx);
        let out = self.located(out)?;
        self.out.push_str(&out);
        Ok(())
    }

    fn number(&self, n: usize) -> String {
        self.ctx.format_number(self.ctx.chapter, n)
    }

    fn close_columns(&mut self, level: usize, warn: bool) -> Result<()> {
        while let Some(&open) = self.columns.last() {
            if open < level {
                break;
            }
            if warn {
                tracing::warn!(
                    file = self.location.file.as_str(),
                    line = self.location.line,
                    "column closed implicitly by a level {} headline",
                    level
                );
            }
            self.columns.pop();
            let out = self.builder.column_end(open, self.ctx);
            let out = self.located(out)?;
            self.out.push_str(&out);
        }
        Ok(())
    }

    fn headline(&mut self, line: &str) -> Result<()> {
        let h = syntax::parse_headline(line)
            .ok_or_else(|| self.syntax(format!("malformed headline: {}", line)))?;
        if h.level > MAX_HEADLINE_LEVEL {
            tracing::warn!(
                file = self.location.file.as_str(),
                line = self.location.line,
                "headline level {} is deeper than {}; clamped",
                h.level,
                MAX_HEADLINE_LEVEL
            );
        }
        let level = h.level.min(MAX_HEADLINE_LEVEL);

        match h.tag.as_deref() {
            Some("column") => {
                self.close_columns(level, true)?;
                self.counters.column += 1;
                let head = ColumnHead {
                    level,
                    label: h.label.clone(),
                    number: self.counters.column,
                    caption: self.render(&h.caption)?,
                };
                let out = self.builder.column_begin(&head, self.ctx);
                let out = self.located(out)?;
                self.out.push_str(&out);
                self.columns.push(level);
                self.column_headlines = 0;
                return Ok(());
            }
            Some(tag) if tag.starts_with('/') => {
                if tag != "/column" || self.columns.is_empty() {
                    return Err(self.syntax(format!("[{}] has no matching opening tag", tag)));
                }
                let open = self.columns.pop().unwrap_or(level);
                let out = self.builder.column_end(open, self.ctx);
                let out = self.located(out)?;
                self.out.push_str(&out);
                return Ok(());
            }
            _ => {}
        }

        let kind = HeadlineKind::from_tag(h.tag.as_deref()).ok_or_else(|| CompileError::UnknownTag {
            location: self.location.clone(),
            name: h.tag.clone().unwrap_or_default(),
        })?;
        if h.caption.is_empty() {
            tracing::warn!(
                file = self.location.file.as_str(),
                line = self.location.line,
                "headline is empty"
            );
        }
        self.close_columns(level, true)?;

        // Column sub-headlines and empty section headlines are not numbered;
        // the index pass skips the same ones.
        let in_column = self.columns.last().is_some_and(|&open| level > open);
        let counted =
            kind.is_counted() && !in_column && (level == 1 || !h.caption.is_empty());
        if counted {
            self.counter.inc(level);
        }
        let anchor = if in_column {
            self.column_headlines += 1;
            format!("column-{}-{}", self.counters.column, self.column_headlines)
        } else {
            self.counter.anchor(level)
        };
        let secnolevel = self.ctx.config().secnolevel;
        let prefix = if !counted {
            None
        } else if level == 1 {
            match self.ctx.chapter.format_number(&self.ctx.locale) {
                Some(n) if secnolevel >= 1 => {
                    Some(format!("{}{}", n, self.ctx.locale.t("chapter_postfix", &[])))
                }
                _ => None,
            }
        } else {
            self.counter.prefix(level, secnolevel)
        };

        let headline = Headline {
            level,
            kind,
            label: h.label.clone(),
            caption: self.render(&h.caption)?,
            prefix,
            anchor,
        };
        let out = self.builder.headline(&headline, self.ctx);
        let out = self.located(out)?;
        self.out.push_str(&out);
        Ok(())
    }

    fn paragraph(&mut self) -> Result<()> {
        let lines = self.reader.take_until(ends_paragraph);
        let Some(first) = lines.first() else {
            return Ok(());
        };
        let (tabs, _) = syntax::split_leading_tabs(first);
        let lines: Vec<String> = lines.iter().map(|l| l.trim().to_string()).collect();
        let text = self.render(&join_lines(&lines, self.ctx.config().join_lines_by_lang))?;
        let paragraph = Paragraph {
            text,
            noindent: std::mem::take(&mut self.noindent),
            tabs,
        };
        let out = self.builder.paragraph(&paragraph, self.ctx);
        let out = self.located(out)?;
        self.out.push_str(&out);
        Ok(())
    }

    fn emit_list(&mut self, list: ListBlock) -> Result<()> {
        let out = self.builder.list(&list, self.ctx);
        let out = self.located(out)?;
        self.out.push_str(&out);
        Ok(())
    }

    /// Continuation lines: indented, non-blank and not a new list marker.
    fn continuation(&mut self) -> Vec<String> {
        self.reader
            .take_while(|l| {
                l.starts_with(char::is_whitespace) && !l.trim().is_empty() && !is_list_marker(l)
            })
            .iter()
            .map(|l| l.trim().to_string())
            .collect()
    }

    fn ulist(&mut self) -> Result<()> {
        let by_lang = self.ctx.config().join_lines_by_lang;
        let mut flat: Vec<(usize, String)> = Vec::new();
        while let Some(line) = self.reader.gets() {
            let Some(caps) = syntax::RE_ULIST.captures(&line) else {
                self.reader.ungets(line);
                break;
            };
            self.mark();
            let depth = caps[1].len();
            let prev = flat.last().map_or(0, |(d, _)| *d);
            if depth > prev + 1 {
                return Err(self.syntax("too many '*' for the enclosing list level"));
            }
            let mut lines = vec![line[caps.get(0).map_or(0, |m| m.end())..].trim().to_string()];
            lines.extend(self.continuation());
            flat.push((depth, self.render(&join_lines(&lines, by_lang))?));
        }
        self.emit_list(ListBlock::Unordered(nest(&flat, 1)))
    }

    fn olist(&mut self) -> Result<()> {
        let by_lang = self.ctx.config().join_lines_by_lang;
        let mut items = Vec::new();
        while let Some(line) = self.reader.gets() {
            let Some(caps) = syntax::RE_OLIST.captures(&line) else {
                self.reader.ungets(line);
                break;
            };
            self.mark();
            let number = caps[1].to_string();
            let mut lines = vec![line[caps.get(0).map_or(0, |m| m.end())..].trim().to_string()];
            lines.extend(self.continuation());
            items.push(OrderedItem {
                number,
                text: self.render(&join_lines(&lines, by_lang))?,
            });
        }
        self.emit_list(ListBlock::Ordered(items))
    }

    fn dlist(&mut self) -> Result<()> {
        let mut items = Vec::new();
        while let Some(line) = self.reader.gets() {
            let deprecated = syntax::RE_DLIST_DEPRECATED.is_match(&line);
            if !deprecated && !syntax::RE_DLIST.is_match(&line) {
                self.reader.ungets(line);
                break;
            }
            self.mark();
            if deprecated {
                tracing::warn!(
                    file = self.location.file.as_str(),
                    line = self.location.line,
                    "definition list item without leading space is deprecated"
                );
            }
            let term = line.trim_start()[1..].trim().to_string();
            let term = self.render(&term)?;
            let body = self
                .continuation()
                .iter()
                .map(|l| self.render(l))
                .collect::<Result<Vec<_>>>()?;
            items.push(DefinitionItem { term, body });
        }
        self.emit_list(ListBlock::Definition(items))
    }

    fn directive(&mut self, d: DirectiveLine) -> Result<()> {
        let spec = directive_spec(&d.name).ok_or_else(|| CompileError::UnknownDirective {
            location: self.location.clone(),
            name: d.name.clone(),
        })?;
        if d.args.len() < spec.min_args || d.args.len() > spec.max_args {
            let expected = if spec.min_args == spec.max_args {
                spec.min_args.to_string()
            } else {
                format!("{} to {}", spec.min_args, spec.max_args)
            };
            return Err(self.syntax(format!(
                "//{} takes {} argument(s), got {}",
                d.name,
                expected,
                d.args.len()
            )));
        }
        match (spec.body, d.opens_block) {
            (Required, false) => {
                return Err(self.syntax(format!("//{} needs a block", d.name)));
            }
            (Forbidden, true) => {
                return Err(self.syntax(format!("//{} does not take a block", d.name)));
            }
            _ => {}
        }

        let lines = if d.opens_block {
            self.reader
                .until_terminator(&syntax::RE_BLOCK_END)
                .ok_or_else(|| {
                    self.syntax(format!(
                        "unexpected end of input (block //{} begins at line {})",
                        d.name, self.location.line
                    ))
                })?
        } else {
            Vec::new()
        };

        self.dispatch(&d.name, &d.args, lines)
    }

    fn dispatch(&mut self, name: &str, args: &[String], lines: Vec<String>) -> Result<()> {
        if let Some(kind) = CodeKind::from_name(name) {
            return self.code(kind, args, lines);
        }
        if let Some(kind) = NoteKind::from_name(name) {
            let block = Block::Note {
                kind,
                caption: self.render_opt(non_empty(args.first()))?,
                paragraphs: self.render_paragraphs(&lines)?,
            };
            return self.emit_block(block);
        }

        let block = match name {
            "table" => return self.table(TableKind::Table, args, lines),
            "emtable" => return self.table(TableKind::EmTable, args, lines),
            "image" => return self.figure(FigureKind::Image, args, lines),
            "indepimage" => return self.figure(FigureKind::Independent, args, lines),
            "numberlessimage" => return self.figure(FigureKind::Numberless, args, lines),
            "graph" => return self.figure(FigureKind::Graph, args, lines),
            "imgtable" => return self.figure(FigureKind::ImageTable, args, lines),
            "quote" => Block::Quote(self.render_paragraphs(&lines)?),
            "lead" | "flushright" | "centering" => Block::Aligned {
                kind: match name {
                    "lead" => AlignKind::Lead,
                    "flushright" => AlignKind::FlushRight,
                    _ => AlignKind::Centering,
                },
                paragraphs: self.render_paragraphs(&lines)?,
            },
            "box" => Block::Box {
                caption: self.render_opt(non_empty(args.first()))?,
                lines: lines
                    .iter()
                    .map(|l| self.render(l))
                    .collect::<Result<Vec<_>>>()?,
            },
            "footnote" => {
                self.counters.footnote += 1;
                Block::Footnote(Note {
                    id: args[0].clone(),
                    number: self.counters.footnote,
                    content: self.render(&args[1])?,
                })
            }
            // Endnote text is printed by //printendnotes.
            "endnote" => return Ok(()),
            "printendnotes" => {
                let notes = self
                    .ctx
                    .indexes()
                    .endnote
                    .items()
                    .iter()
                    .map(|item| {
                        Ok(Note {
                            id: item.id.clone(),
                            number: item.number,
                            content: self.render(item.content.as_deref().unwrap_or(""))?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Block::Endnotes(notes)
            }
            "bibpaper" => {
                self.counters.bibpaper += 1;
                Block::Bibpaper {
                    id: args[0].clone(),
                    number: self.counters.bibpaper,
                    caption: self.render(&args[1])?,
                    paragraphs: self.render_paragraphs(&lines)?,
                }
            }
            "texequation" => {
                let number = if args.is_empty() {
                    None
                } else {
                    self.counters.equation += 1;
                    Some(self.number(self.counters.equation))
                };
                Block::Equation {
                    id: non_empty(args.first()).map(str::to_string),
                    number,
                    caption: self.render_opt(non_empty(args.get(1)))?,
                    lines,
                }
            }
            "comment" => {
                if !self.ctx.draft() {
                    return Ok(());
                }
                let mut text: Vec<String> = args.iter().filter(|a| !a.is_empty()).cloned().collect();
                text.extend(lines);
                Block::Comment(text)
            }
            "label" => Block::Label(args[0].clone()),
            "noindent" => {
                self.noindent = true;
                return Ok(());
            }
            "blankline" => Block::BlankLine,
            "pagebreak" => Block::PageBreak,
            "hr" => Block::Hr,
            "firstlinenum" => {
                let n = args[0].trim().parse::<usize>().map_err(|_| {
                    self.syntax(format!("//firstlinenum needs a number, got {:?}", args[0]))
                })?;
                self.first_line = Some(n);
                return Ok(());
            }
            "tsize" => {
                self.tsize = self.for_target(&args[0]).map(str::to_string);
                return Ok(());
            }
            "raw" => {
                if let Some(body) = self.for_target(&args[0]) {
                    self.out.push_str(&body.replace("\\n", "\n"));
                    self.out.push('\n');
                }
                return Ok(());
            }
            "embed" => {
                let wanted = match args.first() {
                    None => true,
                    Some(targets) => {
                        let names = self.ctx.target.raw_names();
                        targets
                            .split(|c| c == ',' || c == '|')
                            .map(str::trim)
                            .filter(|t| !t.is_empty())
                            .any(|t| names.contains(&t))
                    }
                };
                if wanted {
                    for line in lines {
                        self.out.push_str(&line);
                        self.out.push('\n');
                    }
                }
                return Ok(());
            }
            "beginchild" => {
                self.children += 1;
                return Ok(());
            }
            "endchild" => {
                if self.children == 0 {
                    return Err(self.syntax("//endchild without //beginchild"));
                }
                self.children -= 1;
                return Ok(());
            }
            _ => {
                return Err(CompileError::UnknownDirective {
                    location: self.location.clone(),
                    name: name.to_string(),
                })
            }
        };
        self.emit_block(block)
    }

    /// Body of a `|target,...|body` argument when it applies to this target;
    /// an argument without the target list applies everywhere.
    fn for_target<'s>(&self, arg: &'s str) -> Option<&'s str> {
        match inline::parse_pilot(arg) {
            Some((targets, body)) => {
                let names = self.ctx.target.raw_names();
                targets
                    .iter()
                    .any(|t| names.contains(&t.as_str()))
                    .then_some(body)
            }
            None => Some(arg),
        }
    }

    fn code(&mut self, kind: CodeKind, args: &[String], lines: Vec<String>) -> Result<()> {
        let (id, caption, lang) = match kind {
            CodeKind::List | CodeKind::ListNum => {
                (non_empty(args.first()), non_empty(args.get(1)), non_empty(args.get(2)))
            }
            CodeKind::Cmd => (None, non_empty(args.first()), None),
            _ => (None, non_empty(args.first()), non_empty(args.get(1))),
        };
        let number = match kind {
            CodeKind::List | CodeKind::ListNum => {
                self.counters.list += 1;
                Some(self.number(self.counters.list))
            }
            _ => None,
        };
        let first_line = if kind.numbered_lines() {
            self.first_line.take().unwrap_or(1)
        } else {
            1
        };
        let block = CodeBlock {
            kind,
            id: id.map(str::to_string),
            number,
            caption: self.render_opt(caption)?,
            lang: lang.map(str::to_string),
            lines: lines
                .iter()
                .map(|l| self.render(l))
                .collect::<Result<Vec<_>>>()?,
            first_line,
        };
        self.emit_block(Block::Code(block))
    }

    fn table_row(&self, line: &str) -> Result<Vec<String>> {
        RE_CELL_SEPARATOR
            .split(line)
            .map(|cell| {
                let cell = if cell == "." {
                    ""
                } else {
                    cell.strip_prefix('.').unwrap_or(cell)
                };
                self.render(cell)
            })
            .collect()
    }

    fn table(&mut self, kind: TableKind, args: &[String], lines: Vec<String>) -> Result<()> {
        let (id, number, caption) = match kind {
            TableKind::Table if !args.is_empty() => {
                self.counters.table += 1;
                (
                    non_empty(args.first()),
                    Some(self.number(self.counters.table)),
                    non_empty(args.get(1)),
                )
            }
            TableKind::Table => (None, None, None),
            TableKind::EmTable => (None, None, non_empty(args.first())),
        };

        let rows: Vec<&String> = lines.iter().filter(|l| !l.trim().is_empty()).collect();
        if rows.is_empty() {
            return Err(self.syntax("no rows in the table"));
        }
        let (head, body) = match rows.iter().position(|l| syntax::RE_TABLE_SEPARATOR.is_match(l)) {
            Some(sep) => (&rows[..sep], &rows[sep + 1..]),
            None => (&rows[..0], &rows[..]),
        };
        let header = head
            .iter()
            .map(|l| self.table_row(l))
            .collect::<Result<Vec<_>>>()?;
        let body = body
            .iter()
            .map(|l| self.table_row(l))
            .collect::<Result<Vec<_>>>()?;

        let table = Table {
            kind,
            id: id.map(str::to_string),
            number,
            caption: self.render_opt(caption)?,
            header,
            body,
            tsize: self.tsize.take(),
        };
        self.emit_block(Block::Table(table))
    }

    fn figure(&mut self, kind: FigureKind, args: &[String], lines: Vec<String>) -> Result<()> {
        let id = args[0].clone();
        let caption_arg = match kind {
            FigureKind::Graph => non_empty(args.get(2)),
            _ => non_empty(args.get(1)),
        };
        let metric = match kind {
            FigureKind::Graph => None,
            _ => non_empty(args.get(2)).map(str::to_string),
        };
        let number = match kind {
            FigureKind::Image | FigureKind::Graph => {
                self.counters.image += 1;
                Some(self.number(self.counters.image))
            }
            FigureKind::ImageTable => {
                self.counters.table += 1;
                Some(self.number(self.counters.table))
            }
            FigureKind::Independent | FigureKind::Numberless => None,
        };

        let path = if id.is_empty() {
            None
        } else {
            let image_kind = match kind {
                FigureKind::Image | FigureKind::Graph => Some(ImageKind::Numbered),
                FigureKind::Independent => Some(ImageKind::Independent),
                FigureKind::Numberless => Some(ImageKind::Numberless),
                FigureKind::ImageTable => None,
            };
            match image_kind {
                Some(k) => {
                    let item = self.ctx.image(k, &id).map_err(|e| e.at(&self.location))?;
                    self.ctx.image_path(item)
                }
                None => self.ctx.finder(self.ctx.chapter).find(&id),
            }
        };

        let dummy = if path.is_none() {
            if lines.is_empty() {
                return Err(CompileError::NotFound {
                    location: self.location.clone(),
                    kind: "image file",
                    id,
                });
            }
            tracing::warn!(
                file = self.location.file.as_str(),
                line = self.location.line,
                "image not found: {}; rendering its body instead",
                id
            );
            lines
        } else {
            Vec::new()
        };

        let figure = Figure {
            kind,
            id,
            number,
            caption: self.render_opt(caption_arg)?,
            metric,
            path,
            dummy,
        };
        self.emit_block(Block::Figure(figure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_nest_bullets() {
        let flat = vec![
            (1, "a".to_string()),
            (2, "a1".to_string()),
            (3, "a1x".to_string()),
            (2, "a2".to_string()),
            (1, "b".to_string()),
        ];
        let tree = nest(&flat, 1);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[0].children[0].text, "a1x");
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn test_split_paragraphs() {
        assert_eq!(
            split_paragraphs(&s(&["a", "b", "", "  ", "c"])),
            vec![s(&["a", "b"]), s(&["c"])]
        );
        assert!(split_paragraphs(&s(&["", ""])).is_empty());
    }

    #[test]
    fn test_directive_table_is_complete() {
        for name in ["list", "emtable", "graph", "printendnotes", "beginchild", "embed"] {
            assert!(directive_spec(name).is_some(), "{}", name);
        }
        assert!(directive_spec("bogus").is_none());
    }

    #[test]
    fn test_ends_paragraph() {
        assert!(ends_paragraph(""));
        assert!(ends_paragraph("== head"));
        assert!(ends_paragraph("//list[a][b]{"));
        assert!(!ends_paragraph("plain text"));
        assert!(!ends_paragraph("// not a directive"));
    }
}
