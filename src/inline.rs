//! `@<name>{...}` inline markup.
//!
//! [`tokenize`] splits a line into literal runs and commands using an explicit
//! brace-depth cursor; [`render`] turns the tokens into target text through a
//! builder, recursing into the arguments of text-style commands.

use crate::builder::Builder;
use crate::context::Context;
use crate::error::{BuildError, BuildResult};
use crate::ir::{HeadlineRef, Inline, Note, Style};
use regex::Regex;
use std::sync::LazyLock;

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

const MAX_NESTING: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    Command {
        name: String,
        /// Argument exactly as written, escapes included.
        arg: String,
        /// Written as `@<name>$...$` or `@<name>|...|`.
        fenced: bool,
    },
}

fn command_name(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut j = start;
    while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
        j += 1;
    }
    if j == start || chars.get(j) != Some(&'>') {
        return None;
    }
    Some((chars[start..j].iter().collect(), j + 1))
}

/// Read a `{...}` argument starting just after the opening brace. Returns the
/// argument and the position after the closing brace.
fn braced(chars: &[char], start: usize, name: &str) -> Result<(String, usize), BuildError> {
    let mut depth = 1;
    let mut arg = String::new();
    let mut j = start;
    while j < chars.len() {
        let c = chars[j];
        match c {
            '\\' => {
                if let Some(&next) = chars.get(j + 1) {
                    arg.push(c);
                    arg.push(next);
                    j += 2;
                    continue;
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((arg, j + 1));
                }
            }
            _ => {}
        }
        arg.push(c);
        j += 1;
    }
    Err(BuildError::Syntax(format!(
        "unterminated inline command @<{}>",
        name
    )))
}

fn fenced(chars: &[char], start: usize, fence: char, name: &str) -> Result<(String, usize), BuildError> {
    match chars[start..].iter().position(|&c| c == fence) {
        Some(len) => Ok((chars[start..start + len].iter().collect(), start + len + 1)),
        None => Err(BuildError::Syntax(format!(
            "unterminated inline command @<{}>",
            name
        ))),
    }
}

pub fn tokenize(text: &str) -> Result<Vec<Token>, BuildError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            buf.push(c);
            buf.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if c == '@' && chars.get(i + 1) == Some(&'<') {
            if let Some((name, open)) = command_name(&chars, i + 2) {
                let parsed = match chars.get(open) {
                    Some('{') => Some((braced(&chars, open + 1, &name)?, false)),
                    Some(&f @ ('$' | '|')) => Some((fenced(&chars, open + 1, f, &name)?, true)),
                    _ => None,
                };
                if let Some(((arg, end), is_fenced)) = parsed {
                    if !buf.is_empty() {
                        tokens.push(Token::Text(std::mem::take(&mut buf)));
                    }
                    tokens.push(Token::Command {
                        name,
                        arg,
                        fenced: is_fenced,
                    });
                    i = end;
                    continue;
                }
            }
        }
        buf.push(c);
        i += 1;
    }
    if !buf.is_empty() {
        tokens.push(Token::Text(buf));
    }
    Ok(tokens)
}

/// Resolve `\{`, `\}`, `\\` and `\,`; any other backslash is kept as written.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if matches!(next, '{' | '}' | '\\' | ',') {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Split on the first unescaped comma outside nested braces. Both halves are
/// unescaped; the second loses its leading whitespace.
pub fn split_pair(arg: &str) -> (String, Option<String>) {
    let mut depth = 0usize;
    let mut escaped = false;
    for (pos, c) in arg.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                let rest = unescape(&arg[pos + 1..]);
                return (unescape(&arg[..pos]), Some(rest.trim_start().to_string()));
            }
            _ => {}
        }
    }
    (unescape(arg), None)
}

/// `|html,latex|body` → (`["html", "latex"]`, `body`).
pub fn parse_pilot(arg: &str) -> Option<(Vec<String>, &str)> {
    let (targets, body) = arg.strip_prefix('|')?.split_once('|')?;
    Some((
        targets.split(',').map(|t| t.trim().to_string()).collect(),
        body,
    ))
}

/// Drop anything that looks like a tag, for plain-text captions.
pub fn strip_tags(text: &str) -> String {
    RE_TAG.replace_all(text, "").to_string()
}

pub fn render(text: &str, builder: &dyn Builder, ctx: &Context<'_>) -> BuildResult {
    InlineRenderer {
        builder,
        ctx,
        depth: 0,
    }
    .render(text, false)
}

struct InlineRenderer<'r, 'a> {
    builder: &'r dyn Builder,
    ctx: &'r Context<'a>,
    depth: usize,
}

impl InlineRenderer<'_, '_> {
    fn nested(&self) -> Self {
        InlineRenderer {
            builder: self.builder,
            ctx: self.ctx,
            depth: self.depth + 1,
        }
    }

    fn render(&self, text: &str, in_arg: bool) -> BuildResult {
        if self.depth > MAX_NESTING {
            return Err(BuildError::Syntax(
                "inline commands are nested too deeply".to_string(),
            ));
        }
        let mut out = String::new();
        for token in tokenize(text)? {
            match token {
                Token::Text(t) if in_arg => out.push_str(&self.builder.escape(&unescape(&t))),
                Token::Text(t) => out.push_str(&self.builder.escape(&t)),
                Token::Command { name, arg, fenced } => {
                    out.push_str(&self.command(&name, &arg, fenced)?)
                }
            }
        }
        Ok(out)
    }

    fn text_arg(&self, arg: &str, fenced: bool) -> BuildResult {
        if fenced {
            Ok(self.builder.escape(arg))
        } else {
            self.nested().render(arg, true)
        }
    }

    fn raw(&self, arg: &str) -> String {
        match parse_pilot(arg) {
            Some((targets, body)) => {
                let names = self.ctx.target.raw_names();
                if targets.iter().any(|t| names.contains(&t.as_str())) {
                    body.replace("\\n", "\n")
                } else {
                    String::new()
                }
            }
            None => arg.replace("\\n", "\n"),
        }
    }

    fn pair(&self, arg: &str, fenced: bool) -> (String, Option<String>) {
        if fenced {
            return (arg.to_string(), None);
        }
        split_pair(arg)
    }

    fn headline_ref(&self, id: &str) -> Result<HeadlineRef, BuildError> {
        let (chapter, item) = self.ctx.headline(id)?;
        Ok(HeadlineRef {
            chapter_id: chapter.id().to_string(),
            anchor: self.ctx.headline_anchor(chapter, item),
            number: self.ctx.headline_number(chapter, item),
            caption: self.nested().render(&item.caption, false)?,
        })
    }

    fn note(&self, item: &crate::index::Item) -> Result<Note, BuildError> {
        Ok(Note {
            id: item.id.clone(),
            number: item.number,
            content: self
                .nested()
                .render(item.content.as_deref().unwrap_or(""), false)?,
        })
    }

    fn command(&self, name: &str, arg: &str, fenced: bool) -> BuildResult {
        let ctx = self.ctx;
        let raw = if fenced { arg.to_string() } else { unescape(arg) };

        if let Some(style) = Style::from_name(name) {
            let body = self.text_arg(arg, fenced)?;
            return self.builder.inline(&Inline::Styled(style, body), ctx);
        }

        let node = match name {
            "code" => Inline::Code(raw),
            "m" => Inline::Math(raw),
            "idx" => Inline::Index {
                term: raw,
                hidden: false,
            },
            "hidx" => Inline::Index {
                term: raw,
                hidden: true,
            },
            "comment" => {
                if !ctx.draft() {
                    return Ok(String::new());
                }
                Inline::Comment(raw)
            }
            "dtp" => Inline::Dtp(raw),
            "raw" | "embed" => return Ok(self.raw(&raw)),
            "ruby" => match self.pair(arg, fenced) {
                (base, Some(ruby)) => Inline::Ruby { base, ruby },
                _ => {
                    return Err(BuildError::Syntax(
                        "@<ruby> needs a base text and a ruby separated by a comma".to_string(),
                    ))
                }
            },
            "kw" => {
                let (word, alt) = self.pair(arg, fenced);
                Inline::Keyword { word, alt }
            }
            "href" => {
                let (url, label) = self.pair(arg, fenced);
                Inline::Href { url, label }
            }
            "list" => Inline::List(ctx.list_ref(&raw)?),
            "table" => Inline::Table(ctx.table_ref(&raw)?),
            "img" => Inline::Image(ctx.image_ref(&raw)?),
            "eq" => Inline::Equation(ctx.equation_ref(&raw)?),
            "icon" => {
                let item = ctx.image(crate::index::ImageKind::Icon, &raw)?;
                Inline::Icon {
                    id: raw.clone(),
                    path: ctx.image_path(item),
                }
            }
            "fn" => Inline::Footnote(self.note(ctx.footnote(&raw)?)?),
            "endnote" => Inline::Endnote(self.note(ctx.endnote(&raw)?)?),
            "hd" | "secref" => Inline::Headline(self.headline_ref(&raw)?),
            "sec" => Inline::SectionNumber(self.headline_ref(&raw)?),
            "sectitle" => Inline::SectionTitle(self.headline_ref(&raw)?),
            "column" => {
                let (chapter, item) = ctx.column(&raw)?;
                Inline::Column {
                    chapter_id: chapter.id().to_string(),
                    id: item.id.clone(),
                    caption: self
                        .nested()
                        .render(item.caption.as_deref().unwrap_or(""), false)?,
                }
            }
            "chap" | "title" | "chapref" => {
                let mut chapter = ctx.chapter_ref(&raw)?;
                chapter.title = self.nested().render(&chapter.title, false)?;
                match name {
                    "chap" => Inline::ChapterNumber(chapter),
                    "title" => Inline::ChapterTitle(chapter),
                    _ => Inline::ChapterLink(chapter),
                }
            }
            "bib" => {
                let item = ctx.bibpaper(&raw)?;
                Inline::Bib {
                    id: item.id.clone(),
                    number: item.number,
                }
            }
            "uchar" => {
                let c = u32::from_str_radix(raw.trim(), 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        BuildError::Syntax(format!("@<uchar> needs a hex code point, got {:?}", raw))
                    })?;
                Inline::Uchar(c)
            }
            "br" => Inline::Br,
            "pageref" => Inline::PageRef(raw),
            _ => return Err(BuildError::UnknownInline(name.to_string())),
        };
        self.builder.inline(&node, ctx)
    }
}
