//! Constructs the block compiler hands to a builder.
//!
//! Text fields documented as "rendered" already went through the inline parser
//! and are in the target's syntax. "Raw" fields are author text that the builder
//! still has to escape.

use crate::index::HeadlineKind;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub level: usize,
    pub kind: HeadlineKind,
    /// Author-supplied `{label}`.
    pub label: Option<String>,
    /// Rendered caption.
    pub caption: String,
    /// Display number with its trailing separator, e.g. `1.2　` or `第1章　`.
    pub prefix: Option<String>,
    /// Stable hyphen-joined position, e.g. `1-2`.
    pub anchor: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHead {
    pub level: usize,
    pub label: Option<String>,
    pub number: usize,
    /// Rendered caption.
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    /// Rendered and joined text.
    pub text: String,
    pub noindent: bool,
    /// Leading tabs on the first source line.
    pub tabs: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulletItem {
    pub text: String,
    pub children: Vec<BulletItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderedItem {
    /// Number as the author wrote it.
    pub number: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionItem {
    pub term: String,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListBlock {
    Unordered(Vec<BulletItem>),
    Ordered(Vec<OrderedItem>),
    Definition(Vec<DefinitionItem>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    List,
    ListNum,
    EmList,
    EmListNum,
    Source,
    Cmd,
}

impl CodeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "list" => Some(CodeKind::List),
            "listnum" => Some(CodeKind::ListNum),
            "emlist" => Some(CodeKind::EmList),
            "emlistnum" => Some(CodeKind::EmListNum),
            "source" => Some(CodeKind::Source),
            "cmd" => Some(CodeKind::Cmd),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CodeKind::List => "list",
            CodeKind::ListNum => "listnum",
            CodeKind::EmList => "emlist",
            CodeKind::EmListNum => "emlistnum",
            CodeKind::Source => "source",
            CodeKind::Cmd => "cmd",
        }
    }

    pub fn numbered_lines(&self) -> bool {
        matches!(self, CodeKind::ListNum | CodeKind::EmListNum)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    pub kind: CodeKind,
    pub id: Option<String>,
    /// Formatted number such as `1.2` for `list`/`listnum`.
    pub number: Option<String>,
    /// Rendered caption.
    pub caption: Option<String>,
    pub lang: Option<String>,
    /// Rendered body lines.
    pub lines: Vec<String>,
    pub first_line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Table,
    EmTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub kind: TableKind,
    pub id: Option<String>,
    pub number: Option<String>,
    pub caption: Option<String>,
    /// Rendered cells.
    pub header: Vec<Vec<String>>,
    pub body: Vec<Vec<String>>,
    /// Column specification from `//tsize`.
    pub tsize: Option<String>,
}

impl Table {
    pub fn columns(&self) -> usize {
        self.header
            .iter()
            .chain(self.body.iter())
            .map(|r| r.len())
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureKind {
    Image,
    Independent,
    Numberless,
    Graph,
    ImageTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub kind: FigureKind,
    pub id: String,
    pub number: Option<String>,
    pub caption: Option<String>,
    pub metric: Option<String>,
    /// Resolved file; `None` means render `dummy` instead.
    pub path: Option<PathBuf>,
    /// Raw body lines shown when the file is missing.
    pub dummy: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Note,
    Memo,
    Tip,
    Info,
    Warning,
    Important,
    Caution,
    Notice,
}

impl NoteKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "note" => Some(NoteKind::Note),
            "memo" => Some(NoteKind::Memo),
            "tip" => Some(NoteKind::Tip),
            "info" => Some(NoteKind::Info),
            "warning" => Some(NoteKind::Warning),
            "important" => Some(NoteKind::Important),
            "caution" => Some(NoteKind::Caution),
            "notice" => Some(NoteKind::Notice),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NoteKind::Note => "note",
            NoteKind::Memo => "memo",
            NoteKind::Tip => "tip",
            NoteKind::Info => "info",
            NoteKind::Warning => "warning",
            NoteKind::Important => "important",
            NoteKind::Caution => "caution",
            NoteKind::Notice => "notice",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignKind {
    Lead,
    FlushRight,
    Centering,
}

impl AlignKind {
    pub fn name(&self) -> &'static str {
        match self {
            AlignKind::Lead => "lead",
            AlignKind::FlushRight => "flushright",
            AlignKind::Centering => "centering",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: String,
    pub number: usize,
    /// Rendered text.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Code(CodeBlock),
    Table(Table),
    Figure(Figure),
    /// Rendered paragraphs.
    Quote(Vec<String>),
    Aligned {
        kind: AlignKind,
        paragraphs: Vec<String>,
    },
    Box {
        caption: Option<String>,
        lines: Vec<String>,
    },
    Note {
        kind: NoteKind,
        caption: Option<String>,
        paragraphs: Vec<String>,
    },
    Footnote(Note),
    Endnotes(Vec<Note>),
    Bibpaper {
        id: String,
        number: usize,
        caption: String,
        paragraphs: Vec<String>,
    },
    Equation {
        id: Option<String>,
        number: Option<String>,
        caption: Option<String>,
        /// Raw TeX.
        lines: Vec<String>,
    },
    /// Raw comment lines; only produced in draft mode.
    Comment(Vec<String>),
    Label(String),
    BlankLine,
    PageBreak,
    Hr,
}

impl Block {
    /// Directive name used in "not implemented" errors.
    pub fn name(&self) -> &'static str {
        match self {
            Block::Code(c) => c.kind.name(),
            Block::Table(t) => match t.kind {
                TableKind::Table => "table",
                TableKind::EmTable => "emtable",
            },
            Block::Figure(f) => match f.kind {
                FigureKind::Image => "image",
                FigureKind::Independent => "indepimage",
                FigureKind::Numberless => "numberlessimage",
                FigureKind::Graph => "graph",
                FigureKind::ImageTable => "imgtable",
            },
            Block::Quote(_) => "quote",
            Block::Aligned { kind, .. } => kind.name(),
            Block::Box { .. } => "box",
            Block::Note { kind, .. } => kind.name(),
            Block::Footnote(_) => "footnote",
            Block::Endnotes(_) => "printendnotes",
            Block::Bibpaper { .. } => "bibpaper",
            Block::Equation { .. } => "texequation",
            Block::Comment(_) => "comment",
            Block::Label(_) => "label",
            Block::BlankLine => "blankline",
            Block::PageBreak => "pagebreak",
            Block::Hr => "hr",
        }
    }
}

/// Text styles whose argument is compiled recursively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Bold,
    Italic,
    Em,
    Strong,
    Tt,
    TtItalic,
    TtBold,
    Underline,
    Ins,
    Del,
    Sup,
    Sub,
    Bou,
    Ami,
    Tcy,
    Balloon,
    Big,
    Small,
    Abbr,
    Acronym,
    Cite,
    Dfn,
    Kbd,
    Q,
    Samp,
    Var,
}

impl Style {
    pub fn from_name(name: &str) -> Option<Self> {
        let style = match name {
            "b" => Style::Bold,
            "i" => Style::Italic,
            "em" => Style::Em,
            "strong" => Style::Strong,
            "tt" => Style::Tt,
            "tti" => Style::TtItalic,
            "ttb" => Style::TtBold,
            "u" | "underline" => Style::Underline,
            "ins" => Style::Ins,
            "del" => Style::Del,
            "sup" => Style::Sup,
            "sub" => Style::Sub,
            "bou" => Style::Bou,
            "ami" => Style::Ami,
            "tcy" => Style::Tcy,
            "balloon" => Style::Balloon,
            "big" => Style::Big,
            "small" => Style::Small,
            "abbr" => Style::Abbr,
            "acronym" => Style::Acronym,
            "cite" => Style::Cite,
            "dfn" => Style::Dfn,
            "kbd" => Style::Kbd,
            "q" => Style::Q,
            "samp" => Style::Samp,
            "var" => Style::Var,
            _ => return None,
        };
        Some(style)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Style::Bold => "b",
            Style::Italic => "i",
            Style::Em => "em",
            Style::Strong => "strong",
            Style::Tt => "tt",
            Style::TtItalic => "tti",
            Style::TtBold => "ttb",
            Style::Underline => "u",
            Style::Ins => "ins",
            Style::Del => "del",
            Style::Sup => "sup",
            Style::Sub => "sub",
            Style::Bou => "bou",
            Style::Ami => "ami",
            Style::Tcy => "tcy",
            Style::Balloon => "balloon",
            Style::Big => "big",
            Style::Small => "small",
            Style::Abbr => "abbr",
            Style::Acronym => "acronym",
            Style::Cite => "cite",
            Style::Dfn => "dfn",
            Style::Kbd => "kbd",
            Style::Q => "q",
            Style::Samp => "samp",
            Style::Var => "var",
        }
    }
}

/// A resolved reference to a numbered list, table, image or equation.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRef {
    pub chapter_id: String,
    pub id: String,
    /// Formatted number, e.g. `1.2`; empty for unnumbered images.
    pub number: String,
    /// Raw caption.
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineRef {
    pub chapter_id: String,
    /// Stable position, e.g. `1-2`.
    pub anchor: String,
    /// Display number such as `1.2`, absent when unnumbered or deeper than `secnolevel`.
    pub number: Option<String>,
    /// Rendered caption.
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRef {
    pub id: String,
    /// `第1章`, or `None` for unnumbered chapters.
    pub number: Option<String>,
    /// Rendered title.
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// Rendered body.
    Styled(Style, String),
    Code(String),
    Math(String),
    Index {
        term: String,
        hidden: bool,
    },
    Comment(String),
    Dtp(String),
    Ruby {
        base: String,
        ruby: String,
    },
    Keyword {
        word: String,
        alt: Option<String>,
    },
    Href {
        url: String,
        label: Option<String>,
    },
    List(ItemRef),
    Table(ItemRef),
    Image(ItemRef),
    Equation(ItemRef),
    Icon {
        id: String,
        path: Option<PathBuf>,
    },
    Footnote(Note),
    Endnote(Note),
    Headline(HeadlineRef),
    SectionNumber(HeadlineRef),
    SectionTitle(HeadlineRef),
    Column {
        chapter_id: String,
        id: String,
        caption: String,
    },
    ChapterNumber(ChapterRef),
    ChapterTitle(ChapterRef),
    ChapterLink(ChapterRef),
    Bib {
        id: String,
        number: usize,
    },
    Uchar(char),
    Br,
    PageRef(String),
}

impl Inline {
    /// Command name used in "not implemented" errors.
    pub fn name(&self) -> &'static str {
        match self {
            Inline::Styled(style, _) => style.name(),
            Inline::Code(_) => "code",
            Inline::Math(_) => "m",
            Inline::Index { hidden: false, .. } => "idx",
            Inline::Index { hidden: true, .. } => "hidx",
            Inline::Comment(_) => "comment",
            Inline::Dtp(_) => "dtp",
            Inline::Ruby { .. } => "ruby",
            Inline::Keyword { .. } => "kw",
            Inline::Href { .. } => "href",
            Inline::List(_) => "list",
            Inline::Table(_) => "table",
            Inline::Image(_) => "img",
            Inline::Equation(_) => "eq",
            Inline::Icon { .. } => "icon",
            Inline::Footnote(_) => "fn",
            Inline::Endnote(_) => "endnote",
            Inline::Headline(_) => "hd",
            Inline::SectionNumber(_) => "sec",
            Inline::SectionTitle(_) => "sectitle",
            Inline::Column { .. } => "column",
            Inline::ChapterNumber(_) => "chap",
            Inline::ChapterTitle(_) => "title",
            Inline::ChapterLink(_) => "chapref",
            Inline::Bib { .. } => "bib",
            Inline::Uchar(_) => "uchar",
            Inline::Br => "br",
            Inline::PageRef(_) => "pageref",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_names_round_trip() {
        for name in ["b", "i", "tt", "tti", "ttb", "u", "kbd", "var"] {
            assert_eq!(Style::from_name(name).unwrap().name(), name);
        }
        assert_eq!(Style::from_name("underline"), Some(Style::Underline));
        assert_eq!(Style::from_name("code"), None);
    }

    #[test]
    fn test_table_columns() {
        let t = Table {
            kind: TableKind::Table,
            id: None,
            number: None,
            caption: None,
            header: vec![vec!["a".into(), "b".into()]],
            body: vec![vec!["1".into(), "2".into(), "3".into()]],
            tsize: None,
        };
        assert_eq!(t.columns(), 3);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(CodeKind::from_name("emlistnum"), Some(CodeKind::EmListNum));
        assert!(CodeKind::EmListNum.numbered_lines());
        assert_eq!(NoteKind::from_name("caution").map(|k| k.name()), Some("caution"));
        assert_eq!(Block::Hr.name(), "hr");
        assert_eq!(Inline::Br.name(), "br");
    }
}
