//! First pass over a chapter: discover every referenceable entity and number it.
//!
//! Counters are independent per entity type. An introducer with an empty id
//! still consumes its slot so later numbers do not shift.

use crate::config::MAX_HEADLINE_LEVEL;
use crate::index::{
    BibpaperIndex, ColumnIndex, EndnoteIndex, EquationIndex, FootnoteIndex, HeadlineIndex,
    HeadlineItem, HeadlineKind, ImageIndex, ImageItem, ImageKind, Index, Item, ListIndex,
    TableIndex,
};
use crate::preprocess::Source;
use crate::syntax::{self, HeadlineLine};
use regex::Regex;
use std::sync::LazyLock;

static RE_ICON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@<icon>\{([^}]*)\}").unwrap());

/// Directives whose bodies are taken verbatim and never scanned.
const VERBATIM_BLOCKS: &[&str] = &["embed", "texequation", "graph", "raw", "comment"];

#[derive(Debug, Clone)]
pub struct ChapterIndexes {
    pub title: Option<String>,
    pub list: ListIndex,
    pub table: TableIndex,
    pub equation: EquationIndex,
    pub footnote: FootnoteIndex,
    pub endnote: EndnoteIndex,
    pub image: ImageIndex,
    pub icon: ImageIndex,
    pub numberless_image: ImageIndex,
    pub indep_image: ImageIndex,
    pub headline: HeadlineIndex,
    pub column: ColumnIndex,
    pub bibpaper: BibpaperIndex,
}

impl Default for ChapterIndexes {
    fn default() -> Self {
        ChapterIndexes {
            title: None,
            list: Index::new("list"),
            table: Index::new("table"),
            equation: Index::new("equation"),
            footnote: Index::new("footnote"),
            endnote: Index::new("endnote"),
            image: Index::new("image"),
            icon: Index::new("icon"),
            numberless_image: Index::new("image"),
            indep_image: Index::new("image"),
            headline: Index::new("headline"),
            column: Index::new("column"),
            bibpaper: Index::new("bibpaper"),
        }
    }
}

#[derive(Default)]
struct Counters {
    list: usize,
    table: usize,
    equation: usize,
    footnote: usize,
    endnote: usize,
    image: usize,
    icon: usize,
    numberless_image: usize,
    indep_image: usize,
    column: usize,
    bibpaper: usize,
}

#[derive(Default)]
struct HeadlineState {
    numbers: Vec<usize>,
    path: Vec<String>,
    column_level: Option<usize>,
}

struct IndexBuilder<'a> {
    source: &'a Source,
    out: ChapterIndexes,
    counters: Counters,
    headlines: HeadlineState,
    line: usize,
}

pub fn build_indexes(source: &Source) -> ChapterIndexes {
    let mut builder = IndexBuilder {
        source,
        out: ChapterIndexes::default(),
        counters: Counters::default(),
        headlines: HeadlineState::default(),
        line: 0,
    };
    builder.run();
    builder.report_duplicates();
    tracing::debug!(
        file = source.file.as_str(),
        lists = builder.out.list.len(),
        tables = builder.out.table.len(),
        images = builder.out.image.len(),
        headlines = builder.out.headline.len(),
        "index pass finished"
    );
    builder.out
}

fn next(counter: &mut usize) -> usize {
    *counter += 1;
    *counter
}

impl IndexBuilder<'_> {
    fn warn(&self, message: &str) {
        tracing::warn!(file = self.source.file.as_str(), line = self.line, "{}", message);
    }

    fn run(&mut self) {
        let mut open_block: Option<String> = None;
        for (i, text) in self.source.lines.iter().enumerate() {
            self.line = self.source.origins.get(i).copied().unwrap_or(i + 1);

            if let Some(name) = &open_block {
                if syntax::RE_BLOCK_END.is_match(text) {
                    open_block = None;
                } else if !VERBATIM_BLOCKS.contains(&name.as_str()) {
                    self.scan_icons(text);
                }
                continue;
            }

            if let Some(h) = syntax::parse_headline(text) {
                self.headline(h);
                self.scan_icons(text);
                continue;
            }

            match syntax::parse_directive(text) {
                Some(Ok(d)) => {
                    self.directive(&d.name, &d.args);
                    if d.opens_block {
                        open_block = Some(d.name);
                    }
                }
                Some(Err(e)) => self.warn(&e.0),
                None => self.scan_icons(text),
            }
        }
    }

    fn id_arg(&self, args: &[String], what: &str) -> Option<String> {
        match args.first() {
            Some(id) if !id.is_empty() => Some(id.clone()),
            _ => {
                self.warn(&format!("{} has no id; its number is skipped", what));
                None
            }
        }
    }

    fn directive(&mut self, name: &str, args: &[String]) {
        match name {
            "list" | "listnum" => {
                let n = next(&mut self.counters.list);
                if let Some(id) = self.id_arg(args, name) {
                    self.out
                        .list
                        .push(Item::new(id, n).with_caption(args.get(1).cloned()));
                }
            }
            "table" | "imgtable" => {
                // An id-less //table{ is a legitimately unnumbered table.
                if args.is_empty() && name == "table" {
                    return;
                }
                let n = next(&mut self.counters.table);
                if let Some(id) = self.id_arg(args, name) {
                    self.out
                        .table
                        .push(Item::new(id, n).with_caption(args.get(1).cloned()));
                }
            }
            "texequation" => {
                if args.is_empty() {
                    return;
                }
                let n = next(&mut self.counters.equation);
                if let Some(id) = self.id_arg(args, name) {
                    self.out
                        .equation
                        .push(Item::new(id, n).with_caption(args.get(1).cloned()));
                }
            }
            "image" | "graph" => {
                let n = next(&mut self.counters.image);
                let caption = if name == "graph" { args.get(2) } else { args.get(1) };
                if let Some(id) = self.id_arg(args, name) {
                    self.out
                        .image
                        .push(ImageItem::new(id, n, caption.cloned(), ImageKind::Numbered));
                }
            }
            "indepimage" => {
                let n = next(&mut self.counters.indep_image);
                if let Some(id) = self.id_arg(args, name) {
                    self.out.indep_image.push(ImageItem::new(
                        id,
                        n,
                        args.get(1).cloned(),
                        ImageKind::Independent,
                    ));
                }
            }
            "numberlessimage" => {
                let n = next(&mut self.counters.numberless_image);
                if let Some(id) = self.id_arg(args, name) {
                    self.out.numberless_image.push(ImageItem::new(
                        id,
                        n,
                        args.get(1).cloned(),
                        ImageKind::Numberless,
                    ));
                }
            }
            "footnote" => {
                let n = next(&mut self.counters.footnote);
                if let Some(id) = self.id_arg(args, name) {
                    self.out
                        .footnote
                        .push(Item::new(id, n).with_content(args.get(1).cloned()));
                }
            }
            "endnote" => {
                let n = next(&mut self.counters.endnote);
                if let Some(id) = self.id_arg(args, name) {
                    self.out
                        .endnote
                        .push(Item::new(id, n).with_content(args.get(1).cloned()));
                }
            }
            "bibpaper" => {
                let n = next(&mut self.counters.bibpaper);
                if let Some(id) = self.id_arg(args, name) {
                    self.out
                        .bibpaper
                        .push(Item::new(id, n).with_caption(args.get(1).cloned()));
                }
            }
            _ => {}
        }
    }

    fn scan_icons(&mut self, text: &str) {
        for caps in RE_ICON.captures_iter(text) {
            let n = next(&mut self.counters.icon);
            let id = caps[1].to_string();
            if self.out.icon.contains(&id) {
                continue;
            }
            self.out
                .icon
                .push(ImageItem::new(id, n, None, ImageKind::Icon));
        }
    }

    fn headline(&mut self, h: HeadlineLine) {
        let level = h.level.min(MAX_HEADLINE_LEVEL);
        let tag = h.tag.as_deref();

        if level == 1 {
            if self.out.title.is_none() && tag.is_none() {
                self.out.title = Some(h.caption.clone());
            }
            self.headlines = HeadlineState::default();
            return;
        }

        match tag {
            Some("column") => {
                let n = next(&mut self.counters.column);
                let id = h.label.clone().unwrap_or_else(|| format!("column-{}", n));
                self.out
                    .column
                    .push(Item::new(id, n).with_caption(Some(h.caption.clone())));
                self.headlines.column_level = Some(level);
                return;
            }
            Some(t) if t.starts_with('/') => {
                self.headlines.column_level = None;
                return;
            }
            _ => {}
        }

        if let Some(col) = self.headlines.column_level {
            if level <= col {
                self.headlines.column_level = None;
            } else {
                return;
            }
        }

        let Some(kind) = HeadlineKind::from_tag(tag) else {
            return;
        };
        if h.caption.is_empty() {
            self.warn("headline is empty");
            return;
        }

        let slot = level - 2;
        let state = &mut self.headlines;
        state.numbers.truncate(slot + 1);
        state.numbers.resize(slot + 1, 0);
        state.path.truncate(slot + 1);
        state.path.resize(slot + 1, String::new());

        let number = if kind.is_counted() {
            state.numbers[slot] += 1;
            state.numbers.clone()
        } else {
            Vec::new()
        };
        let id = h.label.clone().unwrap_or_else(|| h.caption.clone());
        state.path[slot] = id.clone();
        let path = state.path.join("|");

        self.out.headline.push(HeadlineItem {
            path,
            id,
            level,
            number,
            caption: h.caption,
            kind,
        });
    }

    fn report_duplicates(&self) {
        let file = self.source.file.as_str();
        let groups: [(&str, Vec<&str>); 8] = [
            ("list", self.out.list.duplicates()),
            ("table", self.out.table.duplicates()),
            ("equation", self.out.equation.duplicates()),
            ("footnote", self.out.footnote.duplicates()),
            ("endnote", self.out.endnote.duplicates()),
            ("image", self.out.image.duplicates()),
            ("column", self.out.column.duplicates()),
            ("bibpaper", self.out.bibpaper.duplicates()),
        ];
        for (kind, ids) in groups {
            for id in ids {
                tracing::warn!(file, "duplicate {} id: {}", kind, id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexError;
    use crate::preprocess::preprocess;

    fn index(text: &str) -> ChapterIndexes {
        build_indexes(&preprocess("ch01.re", text).unwrap())
    }

    #[test]
    fn test_independent_counters() {
        let idx = index(
            "//list[l1][a]{\n//}\n//table[t1][b]{\nx\n//}\n//list[l2][c]{\n//}\n//table[t2][d]{\ny\n//}\n",
        );
        assert_eq!(idx.list.get("l1").unwrap().number, 1);
        assert_eq!(idx.list.get("l2").unwrap().number, 2);
        assert_eq!(idx.table.get("t1").unwrap().number, 1);
        assert_eq!(idx.table.get("t2").unwrap().number, 2);
        assert_eq!(idx.list.get("l1").unwrap().caption.as_deref(), Some("a"));
    }

    #[test]
    fn test_empty_id_consumes_slot() {
        let idx = index("//list[][x]{\n//}\n//list[b][y]{\n//}\n");
        assert_eq!(idx.list.len(), 1);
        assert_eq!(idx.list.get("b").unwrap().number, 2);
    }

    #[test]
    fn test_duplicate_ids_are_ambiguous_on_lookup() {
        let idx = index("//list[a][x]{\n//}\n//list[a][y]{\n//}\n");
        assert!(matches!(idx.list.get("a"), Err(IndexError::Ambiguous { .. })));
        assert!(matches!(idx.list.get("b"), Err(IndexError::NotFound { .. })));
    }

    #[test]
    fn test_block_bodies_are_not_scanned_for_headlines() {
        let idx = index("= Title\n//emlist{\n== not a headline\n//}\n== real\n");
        assert_eq!(idx.headline.len(), 1);
        assert_eq!(idx.headline.items()[0].caption, "real");
        assert_eq!(idx.title.as_deref(), Some("Title"));
    }

    #[test]
    fn test_headline_numbers() {
        let idx = index("= ch\n== a\n=== a1\n=== a2\n== b\n=== b1\n");
        let numbers: Vec<Vec<usize>> =
            idx.headline.items().iter().map(|h| h.number.clone()).collect();
        assert_eq!(
            numbers,
            vec![vec![1], vec![1, 1], vec![1, 2], vec![2], vec![2, 1]]
        );
        assert_eq!(idx.headline.get("b|b1").unwrap().number, vec![2, 1]);
    }

    #[test]
    fn test_column_isolation() {
        let idx = index(
            "= ch1\n== sec1\n== sec2\n=== sub\n===[column] c1\n==== inside\n===[/column]\n=== sub2\n",
        );
        assert_eq!(idx.headline.get("sub").unwrap().number, vec![2, 1]);
        assert_eq!(idx.headline.get("sub2").unwrap().number, vec![2, 2]);
        assert!(idx.headline.get("inside").is_err());
        assert_eq!(idx.column.len(), 1);
        assert_eq!(idx.column.items()[0].caption.as_deref(), Some("c1"));
    }

    #[test]
    fn test_column_closed_by_shallower_headline() {
        let idx = index("= ch\n== a\n===[column] c\n==== in\n== b\n");
        assert_eq!(idx.headline.get("b").unwrap().number, vec![2]);
        assert!(idx.headline.get("in").is_err());
    }

    #[test]
    fn test_nonum_does_not_advance() {
        let idx = index("= ch\n==[nonum] pre\n== a\n==[notoc] b\n");
        assert!(idx.headline.get("pre").unwrap().number.is_empty());
        assert_eq!(idx.headline.get("a").unwrap().number, vec![1]);
        assert_eq!(idx.headline.get("b").unwrap().number, vec![2]);
    }

    #[test]
    fn test_headline_label_is_key() {
        let idx = index("= ch\n=={setup} Setting things up\n");
        let item = idx.headline.get("setup").unwrap();
        assert_eq!(item.caption, "Setting things up");
    }

    #[test]
    fn test_footnotes_and_images() {
        let idx = index(
            "//footnote[f1][first]\n//image[img1][cap]{\n//}\n//indepimage[logo]\n//numberlessimage[n1]\n//image[img2][cap2]\n",
        );
        assert_eq!(idx.footnote.get("f1").unwrap().content.as_deref(), Some("first"));
        assert_eq!(idx.image.get("img2").unwrap().number, 2);
        assert_eq!(idx.indep_image.get("logo").unwrap().display_number(), None);
        assert_eq!(idx.numberless_image.get("n1").unwrap().number, 1);
    }

    #[test]
    fn test_graph_caption_is_third_argument() {
        let idx = index("//graph[g1][gnuplot][Plot]{\nplot sin(x)\n//}\n");
        assert_eq!(idx.image.get("g1").unwrap().caption.as_deref(), Some("Plot"));
    }

    #[test]
    fn test_icons_and_equations() {
        let idx = index("see @<icon>{ok} and @<icon>{ng}\n//texequation[e1][Euler]{\ne^{i\\pi}\n//}\n//texequation{\nx\n//}\n");
        assert_eq!(idx.icon.len(), 2);
        assert_eq!(idx.equation.len(), 1);
        assert_eq!(idx.equation.get("e1").unwrap().number, 1);
    }

    #[test]
    fn test_unnumbered_table_takes_no_slot() {
        let idx = index("//table{\na\n//}\n//table[t][x]{\nb\n//}\n");
        assert_eq!(idx.table.get("t").unwrap().number, 1);
    }
}
