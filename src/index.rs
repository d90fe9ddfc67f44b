//! Per-chapter registries of referenceable entities.
//!
//! Each [`Index`] keeps items in source order and a key map for lookups.
//! Duplicate keys are accepted on insert and reported as ambiguous on lookup.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} is ambiguous: {id}")]
    Ambiguous { kind: &'static str, id: String },
}

pub trait IndexItem {
    /// Lookup key; headlines use a `|`-joined path.
    fn key(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub number: usize,
    pub caption: Option<String>,
    pub content: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>, number: usize) -> Self {
        Item {
            id: id.into(),
            number,
            caption: None,
            content: None,
        }
    }

    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption;
        self
    }

    pub fn with_content(mut self, content: Option<String>) -> Self {
        self.content = content;
        self
    }
}

impl IndexItem for Item {
    fn key(&self) -> &str {
        &self.id
    }
}

/// How a headline was tagged in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlineKind {
    Numbered,
    Nonum,
    Notoc,
    Nodisp,
}

impl HeadlineKind {
    pub fn from_tag(tag: Option<&str>) -> Option<Self> {
        match tag {
            None => Some(HeadlineKind::Numbered),
            Some("nonum") => Some(HeadlineKind::Nonum),
            Some("notoc") => Some(HeadlineKind::Notoc),
            Some("nodisp") => Some(HeadlineKind::Nodisp),
            Some(_) => None,
        }
    }

    /// Whether headings of this kind advance the section counters.
    pub fn is_counted(&self) -> bool {
        matches!(self, HeadlineKind::Numbered | HeadlineKind::Notoc)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineItem {
    /// `|`-joined ids (label or caption) from the outermost section down.
    pub path: String,
    pub id: String,
    pub level: usize,
    /// Position below the chapter, e.g. `[2, 1]`; empty for unnumbered kinds.
    pub number: Vec<usize>,
    pub caption: String,
    pub kind: HeadlineKind,
}

impl IndexItem for HeadlineItem {
    fn key(&self) -> &str {
        &self.path
    }
}

/// Which of the image registries an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Numbered,
    Numberless,
    Independent,
    Icon,
}

#[derive(Debug)]
pub struct ImageItem {
    pub id: String,
    pub number: usize,
    pub caption: Option<String>,
    pub kind: ImageKind,
    paths: Mutex<HashMap<String, Option<PathBuf>>>,
}

impl Clone for ImageItem {
    fn clone(&self) -> Self {
        ImageItem {
            id: self.id.clone(),
            number: self.number,
            caption: self.caption.clone(),
            kind: self.kind,
            paths: Mutex::new(HashMap::new()),
        }
    }
}

impl PartialEq for ImageItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.number == other.number
            && self.caption == other.caption
            && self.kind == other.kind
    }
}

impl ImageItem {
    pub fn new(id: impl Into<String>, number: usize, caption: Option<String>, kind: ImageKind) -> Self {
        ImageItem {
            id: id.into(),
            number,
            caption,
            kind,
            paths: Mutex::new(HashMap::new()),
        }
    }

    /// Display number; numberless and independent images consume a slot but
    /// show nothing.
    pub fn display_number(&self) -> Option<usize> {
        match self.kind {
            ImageKind::Numbered => Some(self.number),
            _ => None,
        }
    }

    /// Resolve the image file through `finder` on first use and remember the
    /// answer for that finder's target directory.
    pub fn path(&self, finder: &ImageFinder<'_>) -> Option<PathBuf> {
        let mut cache = match self.paths.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache
            .entry(finder.target_dir.to_string())
            .or_insert_with(|| finder.find(&self.id))
            .clone()
    }
}

impl IndexItem for ImageItem {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone)]
pub struct Index<T> {
    kind: &'static str,
    items: Vec<T>,
    keys: IndexMap<String, Vec<usize>>,
}

impl<T: IndexItem> Index<T> {
    pub fn new(kind: &'static str) -> Self {
        Index {
            kind,
            items: Vec::new(),
            keys: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn push(&mut self, item: T) {
        let pos = self.items.len();
        self.keys.entry(item.key().to_string()).or_default().push(pos);
        self.items.push(item);
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_ok()
    }

    /// Keys registered more than once.
    pub fn duplicates(&self) -> Vec<&str> {
        self.keys
            .iter()
            .filter(|(_, v)| v.len() > 1)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    fn not_found(&self, id: &str) -> IndexError {
        IndexError::NotFound {
            kind: self.kind,
            id: id.to_string(),
        }
    }

    fn ambiguous(&self, id: &str) -> IndexError {
        IndexError::Ambiguous {
            kind: self.kind,
            id: id.to_string(),
        }
    }

    /// Exact key lookup, then a suffix match on `|`-separated segments.
    ///
    /// `a|c` finds the item keyed `a|b|c` when no item is keyed `a|c` exactly.
    /// More than one candidate at either stage is ambiguous.
    pub fn get(&self, id: &str) -> Result<&T, IndexError> {
        if let Some(positions) = self.keys.get(id) {
            return match positions.as_slice() {
                [pos] => Ok(&self.items[*pos]),
                _ => Err(self.ambiguous(id)),
            };
        }

        let wanted: Vec<&str> = id.split('|').collect();
        let matches: Vec<usize> = self
            .keys
            .iter()
            .filter(|(key, _)| is_segment_suffix(key, &wanted))
            .flat_map(|(_, positions)| positions.iter().copied())
            .collect();
        match matches.as_slice() {
            [] => Err(self.not_found(id)),
            [pos] => Ok(&self.items[*pos]),
            _ => Err(self.ambiguous(id)),
        }
    }
}

fn is_segment_suffix(key: &str, wanted: &[&str]) -> bool {
    let segments: Vec<&str> = key.split('|').collect();
    if segments.len() <= wanted.len() {
        return false;
    }
    let tail = &segments[segments.len() - wanted.len()..];
    tail == wanted
}

pub type ListIndex = Index<Item>;
pub type TableIndex = Index<Item>;
pub type EquationIndex = Index<Item>;
pub type FootnoteIndex = Index<Item>;
pub type EndnoteIndex = Index<Item>;
pub type ColumnIndex = Index<Item>;
pub type BibpaperIndex = Index<Item>;
pub type HeadlineIndex = Index<HeadlineItem>;
pub type ImageIndex = Index<ImageItem>;

/// Looks up image files among a pre-scanned listing of the image directory.
///
/// Candidates, in order, for chapter `ch01`, target dir `html` and id `fig`:
/// `html/ch01/fig.ext`, `html/ch01-fig.ext`, `html/fig.ext`, `ch01/fig.ext`,
/// `ch01-fig.ext`, `fig.ext`, each tried with every configured extension.
#[derive(Debug, Clone)]
pub struct ImageFinder<'a> {
    pub base_dir: &'a Path,
    pub target_dir: &'a str,
    pub chapter_id: &'a str,
    pub extensions: &'a [String],
    pub entries: &'a HashSet<PathBuf>,
}

impl ImageFinder<'_> {
    fn candidates(&self, id: &str) -> Vec<PathBuf> {
        let base = self.base_dir;
        let target = base.join(self.target_dir);
        let chap = self.chapter_id;
        let stems = [
            target.join(chap).join(id),
            target.join(format!("{}-{}", chap, id)),
            target.join(id),
            base.join(chap).join(id),
            base.join(format!("{}-{}", chap, id)),
            base.join(id),
        ];
        stems
            .iter()
            .flat_map(|stem| {
                self.extensions.iter().map(move |ext| {
                    let mut s = stem.clone().into_os_string();
                    s.push(ext);
                    PathBuf::from(s)
                })
            })
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<PathBuf> {
        self.candidates(id)
            .into_iter()
            .find(|p| self.entries.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_index(ids: &[&str]) -> ListIndex {
        let mut idx = Index::new("list");
        for (i, id) in ids.iter().enumerate() {
            idx.push(Item::new(*id, i + 1));
        }
        idx
    }

    #[test]
    fn test_lookup_by_id() {
        let idx = list_index(&["a", "b"]);
        assert_eq!(idx.get("b").unwrap().number, 2);
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_not_found_and_ambiguous_are_distinct() {
        let idx = list_index(&["a", "dup", "dup"]);
        assert_eq!(
            idx.get("dup").unwrap_err(),
            IndexError::Ambiguous {
                kind: "list",
                id: "dup".to_string()
            }
        );
        assert_eq!(
            idx.get("zzz").unwrap_err(),
            IndexError::NotFound {
                kind: "list",
                id: "zzz".to_string()
            }
        );
        assert_eq!(idx.duplicates(), vec!["dup"]);
    }

    fn headline(path: &str, number: Vec<usize>) -> HeadlineItem {
        HeadlineItem {
            path: path.to_string(),
            id: path.rsplit('|').next().unwrap_or(path).to_string(),
            level: number.len() + 1,
            number,
            caption: path.to_string(),
            kind: HeadlineKind::Numbered,
        }
    }

    #[test]
    fn test_exact_path_wins_over_suffix() {
        let mut idx = Index::new("headline");
        idx.push(headline("intro", vec![1]));
        idx.push(headline("usage|intro", vec![2, 1]));
        assert_eq!(idx.get("intro").unwrap().number, vec![1]);
        assert_eq!(idx.get("usage|intro").unwrap().number, vec![2, 1]);
    }

    #[test]
    fn test_suffix_match() {
        let mut idx = Index::new("headline");
        idx.push(headline("a", vec![1]));
        idx.push(headline("a|b", vec![1, 1]));
        idx.push(headline("a|b|c", vec![1, 1, 1]));
        assert_eq!(idx.get("c").unwrap().number, vec![1, 1, 1]);
        assert_eq!(idx.get("b|c").unwrap().number, vec![1, 1, 1]);
    }

    #[test]
    fn test_suffix_match_ambiguous() {
        let mut idx = Index::new("headline");
        idx.push(headline("a", vec![1]));
        idx.push(headline("a|setup", vec![1, 1]));
        idx.push(headline("b", vec![2]));
        idx.push(headline("b|setup", vec![2, 1]));
        assert!(matches!(
            idx.get("setup"),
            Err(IndexError::Ambiguous { .. })
        ));
        assert_eq!(idx.get("b|setup").unwrap().number, vec![2, 1]);
    }

    #[test]
    fn test_segment_suffix_is_not_substring() {
        let mut idx = Index::new("headline");
        idx.push(headline("a|xsetup", vec![1, 1]));
        assert!(matches!(idx.get("setup"), Err(IndexError::NotFound { .. })));
    }

    #[test]
    fn test_image_display_number() {
        let numbered = ImageItem::new("a", 1, None, ImageKind::Numbered);
        let indep = ImageItem::new("b", 2, None, ImageKind::Independent);
        assert_eq!(numbered.display_number(), Some(1));
        assert_eq!(indep.display_number(), None);
    }

    #[test]
    fn test_image_finder_priority() {
        let entries: HashSet<PathBuf> = [
            PathBuf::from("images/ch01-fig.png"),
            PathBuf::from("images/html/fig.png"),
            PathBuf::from("images/fig.jpg"),
        ]
        .into_iter()
        .collect();
        let exts = vec![".png".to_string(), ".jpg".to_string()];
        let finder = ImageFinder {
            base_dir: Path::new("images"),
            target_dir: "html",
            chapter_id: "ch01",
            extensions: &exts,
            entries: &entries,
        };
        assert_eq!(finder.find("fig"), Some(PathBuf::from("images/html/fig.png")));

        let latex = ImageFinder {
            target_dir: "latex",
            ..finder.clone()
        };
        assert_eq!(latex.find("fig"), Some(PathBuf::from("images/ch01-fig.png")));
        assert_eq!(latex.find("none"), None);
    }

    #[test]
    fn test_image_path_cached_per_target() {
        let entries: HashSet<PathBuf> = [PathBuf::from("images/fig.png")].into_iter().collect();
        let exts = vec![".png".to_string()];
        let finder = ImageFinder {
            base_dir: Path::new("images"),
            target_dir: "html",
            chapter_id: "ch01",
            extensions: &exts,
            entries: &entries,
        };
        let item = ImageItem::new("fig", 1, None, ImageKind::Numbered);
        assert_eq!(item.path(&finder), Some(PathBuf::from("images/fig.png")));

        let empty = HashSet::new();
        let other = ImageFinder {
            entries: &empty,
            ..finder.clone()
        };
        // Same target directory: the cached answer is reused.
        assert_eq!(item.path(&other), Some(PathBuf::from("images/fig.png")));
    }
}
