//! Book, part and chapter model plus catalog loading.

use crate::config::Config;
use crate::error::{CompileError, Result};
use crate::i18n::Locale;
use crate::index::{HeadlineItem, IndexError, Item};
use crate::indexer::{build_indexes, ChapterIndexes};
use crate::preprocess::{preprocess, Source};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a chapter sits in the catalog, which decides how it is numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterKind {
    Predef,
    Chapter,
    Appendix,
    Postdef,
}

#[derive(Debug)]
pub struct Chapter {
    id: String,
    path: PathBuf,
    kind: ChapterKind,
    number: Option<usize>,
    content: String,
    source: Source,
    indexes: OnceCell<ChapterIndexes>,
}

impl Chapter {
    /// Build a chapter from its raw text. Preprocessing errors surface here with
    /// the chapter's file name attached.
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        kind: ChapterKind,
        number: Option<usize>,
        content: impl Into<String>,
    ) -> Result<Self> {
        let path = path.into();
        let content = content.into();
        let source = preprocess(&path.to_string_lossy(), &content)?;
        Ok(Chapter {
            id: id.into(),
            path,
            kind,
            number,
            content,
            source,
            indexes: OnceCell::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ChapterKind {
        self.kind
    }

    pub fn number(&self) -> Option<usize> {
        self.number
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Indexes from the first pass, built on first call and reused afterwards.
    pub fn indexes(&self) -> &ChapterIndexes {
        self.indexes.get_or_init(|| build_indexes(&self.source))
    }

    /// Drop the cached indexes so the next [`indexes`](Self::indexes) call rebuilds them.
    pub fn invalidate(&mut self) {
        self.indexes = OnceCell::new();
    }

    pub fn title(&self) -> &str {
        self.indexes().title.as_deref().unwrap_or("")
    }

    /// Number as it appears in `1.2`-style labels: `3` for chapters, `A` for the
    /// first appendix, `None` for front and back matter.
    pub fn label(&self) -> Option<String> {
        let n = self.number?;
        match self.kind {
            ChapterKind::Appendix => Some(appendix_label(n)),
            _ => Some(n.to_string()),
        }
    }

    /// Headline-style number such as `第3章` or `付録A`.
    pub fn format_number(&self, locale: &Locale) -> Option<String> {
        let label = self.label()?;
        match self.kind {
            ChapterKind::Appendix => Some(locale.t("appendix", &[&label])),
            _ => Some(locale.t("chapter", &[&label])),
        }
    }
}

fn appendix_label(n: usize) -> String {
    match n {
        1..=26 => char::from(b'A' + (n - 1) as u8).to_string(),
        _ => n.to_string(),
    }
}

#[derive(Debug)]
pub struct Part {
    number: Option<usize>,
    name: Option<String>,
    chapters: Vec<Chapter>,
}

impl Part {
    pub fn new(number: Option<usize>, name: Option<String>, chapters: Vec<Chapter>) -> Self {
        Part {
            number,
            name,
            chapters,
        }
    }

    pub fn number(&self) -> Option<usize> {
        self.number
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn format_number(&self, locale: &Locale) -> Option<String> {
        self.number.map(|n| locale.t("part", &[&n.to_string()]))
    }
}

/// One entry under `CHAPS`: a chapter file, or a part mapping to its chapters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    Chapter(String),
    Part(IndexMap<String, Vec<String>>),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Catalog {
    #[serde(rename = "PREDEF", default)]
    pub predef: Vec<String>,

    #[serde(rename = "CHAPS", default)]
    pub chaps: Vec<CatalogEntry>,

    #[serde(rename = "APPENDIX", default)]
    pub appendix: Vec<String>,

    #[serde(rename = "POSTDEF", default)]
    pub postdef: Vec<String>,
}

impl Catalog {
    pub fn parse(text: &str) -> Result<Self> {
        // An empty catalog file deserialises as YAML null.
        if text.trim().is_empty() {
            return Ok(Catalog::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Catalog listing `files` as plain chapters, in order.
    pub fn from_files<S: AsRef<str>>(files: &[S]) -> Self {
        Catalog {
            chaps: files
                .iter()
                .map(|f| CatalogEntry::Chapter(f.as_ref().to_string()))
                .collect(),
            ..Catalog::default()
        }
    }
}

#[derive(Debug)]
pub struct Book {
    config: Config,
    base_dir: PathBuf,
    parts: Vec<Part>,
    bib: Option<Chapter>,
    image_entries: HashSet<PathBuf>,
    chapter_index: OnceCell<IndexMap<String, (usize, usize)>>,
}

fn chapter_id(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

impl Book {
    /// Assemble a book from a catalog, reading each file through `loader`.
    pub fn from_catalog<F>(config: Config, catalog: &Catalog, mut loader: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        config.validate()?;
        let load = |loader: &mut F,
                    file: &str,
                    kind: ChapterKind,
                    number: Option<usize>|
         -> Result<Chapter> {
            let content = loader(file)?;
            Chapter::new(chapter_id(file), file, kind, number, content)
        };

        let mut parts = Vec::new();
        if !catalog.predef.is_empty() {
            let chapters = catalog
                .predef
                .iter()
                .map(|f| load(&mut loader, f, ChapterKind::Predef, None))
                .collect::<Result<Vec<_>>>()?;
            parts.push(Part::new(None, None, chapters));
        }

        let mut chapter_no = 0;
        let mut part_no = 0;
        let mut loose: Vec<Chapter> = Vec::new();
        for entry in &catalog.chaps {
            match entry {
                CatalogEntry::Chapter(file) => {
                    chapter_no += 1;
                    loose.push(load(&mut loader, file, ChapterKind::Chapter, Some(chapter_no))?);
                }
                CatalogEntry::Part(map) => {
                    if !loose.is_empty() {
                        parts.push(Part::new(None, None, std::mem::take(&mut loose)));
                    }
                    for (key, files) in map {
                        part_no += 1;
                        let name = if key.ends_with(".re") {
                            let text = loader(key)?;
                            let source = preprocess(key, &text)?;
                            build_indexes(&source).title.or_else(|| Some(chapter_id(key)))
                        } else {
                            Some(key.clone())
                        };
                        let mut chapters = Vec::new();
                        for file in files {
                            chapter_no += 1;
                            chapters.push(load(&mut loader, file, ChapterKind::Chapter, Some(chapter_no))?);
                        }
                        parts.push(Part::new(Some(part_no), name, chapters));
                    }
                }
            }
        }
        if !loose.is_empty() {
            parts.push(Part::new(None, None, loose));
        }

        if !catalog.appendix.is_empty() {
            let chapters = catalog
                .appendix
                .iter()
                .enumerate()
                .map(|(i, f)| load(&mut loader, f, ChapterKind::Appendix, Some(i + 1)))
                .collect::<Result<Vec<_>>>()?;
            parts.push(Part::new(None, None, chapters));
        }
        if !catalog.postdef.is_empty() {
            let chapters = catalog
                .postdef
                .iter()
                .map(|f| load(&mut loader, f, ChapterKind::Postdef, None))
                .collect::<Result<Vec<_>>>()?;
            parts.push(Part::new(None, None, chapters));
        }

        Ok(Book {
            config,
            base_dir: PathBuf::new(),
            parts,
            bib: None,
            image_entries: HashSet::new(),
            chapter_index: OnceCell::new(),
        })
    }

    /// Load the book in `dir`: `catalog.yml` when present, otherwise every `.re`
    /// file in name order. The image directory is listed once up front.
    pub fn load(dir: &Path, config: Config) -> Result<Self> {
        let read = |path: PathBuf| -> Result<String> {
            fs::read_to_string(&path).map_err(|source| CompileError::Io { path, source })
        };

        let catalog_path = dir.join("catalog.yml");
        let catalog = if catalog_path.is_file() {
            Catalog::parse(&read(catalog_path)?)?
        } else {
            let files = list_chapter_files(dir, &config.bib_file)?;
            Catalog::from_files(&files)
        };
        tracing::debug!(dir = %dir.display(), chapters = catalog.chaps.len(), "catalog loaded");

        let mut book = Book::from_catalog(config, &catalog, |file| read(dir.join(file)))?;
        book.base_dir = dir.to_path_buf();

        let bib_path = dir.join(format!("{}.re", book.config.bib_file));
        if bib_path.is_file() {
            let content = read(bib_path.clone())?;
            book.bib = Some(Chapter::new(
                book.config.bib_file.clone(),
                bib_path,
                ChapterKind::Postdef,
                None,
                content,
            )?);
        }

        let image_dir = book.image_dir();
        if image_dir.is_dir() {
            book.image_entries = list_files(&image_dir)?.into_iter().collect();
        }
        Ok(book)
    }

    /// A book holding one numbered chapter, for compiling a lone text.
    pub fn single(config: Config, id: &str, text: &str) -> Result<Self> {
        let file = format!("{}.re", id);
        Book::from_catalog(config, &Catalog::from_files(&[file]), |_| Ok(text.to_string()))
    }

    pub fn with_image_entries<I: IntoIterator<Item = PathBuf>>(mut self, entries: I) -> Self {
        self.image_entries = entries.into_iter().collect();
        self
    }

    pub fn with_bib(mut self, text: &str) -> Result<Self> {
        let file = format!("{}.re", self.config.bib_file);
        self.bib = Some(Chapter::new(
            self.config.bib_file.clone(),
            file,
            ChapterKind::Postdef,
            None,
            text,
        )?);
        Ok(self)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn image_dir(&self) -> PathBuf {
        self.base_dir.join(&self.config.image_dir)
    }

    pub fn image_entries(&self) -> &HashSet<PathBuf> {
        &self.image_entries
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn chapters(&self) -> impl Iterator<Item = &Chapter> {
        self.parts.iter().flat_map(|p| p.chapters.iter())
    }

    fn chapter_index(&self) -> &IndexMap<String, (usize, usize)> {
        self.chapter_index.get_or_init(|| {
            let mut map = IndexMap::new();
            for (pi, part) in self.parts.iter().enumerate() {
                for (ci, chapter) in part.chapters.iter().enumerate() {
                    if map.insert(chapter.id.clone(), (pi, ci)).is_some() {
                        tracing::warn!("duplicate chapter id: {}", chapter.id);
                    }
                }
            }
            map
        })
    }

    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        let (pi, ci) = *self.chapter_index().get(id)?;
        self.parts.get(pi)?.chapters.get(ci)
    }

    pub fn chapter_mut(&mut self, id: &str) -> Option<&mut Chapter> {
        let (pi, ci) = *self.chapter_index().get(id)?;
        self.parts.get_mut(pi)?.chapters.get_mut(ci)
    }

    pub fn require_chapter(&self, id: &str) -> std::result::Result<&Chapter, IndexError> {
        self.chapter(id).ok_or_else(|| IndexError::NotFound {
            kind: "chapter",
            id: id.to_string(),
        })
    }

    /// Search every chapter for a headline key. Exactly one hit resolves.
    pub fn find_headline(
        &self,
        id: &str,
    ) -> std::result::Result<(&Chapter, &HeadlineItem), IndexError> {
        let mut found = None;
        for chapter in self.chapters() {
            match chapter.indexes().headline.get(id) {
                Ok(item) if found.is_none() => found = Some((chapter, item)),
                Ok(_) | Err(IndexError::Ambiguous { .. }) => {
                    return Err(IndexError::Ambiguous {
                        kind: "headline",
                        id: id.to_string(),
                    })
                }
                Err(IndexError::NotFound { .. }) => {}
            }
        }
        found.ok_or_else(|| IndexError::NotFound {
            kind: "headline",
            id: id.to_string(),
        })
    }

    /// Bibliography entries are shared by the whole book, including the
    /// optional bibliography file.
    pub fn find_bibpaper(&self, id: &str) -> std::result::Result<&Item, IndexError> {
        let mut found = None;
        for chapter in self.bib.iter().chain(self.chapters()) {
            match chapter.indexes().bibpaper.get(id) {
                Ok(item) if found.is_none() => found = Some(item),
                Ok(_) | Err(IndexError::Ambiguous { .. }) => {
                    return Err(IndexError::Ambiguous {
                        kind: "bibpaper",
                        id: id.to_string(),
                    })
                }
                Err(IndexError::NotFound { .. }) => {}
            }
        }
        found.ok_or_else(|| IndexError::NotFound {
            kind: "bibpaper",
            id: id.to_string(),
        })
    }
}

fn list_chapter_files(dir: &Path, bib_file: &str) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|source| CompileError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let bib = format!("{}.re", bib_file);
    let mut files: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".re") && *name != bib)
        .collect();
    files.sort();
    Ok(files)
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let io = |source| CompileError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.is_dir() {
            out.extend(list_files(&path)?);
        } else if path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(files: &'a [(&'a str, &'a str)]) -> impl FnMut(&str) -> Result<String> + 'a {
        move |name| {
            files
                .iter()
                .find(|(f, _)| *f == name)
                .map(|(_, t)| t.to_string())
                .ok_or_else(|| CompileError::Config(format!("missing {}", name)))
        }
    }

    #[test]
    fn test_catalog_parse() {
        let yaml = "PREDEF:\n  - pre.re\nCHAPS:\n  - ch01.re\n  - part1.re:\n    - ch02.re\n    - ch03.re\nAPPENDIX:\n  - app.re\n";
        let catalog = Catalog::parse(yaml).unwrap();
        assert_eq!(catalog.predef, vec!["pre.re"]);
        assert_eq!(catalog.chaps.len(), 2);
        assert_eq!(catalog.chaps[0], CatalogEntry::Chapter("ch01.re".to_string()));
        match &catalog.chaps[1] {
            CatalogEntry::Part(map) => assert_eq!(map["part1.re"], vec!["ch02.re", "ch03.re"]),
            other => panic!("expected a part, got {:?}", other),
        }
        assert!(catalog.postdef.is_empty());
    }

    #[test]
    fn test_empty_catalog() {
        assert_eq!(Catalog::parse("").unwrap(), Catalog::default());
    }

    #[test]
    fn test_invalid_catalog_is_configuration_error() {
        let err = Catalog::parse("CHAPS: [unclosed").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_numbering_across_parts() {
        let yaml = "PREDEF:\n  - pre.re\nCHAPS:\n  - ch01.re\n  - Getting Started:\n    - ch02.re\n  - part2.re:\n    - ch03.re\nAPPENDIX:\n  - app1.re\n  - app2.re\nPOSTDEF:\n  - post.re\n";
        let catalog = Catalog::parse(yaml).unwrap();
        let files = [
            ("pre.re", "= Preface\n"),
            ("ch01.re", "= One\n"),
            ("ch02.re", "= Two\n"),
            ("part2.re", "= Advanced Topics\n"),
            ("ch03.re", "= Three\n"),
            ("app1.re", "= App\n"),
            ("app2.re", "= App2\n"),
            ("post.re", "= Afterword\n"),
        ];
        let book = Book::from_catalog(Config::default(), &catalog, texts(&files)).unwrap();

        let numbers: Vec<(String, Option<String>)> = book
            .chapters()
            .map(|c| (c.id().to_string(), c.label()))
            .collect();
        assert_eq!(
            numbers,
            vec![
                ("pre".to_string(), None),
                ("ch01".to_string(), Some("1".to_string())),
                ("ch02".to_string(), Some("2".to_string())),
                ("ch03".to_string(), Some("3".to_string())),
                ("app1".to_string(), Some("A".to_string())),
                ("app2".to_string(), Some("B".to_string())),
                ("post".to_string(), None),
            ]
        );

        let parts: Vec<(Option<usize>, Option<&str>)> =
            book.parts().iter().map(|p| (p.number(), p.name())).collect();
        assert_eq!(
            parts,
            vec![
                (None, None),
                (None, None),
                (Some(1), Some("Getting Started")),
                (Some(2), Some("Advanced Topics")),
                (None, None),
                (None, None),
            ]
        );

        let locale = Locale::default();
        assert_eq!(book.chapter("ch03").unwrap().format_number(&locale).as_deref(), Some("第3章"));
        assert_eq!(book.chapter("app1").unwrap().format_number(&locale).as_deref(), Some("付録A"));
        assert_eq!(book.chapter("pre").unwrap().format_number(&locale), None);
        assert_eq!(book.parts()[2].format_number(&locale).as_deref(), Some("第1部"));
    }

    #[test]
    fn test_chapter_lookup_and_title() {
        let book = Book::single(Config::default(), "ch01", "= Hello\n\ntext\n").unwrap();
        let ch = book.chapter("ch01").unwrap();
        assert_eq!(ch.title(), "Hello");
        assert_eq!(ch.number(), Some(1));
        assert!(book.chapter("nope").is_none());
        assert!(matches!(
            book.require_chapter("nope"),
            Err(IndexError::NotFound { kind: "chapter", .. })
        ));
    }

    #[test]
    fn test_indexes_are_cached_until_invalidated() {
        let mut book = Book::single(Config::default(), "ch01", "//list[a][x]{\n//}\n").unwrap();
        let first = book.chapter("ch01").unwrap().indexes() as *const ChapterIndexes;
        let second = book.chapter("ch01").unwrap().indexes() as *const ChapterIndexes;
        assert_eq!(first, second);

        let ch = book.chapter_mut("ch01").unwrap();
        ch.invalidate();
        assert_eq!(ch.indexes().list.len(), 1);
    }

    #[test]
    fn test_preprocess_error_carries_file() {
        let err = Book::single(Config::default(), "ch01", "ok\nbad\u{1}\n").unwrap_err();
        let loc = err.location().unwrap();
        assert_eq!(loc.file, "ch01.re");
        assert_eq!(loc.line, 2);
    }

    #[test]
    fn test_find_headline_across_chapters() {
        let catalog = Catalog::from_files(&["a.re", "b.re"]);
        let files = [
            ("a.re", "= A\n== Setup\n== Only A\n"),
            ("b.re", "= B\n== Setup\n"),
        ];
        let book = Book::from_catalog(Config::default(), &catalog, texts(&files)).unwrap();
        let (ch, item) = book.find_headline("Only A").unwrap();
        assert_eq!(ch.id(), "a");
        assert_eq!(item.number, vec![2]);
        assert!(matches!(
            book.find_headline("Setup"),
            Err(IndexError::Ambiguous { .. })
        ));
        assert!(matches!(
            book.find_headline("Missing"),
            Err(IndexError::NotFound { .. })
        ));
    }

    #[test]
    fn test_bibpaper_lookup_is_book_wide() {
        let book = Book::single(Config::default(), "ch01", "text\n")
            .unwrap()
            .with_bib("//bibpaper[knuth][The Art of Computer Programming]\n")
            .unwrap();
        let item = book.find_bibpaper("knuth").unwrap();
        assert_eq!(item.number, 1);
        assert!(book.find_bibpaper("nobody").is_err());
    }

    #[test]
    fn test_invalid_config_rejected_before_loading() {
        let config = Config {
            language: "xx".to_string(),
            ..Config::default()
        };
        let err = Book::single(config, "ch01", "text\n").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }
}
