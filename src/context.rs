//! Per-chapter render context: the book, the chapter being compiled, the
//! target and the locale, plus reference resolution across chapters.

use crate::book::{Book, Chapter};
use crate::config::{Config, Target};
use crate::error::{BuildError, Result};
use crate::i18n::Locale;
use crate::index::{HeadlineItem, ImageFinder, ImageItem, ImageKind, Index, IndexError, Item};
use crate::indexer::ChapterIndexes;
use crate::ir::{ChapterRef, ItemRef};
use std::path::PathBuf;

pub struct Context<'a> {
    pub book: &'a Book,
    pub chapter: &'a Chapter,
    pub target: Target,
    pub locale: Locale,
    image_dir: PathBuf,
}

impl<'a> Context<'a> {
    pub fn new(book: &'a Book, chapter: &'a Chapter, target: Target) -> Result<Self> {
        Ok(Context {
            book,
            chapter,
            target,
            locale: Locale::from_config(book.config())?,
            image_dir: book.image_dir(),
        })
    }

    pub fn config(&self) -> &'a Config {
        self.book.config()
    }

    pub fn indexes(&self) -> &'a ChapterIndexes {
        self.chapter.indexes()
    }

    pub fn draft(&self) -> bool {
        self.config().draft
    }

    /// `1.2` for item 2 of `chapter`, `2` when the chapter is unnumbered.
    pub fn format_number(&self, chapter: &Chapter, n: usize) -> String {
        self.locale.format_number(chapter.label().as_deref(), n)
    }

    /// Split `chap|id` when `chap` names a chapter; otherwise `id` belongs to
    /// the current chapter.
    fn split_ref<'s>(&self, id: &'s str) -> (&'a Chapter, &'s str) {
        if let Some((chap, rest)) = id.split_once('|') {
            if let Some(chapter) = self.book.chapter(chap) {
                return (chapter, rest);
            }
        }
        (self.chapter, id)
    }

    fn item_ref(
        &self,
        id: &str,
        pick: fn(&ChapterIndexes) -> &Index<Item>,
    ) -> std::result::Result<ItemRef, BuildError> {
        let (chapter, key) = self.split_ref(id);
        let item = pick(chapter.indexes()).get(key)?;
        Ok(ItemRef {
            chapter_id: chapter.id().to_string(),
            id: item.id.clone(),
            number: self.format_number(chapter, item.number),
            caption: item.caption.clone(),
        })
    }

    pub fn list_ref(&self, id: &str) -> std::result::Result<ItemRef, BuildError> {
        self.item_ref(id, |idx| &idx.list)
    }

    pub fn table_ref(&self, id: &str) -> std::result::Result<ItemRef, BuildError> {
        self.item_ref(id, |idx| &idx.table)
    }

    pub fn equation_ref(&self, id: &str) -> std::result::Result<ItemRef, BuildError> {
        self.item_ref(id, |idx| &idx.equation)
    }

    pub fn image_ref(&self, id: &str) -> std::result::Result<ItemRef, BuildError> {
        let (chapter, key) = self.split_ref(id);
        let item = chapter.indexes().image.get(key)?;
        Ok(ItemRef {
            chapter_id: chapter.id().to_string(),
            id: item.id.clone(),
            number: item
                .display_number()
                .map(|n| self.format_number(chapter, n))
                .unwrap_or_default(),
            caption: item.caption.clone(),
        })
    }

    pub fn footnote(&self, id: &str) -> std::result::Result<&'a Item, BuildError> {
        Ok(self.indexes().footnote.get(id)?)
    }

    pub fn endnote(&self, id: &str) -> std::result::Result<&'a Item, BuildError> {
        Ok(self.indexes().endnote.get(id)?)
    }

    pub fn bibpaper(&self, id: &str) -> std::result::Result<&'a Item, BuildError> {
        Ok(self.book.find_bibpaper(id)?)
    }

    pub fn column(&self, id: &str) -> std::result::Result<(&'a Chapter, &'a Item), BuildError> {
        let (chapter, key) = self.split_ref(id);
        Ok((chapter, chapter.indexes().column.get(key)?))
    }

    /// Headline lookup: `chap|path` in that chapter, otherwise the current
    /// chapter first and then, for single-segment ids, the whole book.
    pub fn headline(
        &self,
        id: &str,
    ) -> std::result::Result<(&'a Chapter, &'a HeadlineItem), BuildError> {
        if let Some((chap, rest)) = id.split_once('|') {
            if let Some(chapter) = self.book.chapter(chap) {
                return Ok((chapter, chapter.indexes().headline.get(rest)?));
            }
        }
        match self.indexes().headline.get(id) {
            Ok(item) => Ok((self.chapter, item)),
            Err(IndexError::NotFound { .. }) if !id.contains('|') => {
                Ok(self.book.find_headline(id)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `1.2` style number of a headline, or `None` when it is unnumbered, its
    /// chapter is unnumbered or it is deeper than `secnolevel`.
    pub fn headline_number(&self, chapter: &Chapter, item: &HeadlineItem) -> Option<String> {
        if item.number.is_empty() || item.level > self.config().secnolevel {
            return None;
        }
        let label = chapter.label()?;
        let mut parts = vec![label];
        parts.extend(item.number.iter().map(|n| n.to_string()));
        Some(parts.join("."))
    }

    pub fn headline_anchor(&self, chapter: &Chapter, item: &HeadlineItem) -> String {
        if item.number.is_empty() {
            return item.id.clone();
        }
        let mut parts = vec![chapter.label().unwrap_or_else(|| "1".to_string())];
        parts.extend(item.number.iter().map(|n| n.to_string()));
        parts.join("-")
    }

    pub fn chapter_ref(&self, id: &str) -> std::result::Result<ChapterRef, BuildError> {
        let chapter = self.book.require_chapter(id)?;
        Ok(ChapterRef {
            id: chapter.id().to_string(),
            number: chapter.format_number(&self.locale),
            title: chapter.title().to_string(),
        })
    }

    pub fn finder(&self, chapter: &'a Chapter) -> ImageFinder<'_> {
        ImageFinder {
            base_dir: &self.image_dir,
            target_dir: self.target.image_dir(),
            chapter_id: chapter.id(),
            extensions: &self.config().image_types,
            entries: self.book.image_entries(),
        }
    }

    pub fn image_path(&self, item: &ImageItem) -> Option<PathBuf> {
        item.path(&self.finder(self.chapter))
    }

    pub fn image(&self, kind: ImageKind, id: &str) -> std::result::Result<&'a ImageItem, BuildError> {
        let idx = self.indexes();
        let index = match kind {
            ImageKind::Numbered => &idx.image,
            ImageKind::Independent => &idx.indep_image,
            ImageKind::Numberless => &idx.numberless_image,
            ImageKind::Icon => &idx.icon,
        };
        Ok(index.get(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Catalog;

    fn book() -> Book {
        let files = [
            (
                "ch01.re",
                "= One\n== Intro\n=== Detail\n//list[l1][first]{\n//}\n//image[fig][Figure]{\n//}\n",
            ),
            ("ch02.re", "= Two\n== Setup\n//list[l1][second]{\n//}\n//list[l2][third]{\n//}\n"),
        ];
        Book::from_catalog(
            Config::default(),
            &Catalog::from_files(&["ch01.re", "ch02.re"]),
            |name| {
                Ok(files
                    .iter()
                    .find(|(f, _)| *f == name)
                    .map(|(_, t)| t.to_string())
                    .unwrap_or_default())
            },
        )
        .unwrap()
        .with_image_entries([PathBuf::from("images/ch01/fig.png")])
    }

    #[test]
    fn test_list_ref_local_and_cross_chapter() {
        let book = book();
        let ctx = Context::new(&book, book.chapter("ch01").unwrap(), Target::Html).unwrap();
        assert_eq!(ctx.list_ref("l1").unwrap().number, "1.1");
        let other = ctx.list_ref("ch02|l2").unwrap();
        assert_eq!(other.number, "2.2");
        assert_eq!(other.chapter_id, "ch02");
        assert!(matches!(
            ctx.list_ref("l2"),
            Err(BuildError::Reference(IndexError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_headline_falls_back_to_book() {
        let book = book();
        let ctx = Context::new(&book, book.chapter("ch01").unwrap(), Target::Html).unwrap();
        let (ch, item) = ctx.headline("Setup").unwrap();
        assert_eq!(ch.id(), "ch02");
        assert_eq!(ctx.headline_number(ch, item).as_deref(), Some("2.1"));
        assert_eq!(ctx.headline_anchor(ch, item), "2-1");

        let (ch, item) = ctx.headline("Intro|Detail").unwrap();
        assert_eq!(ch.id(), "ch01");
        // Level 3 is deeper than the default secnolevel of 2.
        assert_eq!(ctx.headline_number(ch, item), None);
        assert_eq!(ctx.headline_anchor(ch, item), "1-1-1");
    }

    #[test]
    fn test_chapter_ref() {
        let book = book();
        let ctx = Context::new(&book, book.chapter("ch01").unwrap(), Target::Latex).unwrap();
        let r = ctx.chapter_ref("ch02").unwrap();
        assert_eq!(r.number.as_deref(), Some("第2章"));
        assert_eq!(r.title, "Two");
        assert!(ctx.chapter_ref("ch09").is_err());
    }

    #[test]
    fn test_image_path_uses_finder() {
        let book = book();
        let ctx = Context::new(&book, book.chapter("ch01").unwrap(), Target::Html).unwrap();
        let item = ctx.image(ImageKind::Numbered, "fig").unwrap();
        assert_eq!(ctx.image_path(item), Some(PathBuf::from("images/ch01/fig.png")));
        assert_eq!(ctx.image_ref("fig").unwrap().number, "1.1");
    }
}
