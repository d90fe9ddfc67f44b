pub mod book;
pub mod builder;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod i18n;
pub mod ids;
pub mod index;
pub mod indexer;
pub mod inline;
pub mod ir;
pub mod line_reader;
pub mod preprocess;
pub mod sec_counter;
pub mod syntax;

use book::Book;
use compiler::Compiler;
use config::{Config, Target};
use context::Context;
use error::{CompileError, Result};
use indexmap::IndexMap;

/// Compile a lone chapter text to `target`.
pub fn compile(text: &str, config: &Config, target: Target) -> Result<String> {
    let book = Book::single(config.clone(), "ch01", text)?;
    compile_chapter(&book, "ch01", target)
}

/// Compile one chapter of `book`. Errors abort this chapter only.
pub fn compile_chapter(book: &Book, chapter_id: &str, target: Target) -> Result<String> {
    let chapter = book
        .chapter(chapter_id)
        .ok_or_else(|| CompileError::Config(format!("no such chapter: {}", chapter_id)))?;
    let ctx = Context::new(book, chapter, target)?;
    let mut builder = builder::create(target);

    let output = Compiler::new(&ctx, builder.as_mut()).run()?;
    tracing::debug!(chapter = chapter_id, bytes = output.len(), "chapter compiled");
    Ok(output)
}

/// Compile every chapter in book order, stopping at the first failure.
pub fn compile_book(book: &Book, target: Target) -> Result<IndexMap<String, String>> {
    let mut out = IndexMap::new();
    for chapter in book.chapters() {
        let text = compile_chapter(book, chapter.id(), target)?;
        out.insert(chapter.id().to_string(), text);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use error::ErrorKind;

    #[test]
    fn test_simple_compile() {
        let result = compile("= Title\n\nSome text.\n", &Config::default(), Target::Plaintext).unwrap();
        assert!(result.contains("Title"));
        assert!(result.contains("Some text."));
    }

    #[test]
    fn test_determinism() {
        let input = "= Title\n\nSome text.\n\n * item\n";
        let config = Config::default();
        let r1 = compile(input, &config, Target::Html).unwrap();
        let r2 = compile(input, &config, Target::Html).unwrap();
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_missing_chapter_is_a_config_error() {
        let book = Book::single(Config::default(), "ch01", "= A\n").unwrap();
        let err = compile_chapter(&book, "ch99", Target::Html).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_compile_book_keeps_chapter_order() {
        let book = Book::single(Config::default(), "intro", "= Intro\n").unwrap();
        let out = compile_book(&book, Target::Top).unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["intro"]);
    }
}
