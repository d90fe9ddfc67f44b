use bookc::book::{Book, Catalog};
use bookc::config::{Config, Target};
use bookc::error::{CompileError, ErrorKind, Result};
use std::path::PathBuf;

fn html(text: &str) -> String {
    bookc::compile(text, &Config::default(), Target::Html).unwrap()
}

fn compile_err(text: &str) -> CompileError {
    bookc::compile(text, &Config::default(), Target::Html).unwrap_err()
}

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
fn test_headline_numbering() {
    let out = html("= Title\n\n== Intro\n\n== Next\n");
    assert!(out.contains("<h1><a id=\"h1\"></a><span class=\"secno\">第1章　</span>Title</h1>\n"));
    assert!(out.contains("<h2><a id=\"h1-1\"></a><span class=\"secno\">1.1　</span>Intro</h2>\n"));
    assert!(out.contains("<h2><a id=\"h1-2\"></a><span class=\"secno\">1.2　</span>Next</h2>\n"));
    assert!(out.contains("<title>Title</title>"));
}

#[test]
fn test_secnolevel_hides_deeper_numbers() {
    let config = Config {
        secnolevel: 1,
        ..Config::default()
    };
    let out = bookc::compile("= Title\n\n== Intro\n", &config, Target::Html).unwrap();
    assert!(out.contains("<h2><a id=\"h1-1\"></a>Intro</h2>"));
}

#[test]
fn test_nonum_headline() {
    let out = html("= Title\n\n==[nonum] Extra\n");
    assert!(out.contains("<h2 id=\"ch01_nonum1\">Extra</h2>"));
}

#[test]
fn test_list_reference_before_definition() {
    let out = html("= T\n\n@<list>{sample}\n\n//list[sample][Sample]{\nputs 1\n//}\n");
    assert!(out.contains(
        "<p><span class=\"listref\"><a href=\"./ch01.html#sample\">リスト1.1</a></span></p>"
    ));
    assert!(out.contains(
        "<div id=\"sample\" class=\"caption-code\">\n<p class=\"caption\">リスト1.1: Sample</p>\n<pre class=\"list\">puts 1\n</pre>\n</div>\n"
    ));
}

#[test]
fn test_footnote() {
    let text = "= T\n\ntext@<fn>{a}\n\n//footnote[a][note]\n";
    let out = html(text);
    assert!(out.contains("text<a id=\"fnb-a\" href=\"#fn-a\" class=\"noteref\">*1</a>"));
    assert!(out.contains("<div class=\"footnote\" id=\"fn-a\"><p class=\"footnote\">[*1] note</p></div>"));

    let epub = bookc::compile(text, &Config::default(), Target::Epub).unwrap();
    assert!(epub.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(epub.contains("epub:type=\"footnote\""));
    assert!(epub.contains("epub:type=\"noteref\""));
}

#[test]
fn test_text_is_escaped() {
    let out = html("= T\n\na < b & \"c\"\n");
    assert!(out.contains("<p>a &lt; b &amp; &quot;c&quot;</p>"));
}

#[test]
fn test_table_with_header() {
    let out = html("= T\n\n//table[t1][Cap]{\nA\tB\n------------\n1\t2\n//}\n");
    assert!(out.contains("<p class=\"caption\">表1.1: Cap</p>"));
    assert!(out.contains("<tr><th>A</th><th>B</th></tr>"));
    assert!(out.contains("<tr><td>1</td><td>2</td></tr>"));
}

#[test]
fn test_nested_bullets() {
    let out = html("= T\n\n * a\n ** b\n * c\n");
    assert!(out.contains("<ul>\n<li>a\n<ul>\n<li>b</li>\n</ul>\n</li>\n<li>c</li>\n</ul>\n"));
}

#[test]
fn test_ordered_list_keeps_start_number() {
    let out = html("= T\n\n 3. x\n 4. y\n");
    assert!(out.contains("<ol start=\"3\">\n<li>x</li>\n<li>y</li>\n</ol>\n"));
}

#[test]
fn test_bullet_jump_is_a_syntax_error() {
    let err = compile_err("= T\n\n * a\n *** b\n");
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn test_comment_only_in_draft() {
    let text = "= T\n\n//comment[check this]\n";
    assert!(!html(text).contains("draft-comment"));

    let config = Config {
        draft: true,
        ..Config::default()
    };
    let out = bookc::compile(text, &config, Target::Html).unwrap();
    assert!(out.contains("<div class=\"draft-comment\">check this</div>"));
}

#[test]
fn test_unterminated_block() {
    let err = compile_err("= T\n\n//list[a][b]{\nx\n");
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert!(err.to_string().contains("//list"));
}

#[test]
fn test_unknown_directive() {
    let err = compile_err("= T\n\n//bogus[x]\n");
    assert_eq!(err.kind(), ErrorKind::UnknownConstruct);
    assert!(err.to_string().contains("bogus"));
}

#[test]
fn test_unknown_inline() {
    let err = compile_err("= T\n\n@<nope>{x}\n");
    assert_eq!(err.kind(), ErrorKind::UnknownConstruct);
    assert!(err.to_string().contains("nope"));
}

#[test]
fn test_capitalised_inline_name_is_unknown() {
    let err = compile_err("= T\n\n@<B>{x}\n");
    assert_eq!(err.kind(), ErrorKind::UnknownConstruct);
    assert!(err.to_string().contains("B"));
}

#[test]
fn test_unknown_headline_tag() {
    let err = compile_err("= T\n\n==[bogus] x\n");
    assert_eq!(err.kind(), ErrorKind::UnknownConstruct);
}

#[test]
fn test_missing_reference_points_at_line() {
    let err = compile_err("= T\n\n@<list>{missing}\n");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.location().map(|l| l.line), Some(3));
}

#[test]
fn test_duplicate_id_is_ambiguous() {
    let err = compile_err("= T\n\n//list[dup][a]{\nx\n//}\n\n//list[dup][b]{\ny\n//}\n\n@<list>{dup}\n");
    assert_eq!(err.kind(), ErrorKind::Ambiguous);
}

#[test]
fn test_unsupported_inline_is_not_implemented() {
    let err = compile_err("= T\n\n@<pageref>{x}\n");
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
}

#[test]
fn test_argument_count_checked() {
    let err = compile_err("= T\n\n//list[only-one]{\nx\n//}\n");
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn test_cross_chapter_references() {
    let files = [
        (
            "ch01.re",
            "= One\n\n=={intro} Intro\n\n//list[sample][S]{\nx\n//}\n",
        ),
        (
            "ch02.re",
            "= Two\n\n@<list>{ch01|sample} @<hd>{ch01|intro} @<chap>{ch01} @<title>{ch01}\n",
        ),
    ];
    let catalog = Catalog::from_files(&["ch01.re", "ch02.re"]);
    let book = Book::from_catalog(Config::default(), &catalog, texts(&files)).unwrap();
    let out = bookc::compile_chapter(&book, "ch02", Target::Html).unwrap();
    assert!(out.contains("<a href=\"./ch01.html#sample\">リスト1.1</a>"));
    assert!(out.contains("<a href=\"./ch01.html#h1-1\">「1.1 Intro」</a>"));
    assert!(out.contains(" 第1章 "));
    assert!(out.contains("<a href=\"./ch01.html\">One</a>"));
}

#[test]
fn test_appendix_numbering() {
    let files = [
        ("ch01.re", "= One\n"),
        ("app.re", "= App\n\n//list[x][X]{\na\n//}\n"),
    ];
    let catalog = Catalog::parse("CHAPS:\n  - ch01.re\nAPPENDIX:\n  - app.re\n").unwrap();
    let book = Book::from_catalog(Config::default(), &catalog, texts(&files)).unwrap();
    let out = bookc::compile_chapter(&book, "app", Target::Plaintext).unwrap();
    assert_eq!(out, "付録A　App\nリストA.1　X\n\na\n\n");
}

#[test]
fn test_compile_book_covers_every_chapter() {
    let files = [("a.re", "= A\n"), ("b.re", "= B\n")];
    let catalog = Catalog::from_files(&["a.re", "b.re"]);
    let book = Book::from_catalog(Config::default(), &catalog, texts(&files)).unwrap();
    let out = bookc::compile_book(&book, Target::Markdown).unwrap();
    assert_eq!(out["a"], "# A\n\n");
    assert_eq!(out["b"], "# B\n\n");
}

#[test]
fn test_missing_image_with_body_renders_dummy() {
    let out = html("= T\n\n//image[fig][Cap]{\nASCII art\n//}\n");
    assert!(out.contains("<pre class=\"dummyimage\">\nASCII art\n</pre>"));
    assert!(out.contains("図1.1: Cap"));
}

#[test]
fn test_missing_image_without_body_is_not_found() {
    let err = compile_err("= T\n\n//image[fig][Cap]\n");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_image_found_in_listing() {
    let book = Book::single(Config::default(), "ch01", "= T\n\n//image[fig][Cap]\n")
        .unwrap()
        .with_image_entries([PathBuf::from("images/ch01/fig.png")]);
    let out = bookc::compile_chapter(&book, "ch01", Target::Html).unwrap();
    assert!(out.contains("<img src=\"images/ch01/fig.png\" alt=\"Cap\" />"));
}

#[test]
fn test_raw_and_embed_follow_target() {
    let text = "= T\n\n//raw[|html|<hr class=\"x\" />]\n\n//embed[latex]{\n\\relax\n//}\n";
    let out = html(text);
    assert!(out.contains("<hr class=\"x\" />"));
    assert!(!out.contains("\\relax"));

    let latex = bookc::compile(text, &Config::default(), Target::Latex).unwrap();
    assert!(latex.contains("\\relax"));
    assert!(!latex.contains("<hr"));
}

#[test]
fn test_column_and_reference() {
    let out = html("= T\n\n===[column] Aside\nbody\n===[/column]\n\n@<column>{column-1}\n");
    assert!(out.contains("<div class=\"column\">\n\n<h3><a id=\"column-1\"></a>Aside</h3>\n<p>body</p>\n</div>\n"));
    assert!(out.contains("<a href=\"./ch01.html#column-1\" class=\"columnref\">コラム「Aside」</a>"));
}

#[test]
fn test_column_closed_by_next_headline() {
    let out = html("= T\n\n==[column] Aside\nbody\n\n== Next\n");
    let close = out.find("</div>").unwrap();
    let next = out.find("Next</h2>").unwrap();
    assert!(close < next);
}

#[test]
fn test_column_headlines_do_not_advance_section_numbers() {
    let config = Config {
        secnolevel: 5,
        ..Config::default()
    };
    let text = "= ch\n== sec\n=== sub\n===[column] c\n==== inside\n===[/column]\n==== deeper\n\n@<hd>{deeper}\n";
    let out = bookc::compile(text, &config, Target::Plaintext).unwrap();
    assert!(out.contains("\ninside\n"), "{:?}", out);
    assert!(!out.contains("1.1.1.1　inside"));
    assert!(out.contains("1.1.1.1　deeper\n"));
    assert!(out.contains("「1.1.1.1 deeper」"));

    let html = bookc::compile(text, &config, Target::Html).unwrap();
    assert!(html.contains("<h4><a id=\"hcolumn-1-1\"></a>inside</h4>"));
}

#[test]
fn test_empty_headline_is_not_numbered() {
    let out = bookc::compile("= ch\n=={x}\n== b\n\n@<hd>{b}\n", &Config::default(), Target::Plaintext)
        .unwrap();
    assert!(out.contains("1.1　b\n"), "{:?}", out);
    assert!(out.contains("「1.1 b」"));
}

#[test]
fn test_stray_column_close_is_an_error() {
    let err = compile_err("= T\n\n==[/column]\n");
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn test_unclosed_beginchild() {
    let err = compile_err("= T\n\n//beginchild\n\ntext\n");
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn test_endnotes_printed_in_place() {
    let out = html("= T\n\nsee@<endnote>{e1}\n\n//endnote[e1][later]\n\n//printendnotes\n");
    assert!(out.contains("<a id=\"endnoteb-e1\" href=\"#endnote-e1\" class=\"noteref\">(1)</a>"));
    assert!(out.contains("<p class=\"endnote\">[(1)] later</p>"));
}

#[test]
fn test_bibliography_is_book_wide() {
    let book = Book::single(Config::default(), "ch01", "= T\n\nsee @<bib>{knuth}\n")
        .unwrap()
        .with_bib("= Bib\n\n//bibpaper[knuth][TAOCP]\n")
        .unwrap();
    let out = bookc::compile_chapter(&book, "ch01", Target::Plaintext).unwrap();
    assert!(out.contains("see [1]"));
}

#[test]
fn test_invalid_config_rejected_before_compiling() {
    let config = Config {
        language: "xx".to_string(),
        ..Config::default()
    };
    let err = bookc::compile("= T\n", &config, Target::Html).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_control_character_rejected() {
    let err = compile_err("= T\n\nbad\u{7}char\n");
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.location().map(|l| l.line), Some(3));
}
