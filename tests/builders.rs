use bookc::builder::{self, Builder};
use bookc::config::{Config, Target};
use rstest::rstest;

fn render(text: &str, target: Target) -> String {
    bookc::compile(text, &Config::default(), target).unwrap()
}

const SIMPLE: &str = "= T\n\n== S\n\nhello @<b>{x}\n";

#[rstest]
#[case::plaintext(Target::Plaintext, "第1章　T\n1.1　S\nhello x\n")]
#[case::top(Target::Top, "■H1■第1章　T\n■H2■1.1　S\nhello ★x☆\n")]
#[case::markdown(Target::Markdown, "# T\n\n## S\n\nhello **x**\n\n")]
#[case::md2inao(Target::Md2inao, "# T\n\n## S\n\n　hello **x**\n\n")]
#[case::latex(
    Target::Latex,
    "\\chapter{T}\n\\label{chap:ch01}\n\\section{S}\n\\label{sec:1-1}\n\nhello \\reviewbold{x}\n"
)]
#[case::rst(Target::Rst, "=\nT\n=\n\nS\n-\n\nhello **x**\n\n")]
fn test_whole_chapter(#[case] target: Target, #[case] expected: &str) {
    assert_eq!(render(SIMPLE, target), expected);
}

#[test]
fn test_idgxml_chapter() {
    let out = render(SIMPLE, Target::Idgxml);
    assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<doc xmlns:aid="));
    assert!(out.contains(
        "<title aid:pstyle=\"h1\">第1章　T</title><?dtp level=\"1\" section=\"第1章　T\"?>"
    ));
    assert!(out.contains("<title aid:pstyle=\"h2\">1.1　S</title>"));
    assert!(out.ends_with("<p>hello <b>x</b></p></doc>\n"));
}

#[rstest]
#[case::html(Target::Html, "<p>a&lt;b &amp; c_d</p>")]
#[case::idgxml(Target::Idgxml, "<p>a&lt;b &amp; c_d</p>")]
#[case::latex(Target::Latex, "\na\\textless{}b \\& c\\textunderscore{}d\n")]
#[case::rst(Target::Rst, "a<b & c\\_d\n\n")]
#[case::markdown(Target::Markdown, "a<b & c_d\n\n")]
#[case::plaintext(Target::Plaintext, "a<b & c_d\n")]
fn test_paragraph_escaping(#[case] target: Target, #[case] expected: &str) {
    let out = render("= T\n\na<b & c_d\n", target);
    assert!(out.contains(expected), "{}: {:?}", target, out);
}

#[rstest]
#[case::html(Target::Html, "<p class=\"caption\">リスト1.1: Cap</p>")]
#[case::latex(Target::Latex, "\\reviewlistcaption{リスト1.1　Cap}")]
#[case::plaintext(Target::Plaintext, "リスト1.1　Cap\n\nx = 1\n\n")]
#[case::top(Target::Top, "◆→開始:リスト←◆\nリスト1.1　Cap\n\nx = 1\n◆→終了:リスト←◆\n\n")]
#[case::markdown(Target::Markdown, "リスト1.1　Cap\n\n```ruby\nx = 1\n```\n\n")]
#[case::md2inao(Target::Md2inao, "```\n●リスト1.1::Cap\n\nx = 1\n```\n\n")]
fn test_code_list(#[case] target: Target, #[case] expected: &str) {
    let out = render("= T\n\n//list[l1][Cap][ruby]{\nx = 1\n//}\n", target);
    assert!(out.contains(expected), "{}: {:?}", target, out);
}

#[rstest]
#[case::markdown(Target::Markdown, "<ruby>漢字<rt>かんじ</rt></ruby>")]
#[case::md2inao(Target::Md2inao, "{漢字|かんじ}")]
#[case::html(Target::Html, "<ruby>漢字<rp>（</rp><rt>かんじ</rt><rp>）</rp></ruby>")]
#[case::plaintext(Target::Plaintext, "漢字（かんじ）")]
fn test_ruby(#[case] target: Target, #[case] expected: &str) {
    let out = render("= T\n\n@<ruby>{漢字,かんじ}\n", target);
    assert!(out.contains(expected), "{}: {:?}", target, out);
}

#[test]
fn test_markdown_pipe_table() {
    let out = render("= T\n\n//table[t][Cap]{\nA\tB\n------------\n1\t2\n//}\n", Target::Markdown);
    assert!(out.contains("表1.1　Cap\n\n|A|B|\n|:--|:--|\n|1|2|\n\n"));
}

#[test]
fn test_markdown_footnote() {
    let out = render("= T\n\nx@<fn>{n1}\n\n//footnote[n1][note]\n", Target::Markdown);
    assert!(out.contains("x[^n1]\n\n"));
    assert!(out.contains("[^n1]: note\n\n"));
}

#[rstest]
#[case::html(Target::Html)]
#[case::latex(Target::Latex)]
#[case::rst(Target::Rst)]
fn test_escape_round_trip(#[case] target: Target) {
    let b = builder::create(target);
    let raw = r"a\b{c}_d*e|f<g>&h";
    assert_eq!(b.unescape(&b.escape(raw)).as_deref(), Some(raw));
}

#[test]
fn test_latex_numbered_list_block() {
    let out = render("= T\n\n//firstlinenum[10]\n//listnum[l][C]{\na\nb\n//}\n", Target::Latex);
    assert!(out.contains("\\begin{reviewlist}\n10: a\n11: b\n\\end{reviewlist}\n"));
}

#[test]
fn test_top_draft_comment() {
    let config = Config {
        draft: true,
        ..Config::default()
    };
    let out = bookc::compile("= T\n\n@<comment>{fix}\n", &config, Target::Top).unwrap();
    assert!(out.contains("◆→DTP連絡:fix←◆"));
}

#[test]
fn test_markdown_draft_comment() {
    let config = Config {
        draft: true,
        ..Config::default()
    };
    let out = bookc::compile("= T\n\n@<comment>{fix}\n", &config, Target::Markdown).unwrap();
    assert!(out.contains("<!-- fix -->"));
}
