use bookc::builder;
use bookc::config::{Config, Target};
use proptest::prelude::*;

proptest! {
    #[test]
    fn nested_styles_are_balanced(word in "[a-z]{1,8}", depth in 0usize..6) {
        let text = format!("{}{}{}", "@<b>{".repeat(depth), word, "}".repeat(depth));
        let out = bookc::compile(&format!("= T\n\n{}\n", text), &Config::default(), Target::Plaintext).unwrap();
        let expected_tail = format!("\n{}\n", word);
        prop_assert!(out.ends_with(&expected_tail));

        let html = bookc::compile(&format!("= T\n\n{}\n", text), &Config::default(), Target::Html).unwrap();
        prop_assert_eq!(html.matches("<b>").count(), depth);
        prop_assert_eq!(html.matches("</b>").count(), depth);
    }

    #[test]
    fn unbalanced_braces_are_rejected(word in "[a-z]{1,8}", depth in 1usize..6) {
        let text = format!("= T\n\n{}{}\n", "@<b>{".repeat(depth), word);
        prop_assert!(bookc::compile(&text, &Config::default(), Target::Html).is_err());
    }

    #[test]
    fn lists_are_numbered_in_order(count in 1usize..12) {
        let mut text = String::from("= T\n\n");
        for i in 1..=count {
            text.push_str(&format!("//list[l{}][c]{{\nx\n//}}\n\n", i));
        }
        for i in 1..=count {
            text.push_str(&format!("@<list>{{l{}}}\n\n", i));
        }
        let out = bookc::compile(&text, &Config::default(), Target::Plaintext).unwrap();
        let mut last = 0;
        for i in 1..=count {
            let caption = format!("リスト1.{}　c\n", i);
            let pos = out[last..].find(&caption).map(|p| p + last);
            prop_assert!(pos.is_some(), "missing {}", caption);
            last = pos.unwrap_or(last) + caption.len();
        }
        for i in 1..=count {
            let label = format!("リスト1.{}\n", i);
            prop_assert!(out.contains(&label));
        }
    }

    #[test]
    fn section_anchors_follow_headline_order(sections in 1usize..8) {
        let mut text = String::from("= T\n\n");
        for i in 1..=sections {
            text.push_str(&format!("== S{}\n\n", i));
        }
        let out = bookc::compile(&text, &Config::default(), Target::Html).unwrap();
        for i in 1..=sections {
            let expected = format!("<a id=\"h1-{}\"></a>", i);
            prop_assert!(out.contains(&expected));
        }
    }

    #[test]
    fn escape_then_unescape_is_identity(raw in "[ -~]{0,40}") {
        for target in [Target::Html, Target::Latex, Target::Rst] {
            let b = builder::create(target);
            prop_assert_eq!(b.unescape(&b.escape(&raw)), Some(raw.clone()));
        }
    }
}
