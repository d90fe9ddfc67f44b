//! Message catalog for captions and numbering labels.
//!
//! A [`Locale`] is built once per compile run from the configuration and handed to
//! every builder through the render context.

use crate::config::Config;
use crate::error::CompileError;
use std::collections::HashMap;

const JA: &[(&str, &str)] = &[
    ("list", "リスト"),
    ("table", "表"),
    ("image", "図"),
    ("equation", "式"),
    ("format_number", "%s.%d"),
    ("format_number_header", "%s.%d"),
    ("format_number_without_chapter", "%d"),
    ("format_number_header_without_chapter", "%d"),
    ("caption_prefix", "　"),
    ("caption_prefix_idgxml", "　"),
    ("html_caption_prefix", ": "),
    ("chapter", "第%d章"),
    ("chapter_postfix", "　"),
    ("appendix", "付録%s"),
    ("part", "第%s部"),
    ("column", "コラム「%s」"),
    ("columnname", "コラム"),
    ("hd_quote", "「%s %s」"),
    ("hd_quote_without_number", "「%s」"),
    ("chapter_quote", "「%s」"),
    ("chapter_quote_without_number", "「%s」"),
    ("bib_quote", "[%s]"),
    ("footnote_mark", "注"),
    ("endnote_mark", "後注"),
    ("note", "ノート"),
    ("memo", "メモ"),
    ("tip", "TIP"),
    ("info", "情報"),
    ("warning", "警告"),
    ("important", "重要"),
    ("caution", "注意"),
    ("notice", "注意"),
];

const EN: &[(&str, &str)] = &[
    ("list", "List "),
    ("table", "Table "),
    ("image", "Figure "),
    ("equation", "Equation "),
    ("format_number", "%s.%d"),
    ("format_number_header", "%s.%d"),
    ("format_number_without_chapter", "%d"),
    ("format_number_header_without_chapter", "%d"),
    ("caption_prefix", " "),
    ("caption_prefix_idgxml", " "),
    ("html_caption_prefix", ": "),
    ("chapter", "Chapter %d"),
    ("chapter_postfix", ". "),
    ("appendix", "Appendix %s"),
    ("part", "Part %s"),
    ("column", "Column %s"),
    ("columnname", "Column"),
    ("hd_quote", "\"%s %s\""),
    ("hd_quote_without_number", "\"%s\""),
    ("chapter_quote", "\"%s\""),
    ("chapter_quote_without_number", "\"%s\""),
    ("bib_quote", "[%s]"),
    ("footnote_mark", "Note"),
    ("endnote_mark", "Endnote"),
    ("note", "Note"),
    ("memo", "Memo"),
    ("tip", "Tip"),
    ("info", "Information"),
    ("warning", "Warning"),
    ("important", "Important"),
    ("caution", "Caution"),
    ("notice", "Notice"),
];

#[derive(Debug, Clone)]
pub struct Locale {
    language: String,
    messages: HashMap<String, String>,
}

impl Locale {
    pub fn is_supported(language: &str) -> bool {
        Self::table(language).is_some()
    }

    fn table(language: &str) -> Option<&'static [(&'static str, &'static str)]> {
        match language {
            "ja" => Some(JA),
            "en" => Some(EN),
            _ => None,
        }
    }

    pub fn new(language: &str) -> Result<Self, CompileError> {
        let table = Self::table(language)
            .ok_or_else(|| CompileError::Config(format!("unsupported language: {}", language)))?;
        Ok(Locale {
            language: language.to_string(),
            messages: table
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    /// Locale for `config.language` with `config.messages` layered on top.
    pub fn from_config(config: &Config) -> Result<Self, CompileError> {
        let mut locale = Self::new(&config.language)?;
        for (k, v) in &config.messages {
            locale.messages.insert(k.clone(), v.clone());
        }
        Ok(locale)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Look up `key` and substitute `%s`/`%d` placeholders from `args` in order.
    /// Unknown keys render as the key itself.
    pub fn t(&self, key: &str, args: &[&str]) -> String {
        let template = self.messages.get(key).map_or(key, |s| s.as_str());
        let mut out = String::with_capacity(template.len());
        let mut rest = args.iter();
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '%' {
                match chars.peek() {
                    Some('s') | Some('d') => {
                        chars.next();
                        out.push_str(rest.next().copied().unwrap_or(""));
                        continue;
                    }
                    Some('%') => {
                        chars.next();
                        out.push('%');
                        continue;
                    }
                    _ => {}
                }
            }
            out.push(c);
        }
        out
    }

    /// `1.2` when the chapter has a number label, `2` otherwise.
    pub fn format_number(&self, chapter: Option<&str>, n: usize) -> String {
        let n = n.to_string();
        match chapter {
            Some(label) => self.t("format_number", &[label, &n]),
            None => self.t("format_number_without_chapter", &[&n]),
        }
    }

    /// Same as [`format_number`](Self::format_number) but for caption headers.
    pub fn format_number_header(&self, chapter: Option<&str>, n: usize) -> String {
        let n = n.to_string();
        match chapter {
            Some(label) => self.t("format_number_header", &[label, &n]),
            None => self.t("format_number_header_without_chapter", &[&n]),
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale {
            language: "ja".to_string(),
            messages: JA
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution() {
        let locale = Locale::new("ja").unwrap();
        assert_eq!(locale.t("chapter", &["3"]), "第3章");
        assert_eq!(locale.t("hd_quote", &["1.2", "intro"]), "「1.2 intro」");
    }

    #[test]
    fn test_unknown_key_is_echoed() {
        let locale = Locale::default();
        assert_eq!(locale.t("no_such_key", &[]), "no_such_key");
    }

    #[test]
    fn test_format_number() {
        let locale = Locale::default();
        assert_eq!(locale.format_number(Some("1"), 2), "1.2");
        assert_eq!(locale.format_number(Some("A"), 1), "A.1");
        assert_eq!(locale.format_number(None, 4), "4");
    }

    #[test]
    fn test_english_table() {
        let locale = Locale::new("en").unwrap();
        assert_eq!(locale.t("list", &[]), "List ");
        assert_eq!(locale.t("chapter", &["1"]), "Chapter 1");
    }

    #[test]
    fn test_config_overrides() {
        let mut config = Config::default();
        config.messages.insert("list".to_string(), "コード".to_string());
        let locale = Locale::from_config(&config).unwrap();
        assert_eq!(locale.t("list", &[]), "コード");
        assert_eq!(locale.t("table", &[]), "表");
    }

    #[test]
    fn test_unsupported_language() {
        assert!(Locale::new("xx").is_err());
        assert!(Locale::is_supported("en"));
    }

    #[test]
    fn test_literal_percent() {
        let mut config = Config::default();
        config.messages.insert("rate".to_string(), "%d%%".to_string());
        let locale = Locale::from_config(&config).unwrap();
        assert_eq!(locale.t("rate", &["50"]), "50%");
    }
}
