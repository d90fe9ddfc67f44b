use crate::error::CompileError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Deepest headline level the markup accepts (`======`).
pub const MAX_HEADLINE_LEVEL: usize = 6;

/// Output format a chapter is rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Html,
    Latex,
    Epub,
    Idgxml,
    Plaintext,
    Rst,
    Markdown,
    Top,
    Md2inao,
}

impl Target {
    pub const ALL: [Target; 9] = [
        Target::Html,
        Target::Latex,
        Target::Epub,
        Target::Idgxml,
        Target::Plaintext,
        Target::Rst,
        Target::Markdown,
        Target::Top,
        Target::Md2inao,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Target::Html => "html",
            Target::Latex => "latex",
            Target::Epub => "epub",
            Target::Idgxml => "idgxml",
            Target::Plaintext => "plaintext",
            Target::Rst => "rst",
            Target::Markdown => "markdown",
            Target::Top => "top",
            Target::Md2inao => "md2inao",
        }
    }

    /// Names this target answers to in `@<raw>{|html,latex|...}` target lists.
    pub fn raw_names(&self) -> &'static [&'static str] {
        match self {
            Target::Epub => &["epub", "html"],
            Target::Md2inao => &["md2inao", "markdown"],
            Target::Plaintext => &["plaintext", "text"],
            Target::Html => &["html"],
            Target::Latex => &["latex"],
            Target::Idgxml => &["idgxml"],
            Target::Rst => &["rst"],
            Target::Markdown => &["markdown"],
            Target::Top => &["top"],
        }
    }

    /// Extension of the per-chapter output file.
    pub fn extension(&self) -> &'static str {
        match self {
            Target::Html => "html",
            Target::Epub => "xhtml",
            Target::Latex => "tex",
            Target::Idgxml => "xml",
            Target::Plaintext | Target::Top => "txt",
            Target::Rst => "rst",
            Target::Markdown | Target::Md2inao => "md",
        }
    }

    /// Sub-directory of the image directory searched first for this target.
    pub fn image_dir(&self) -> &'static str {
        match self {
            Target::Epub => "html",
            Target::Md2inao => "markdown",
            other => other.name(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let low = s.trim().to_lowercase();
        Target::ALL
            .iter()
            .copied()
            .find(|t| t.name() == low || (low == "text" && *t == Target::Plaintext))
            .ok_or_else(|| CompileError::Config(format!("unknown target: {}", s)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_secnolevel")]
    pub secnolevel: usize,

    #[serde(default = "default_toclevel")]
    pub toclevel: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default)]
    pub draft: bool,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub messages: HashMap<String, String>,

    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    #[serde(default = "default_image_types")]
    pub image_types: Vec<String>,

    #[serde(default = "default_htmlext")]
    pub htmlext: String,

    #[serde(default = "default_epubversion")]
    pub epubversion: u32,

    #[serde(default)]
    pub join_lines_by_lang: bool,

    #[serde(default)]
    pub footnotetext: bool,

    #[serde(default = "default_chapterlink")]
    pub chapterlink: bool,

    #[serde(default = "default_bib_file")]
    pub bib_file: String,
}

fn default_secnolevel() -> usize {
    2
}
fn default_toclevel() -> usize {
    3
}
fn default_max_depth() -> usize {
    5
}
fn default_language() -> String {
    "ja".to_string()
}
fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}
fn default_image_types() -> Vec<String> {
    [
        ".ai", ".psd", ".eps", ".pdf", ".tif", ".tiff", ".png", ".bmp", ".jpg", ".jpeg", ".gif",
        ".svg",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_htmlext() -> String {
    "html".to_string()
}
fn default_epubversion() -> u32 {
    3
}
fn default_chapterlink() -> bool {
    true
}
fn default_bib_file() -> String {
    "bib".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            secnolevel: default_secnolevel(),
            toclevel: default_toclevel(),
            max_depth: default_max_depth(),
            draft: false,
            language: default_language(),
            messages: HashMap::new(),
            image_dir: default_image_dir(),
            image_types: default_image_types(),
            htmlext: default_htmlext(),
            epubversion: default_epubversion(),
            join_lines_by_lang: false,
            footnotetext: false,
            chapterlink: default_chapterlink(),
            bib_file: default_bib_file(),
        }
    }
}

impl Config {
    /// Reject settings no chapter can be compiled with.
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.secnolevel > MAX_HEADLINE_LEVEL {
            return Err(CompileError::Config(format!(
                "secnolevel {} exceeds the deepest headline level {}",
                self.secnolevel, MAX_HEADLINE_LEVEL
            )));
        }
        if self.toclevel > MAX_HEADLINE_LEVEL {
            return Err(CompileError::Config(format!(
                "toclevel {} exceeds the deepest headline level {}",
                self.toclevel, MAX_HEADLINE_LEVEL
            )));
        }
        if self.max_depth == 0 {
            return Err(CompileError::Config("max_depth must be at least 1".to_string()));
        }
        if !crate::i18n::Locale::is_supported(&self.language) {
            return Err(CompileError::Config(format!(
                "unsupported language: {}",
                self.language
            )));
        }
        if self.epubversion != 2 && self.epubversion != 3 {
            return Err(CompileError::Config(format!(
                "epubversion must be 2 or 3, got {}",
                self.epubversion
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.secnolevel, 2);
        assert_eq!(config.toclevel, 3);
        assert_eq!(config.max_depth, 5);
        assert!(!config.draft);
        assert_eq!(config.language, "ja");
        assert_eq!(config.image_dir, PathBuf::from("images"));
        assert_eq!(config.image_types[0], ".ai");
        assert_eq!(config.htmlext, "html");
        assert_eq!(config.epubversion, 3);
        assert!(config.chapterlink);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let json = r#"{"secnolevel": 3, "draft": true}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.secnolevel, 3);
        assert!(config.draft);
        assert_eq!(config.language, "ja");
        assert_eq!(config.image_types.len(), 12);
    }

    #[test]
    fn test_deserialize_messages() {
        let json = r#"{"language": "en", "messages": {"list": "Code "}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.language, "en");
        assert_eq!(config.messages.get("list"), Some(&"Code ".to_string()));
    }

    #[test]
    fn test_validate_rejects_deep_secnolevel() {
        let mut config = Config::default();
        config.secnolevel = 9;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_validate_rejects_unknown_language() {
        let mut config = Config::default();
        config.language = "tlh".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_epub_version() {
        let mut config = Config::default();
        config.epubversion = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_from_str() {
        assert_eq!("HTML".parse::<Target>().unwrap(), Target::Html);
        assert_eq!("text".parse::<Target>().unwrap(), Target::Plaintext);
        assert_eq!("md2inao".parse::<Target>().unwrap(), Target::Md2inao);
        assert!("docx".parse::<Target>().is_err());
    }

    #[test]
    fn test_target_raw_names() {
        assert_eq!(Target::Html.raw_names(), &["html"]);
        assert!(Target::Epub.raw_names().contains(&"html"));
        assert_eq!(Target::Latex.raw_names(), &["latex"]);
        assert_eq!(Target::Top.raw_names(), &["top"]);
    }
}
