use bookc::book::Book;
use bookc::config::{Config, Target};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bookc",
    about = "Book markup compiler: render chapters to HTML, LaTeX, EPUB, IDGXML, text, RST or Markdown"
)]
struct Cli {
    /// Book directory (with catalog.yml) or a single chapter file
    source: PathBuf,

    /// Output format: html, latex, epub, idgxml, plaintext, rst, markdown, top, md2inao
    #[arg(short, long, default_value = "html")]
    target: String,

    /// Compile only this chapter id
    #[arg(long)]
    chapter: Option<String>,

    /// Output directory (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render comments
    #[arg(long)]
    draft: bool,

    /// Message language (default: from config or ja)
    #[arg(long)]
    language: Option<String>,

    /// Number headlines down to this level
    #[arg(long)]
    secnolevel: Option<usize>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,
}

fn die(msg: &str) -> ! {
    eprintln!("error: {}", msg);
    process::exit(1);
}

fn load_config(path: &PathBuf) -> Config {
    let text = fs::read_to_string(path).unwrap_or_else(|e| die(&format!("cannot read config: {}", e)));
    serde_json::from_str(&text).unwrap_or_else(|e| die(&format!("invalid config JSON: {}", e)))
}

fn load_book(source: &Path, config: Config) -> Book {
    let loaded = if source.is_dir() {
        Book::load(source, config)
    } else {
        let id = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_else(|| die(&format!("bad chapter file name: {}", source.display())));
        let text = fs::read_to_string(source)
            .unwrap_or_else(|e| die(&format!("cannot read {}: {}", source.display(), e)));
        Book::single(config, id, &text)
    };
    loaded.unwrap_or_else(|e| die(&e.to_string()))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bookc=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config
    let mut config = if let Some(ref config_path) = cli.config {
        load_config(config_path)
    } else {
        let defaults = ["bookc.config.json", "config/bookc.config.json"];
        let mut loaded = None;
        for p in &defaults {
            let path = PathBuf::from(p);
            if path.is_file() {
                loaded = Some(load_config(&path));
                break;
            }
        }
        loaded.unwrap_or_default()
    };

    // CLI overrides
    if cli.draft {
        config.draft = true;
    }
    if let Some(ref language) = cli.language {
        config.language = language.clone();
    }
    if let Some(n) = cli.secnolevel {
        config.secnolevel = n;
    }

    let target: Target = cli.target.parse().unwrap_or_else(|e: bookc::error::CompileError| die(&e.to_string()));
    let book = load_book(&cli.source, config);

    let ids: Vec<String> = match cli.chapter {
        Some(ref id) => vec![id.clone()],
        None => book.chapters().map(|c| c.id().to_string()).collect(),
    };
    if ids.is_empty() {
        die("no chapters found");
    }

    if let Some(ref dir) = cli.output {
        fs::create_dir_all(dir).unwrap_or_else(|e| die(&format!("cannot create {}: {}", dir.display(), e)));
    }

    let mut failed = 0;
    for id in &ids {
        let result = match bookc::compile_chapter(&book, id, target) {
            Ok(result) => result,
            Err(e) => {
                eprintln!("error: {}", e);
                failed += 1;
                continue;
            }
        };
        match cli.output {
            Some(ref dir) => {
                let path = dir.join(format!("{}.{}", id, target.extension()));
                fs::write(&path, &result)
                    .unwrap_or_else(|e| die(&format!("cannot write {}: {}", path.display(), e)));
                eprintln!("compiled {} -> {}", id, path.display());
            }
            None => print!("{}", result),
        }
    }

    if failed > 0 {
        die(&format!("{} of {} chapter(s) failed", failed, ids.len()));
    }
}
