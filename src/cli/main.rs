use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use stock_meta_ai::ai::{Generated, Mode};
use stock_meta_ai::{config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "stock-meta-ai",
    version,
    about = "Generate stock media titles, descriptions, keywords, categories and captions for images with AI"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// What to generate
    #[arg(short, long, value_enum, default_value_t = Mode::Metadata)]
    mode: Mode,

    /// Gemini model identifier (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// Give up on an image after this many attempts (default: retry forever)
    #[arg(long, value_name = "N")]
    max_attempts: Option<u32>,

    /// Target title length in characters
    #[arg(long, value_name = "CHARS")]
    title_length: Option<u32>,

    /// Target description length in characters
    #[arg(long, value_name = "CHARS")]
    desc_length: Option<u32>,

    /// Target and maximum number of keywords
    #[arg(long, value_name = "N")]
    keywords_count: Option<usize>,

    /// Target caption length in words
    #[arg(long, value_name = "WORDS")]
    desc_words: Option<u32>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Fold command-line overrides into the loaded config.
    fn apply_overrides(&self, config: &mut config::Config) {
        if let Some(ref model) = self.model {
            config.gemini.model = model.clone();
        }
        if self.max_attempts.is_some() {
            config.retry.max_attempts = self.max_attempts;
        }
        let settings = &mut config.settings;
        if let Some(n) = self.title_length {
            settings.title_length = n;
        }
        if let Some(n) = self.desc_length {
            settings.desc_length = n;
        }
        if let Some(n) = self.keywords_count {
            settings.keywords_count = n;
        }
        if let Some(n) = self.desc_words {
            settings.desc_words = n;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let mut config = config::Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    let model = pipeline::build_model(&config)?;

    // Ctrl-C aborts the request in flight and stops the run.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, cancelling...");
                cancel.cancel();
            }
        });
    }

    log::info!(
        "Found {} image(s); mode: {:?}, model: {}",
        images.len(),
        cli.mode,
        config.gemini.model
    );

    let mut results = Vec::new();
    let total = images.len();

    // One request in flight at a time.
    for (i, image_path) in images.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        log::info!("[{}/{}] Processing: {}", i + 1, total, image_path.display());

        let result = pipeline::process_image(image_path, &model, &config, cli.mode, &cancel, |delay| {
            log::info!("  Retrying in {}s...", delay.as_secs());
        })
        .await;

        match (&result.result, &result.error) {
            (_, Some(err)) => log::error!("  Error: {err}"),
            (Some(generated), None) if !cli.json => print_generated(generated),
            _ => {}
        }

        results.push(result);
    }

    // JSON output
    if cli.json {
        let json_results: Vec<serde_json::Value> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "path": r.path.display().to_string(),
                    "mode": r.mode,
                    "result": r.result,
                    "retries": r.retries,
                    "error": r.error,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    // Summary
    let success = results.iter().filter(|r| r.error.is_none()).count();
    let failed = results.len() - success;
    log::info!("Done: {success} succeeded, {failed} failed out of {total} images");

    Ok(())
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 60;
/// Indent for continuation lines (tag column width + " : " + 2 leading spaces).
const INDENT: &str = "                ";

fn print_generated(generated: &Generated) {
    println!();
    println!("  {BOLD}Generated:{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(72));
    match generated {
        Generated::Metadata(m) => {
            print_row("Title", &m.title);
            print_row("Description", &m.description);
            print_row("Keywords", &m.keywords.join(", "));
            print_row("Category", &m.category);
            println!("  {DIM}{} keywords{RESET}", m.keywords.len());
        }
        Generated::Caption(c) => {
            print_row("Description", &c.description);
            let words = c.description.split_whitespace().count();
            println!("  {DIM}{words} words{RESET}");
        }
    }
    println!("  {DIM}{}{RESET}", "─".repeat(72));
    println!();
}

/// Print a single row in the result table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<11}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_text_breaks_on_words() {
        let lines = wrap_text("red bike isolated on white background", 12);
        assert_eq!(lines, ["red bike", "isolated on", "white", "background"]);
    }

    #[test]
    fn wrap_text_empty() {
        assert_eq!(wrap_text("", 10), [""]);
    }

    #[test]
    fn overrides_apply_to_config() {
        let cli = Cli::parse_from([
            "stock-meta-ai",
            "--mode",
            "caption",
            "--model",
            "gemini-x",
            "--keywords-count",
            "12",
            "--max-attempts",
            "4",
            "a.jpg",
        ]);
        let mut config = config::Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(cli.mode, Mode::Caption);
        assert_eq!(config.gemini.model, "gemini-x");
        assert_eq!(config.settings.keywords_count, 12);
        assert_eq!(config.settings.title_length, 80);
        assert_eq!(config.retry.max_attempts, Some(4));
    }
}
