use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

pub const DEFAULT_DATABASE: &str = "campus-books.sqlite3";

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh the book catalog from the configured pages.
    Scrape(ScrapeArgs),
    /// Show how many books are stored and which one was added last.
    Status(StatusArgs),
    /// List stored books filtered by category and price.
    Recommend(RecommendArgs),
    /// Generate a short summary for a stored book.
    Summary(SummaryArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// SQLite database file (created if missing).
    #[arg(long, default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// YAML catalog config (sources, selectors, timeout, refresh mode).
    #[arg(long)]
    pub catalog_config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Case-insensitive category substring.
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, default_value_t = crate::catalog::query::DEFAULT_PRICE_MIN)]
    pub price_min: f64,

    #[arg(long, default_value_t = crate::catalog::query::DEFAULT_PRICE_MAX)]
    pub price_max: f64,

    #[arg(long, default_value_t = crate::catalog::query::DEFAULT_LIMIT)]
    pub limit: u32,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Exact title of a stored book.
    #[arg(long)]
    pub title: String,

    #[command(flatten)]
    pub engine: SummaryEngineArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryEngine {
    Openai,
    Gemini,
}

#[derive(Debug, Clone, Args)]
pub struct SummaryEngineArgs {
    /// Text-generation backend used for book summaries.
    #[arg(long, value_enum, default_value_t = SummaryEngine::Gemini)]
    pub summary_engine: SummaryEngine,

    /// OpenAI API base URL (reads `OPENAI_API_KEY`).
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    #[arg(long, default_value = "gpt-4o-mini")]
    pub openai_model: String,

    #[arg(long, default_value_t = 0.7)]
    pub openai_temperature: f32,

    /// Gemini API base URL (reads `GEMINI_API_KEY`).
    #[arg(long, default_value = "https://generativelanguage.googleapis.com/v1beta")]
    pub gemini_base_url: String,

    #[arg(long, default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    /// Timeout for one generation request.
    #[arg(long, default_value_t = 60)]
    pub generation_timeout_secs: u64,
}

/// Writes `value` to stdout as pretty JSON followed by a newline.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    use std::io::Write as _;

    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).context("write json")?;
    out.write_all(b"\n").context("write json newline")?;
    Ok(())
}
