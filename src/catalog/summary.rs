use crate::catalog::model::BookSummary;
use crate::cli::SummaryArgs;
use crate::llm::TextGenerator;
use crate::store::{CatalogStore, SqliteStore};

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("Book not found: {0}")]
    NotFound(String),
    #[error("Failed to generate summary: {0:#}")]
    Generation(anyhow::Error),
    #[error("load book: {0:#}")]
    Store(anyhow::Error),
}

pub fn summary_prompt(title: &str) -> String {
    format!("Provide a concise summary (100-150 words) of the book '{title}'.")
}

/// Summarizes a stored book, looked up by exact title.
pub async fn summarize(
    store: &dyn CatalogStore,
    generator: &dyn TextGenerator,
    title: &str,
) -> Result<BookSummary, SummaryError> {
    let book = store
        .find_by_title(title)
        .await
        .map_err(SummaryError::Store)?
        .ok_or_else(|| SummaryError::NotFound(title.to_owned()))?;

    let summary = generator
        .generate(&summary_prompt(&book.title))
        .await
        .map_err(SummaryError::Generation)?;
    if summary.trim().is_empty() {
        return Err(SummaryError::Generation(anyhow::anyhow!(
            "generator returned empty output"
        )));
    }

    tracing::info!(title = %book.title, "generated book summary");
    Ok(BookSummary {
        title: book.title,
        summary,
    })
}

pub async fn run(args: SummaryArgs) -> anyhow::Result<()> {
    let store = SqliteStore::open(&args.db.database)?;
    let generator = crate::llm::generator_from_args(&args.engine)?;
    let summary = summarize(&store, generator.as_ref(), &args.title).await?;
    crate::cli::print_json(&summary)
}
