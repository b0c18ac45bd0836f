use std::sync::Arc;

use anyhow::Context as _;
use serde::Serialize;
use url::Url;

use crate::catalog::extract::{ExtractError, extract_book};
use crate::catalog::fetch::{FetchError, HttpPageFetcher, PageFetcher};
use crate::catalog::model::{BookFields, ScrapedBook};
use crate::cli::ScrapeArgs;
use crate::config::{CatalogConfig, CatalogPlan, RefreshMode};
use crate::store::{CatalogStore, SqliteStore};

#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

/// What happened to one source page during a run.
#[derive(Debug)]
pub enum PageOutcome {
    Scraped(ScrapedBook),
    Skipped { url: Url, reason: SkipReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPage {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub outcomes: Vec<PageOutcome>,
}

impl IngestReport {
    pub fn scraped(&self) -> impl Iterator<Item = &ScrapedBook> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            PageOutcome::Scraped(book) => Some(book),
            PageOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = SkippedPage> + '_ {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            PageOutcome::Skipped { url, reason } => Some(SkippedPage {
                url: url.to_string(),
                reason: reason.to_string(),
            }),
            PageOutcome::Scraped(_) => None,
        })
    }

    pub fn scraped_count(&self) -> usize {
        self.scraped().count()
    }

    pub fn summary(&self) -> RunSummary<'_> {
        let books = self.scraped().collect::<Vec<_>>();
        RunSummary {
            status: "success",
            total_books_scraped: books.len(),
            books,
            skipped: self.skipped().collect(),
        }
    }
}

/// Response body of a finished run.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub status: &'static str,
    pub total_books_scraped: usize,
    pub books: Vec<&'a ScrapedBook>,
    pub skipped: Vec<SkippedPage>,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("clear catalog: {0:#}")]
    Clear(anyhow::Error),
    #[error(
        "commit {staged} scraped books ({}): {cause:#}",
        catalog_state(.catalog_cleared)
    )]
    Commit {
        staged: usize,
        catalog_cleared: bool,
        cause: anyhow::Error,
    },
}

fn catalog_state(catalog_cleared: &bool) -> &'static str {
    if *catalog_cleared {
        "catalog left empty"
    } else {
        "previous catalog kept"
    }
}

/// Runs full catalog refreshes against one store.
pub struct Ingestor {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn CatalogStore>,
    plan: Arc<CatalogPlan>,
}

impl Ingestor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn CatalogStore>,
        plan: Arc<CatalogPlan>,
    ) -> Self {
        Self {
            fetcher,
            store,
            plan,
        }
    }

    /// Ingestor using the reqwest fetcher configured by `plan`.
    pub fn over_http(store: Arc<dyn CatalogStore>, plan: CatalogPlan) -> anyhow::Result<Self> {
        let fetcher = HttpPageFetcher::new(&plan.user_agent, plan.timeout)
            .context("build page fetcher")?;
        Ok(Self::new(Arc::new(fetcher), store, Arc::new(plan)))
    }

    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        let catalog_cleared = self.plan.refresh == RefreshMode::ClearFirst;
        if catalog_cleared {
            let removed = self.store.clear().await.map_err(IngestError::Clear)?;
            tracing::info!(removed, "cleared catalog before scraping");
        }

        let mut report = IngestReport::default();
        for url in &self.plan.sources {
            let outcome = self.scrape_page(url).await;
            match &outcome {
                PageOutcome::Scraped(book) => {
                    tracing::info!(%url, title = %book.title, "scraped book page");
                }
                PageOutcome::Skipped { reason, .. } => {
                    tracing::warn!(%url, %reason, "skipping book page");
                }
            }
            report.outcomes.push(outcome);
        }

        let staged = report.scraped().map(ScrapedBook::fields).collect::<Vec<_>>();
        let committed = match self.plan.refresh {
            RefreshMode::Atomic => self.store.replace_all(&staged).await,
            RefreshMode::ClearFirst => self.store.insert_batch(&staged).await,
        };
        if let Err(cause) = committed {
            tracing::error!(staged = staged.len(), catalog_cleared, ?cause, "catalog commit failed");
            return Err(IngestError::Commit {
                staged: staged.len(),
                catalog_cleared,
                cause,
            });
        }

        tracing::info!(
            sources = self.plan.sources.len(),
            scraped = staged.len(),
            skipped = self.plan.sources.len() - staged.len(),
            "catalog refreshed"
        );
        Ok(report)
    }

    async fn scrape_page(&self, url: &Url) -> PageOutcome {
        match self.fetch_and_extract(url).await {
            Ok(fields) => PageOutcome::Scraped(ScrapedBook::new(fields, url)),
            Err(reason) => PageOutcome::Skipped {
                url: url.clone(),
                reason,
            },
        }
    }

    async fn fetch_and_extract(&self, url: &Url) -> Result<BookFields, SkipReason> {
        tracing::debug!(%url, "fetching book page");
        let html = self.fetcher.fetch(url).await?;
        Ok(extract_book(&html, &self.plan.selectors)?)
    }
}

pub async fn run(args: ScrapeArgs) -> anyhow::Result<()> {
    let config = CatalogConfig::load_or_default(args.catalog_config.as_deref())?;
    let plan = config.plan().context("validate catalog config")?;
    let store = SqliteStore::open(&args.db.database)?;
    let ingestor = Ingestor::over_http(Arc::new(store), plan)?;

    let report = ingestor.run().await?;
    crate::cli::print_json(&report.summary())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use super::*;
    use crate::catalog::model::CatalogItem;
    use crate::catalog::query::RecommendationFilter;

    struct MapFetcher {
        pages: HashMap<String, Result<String, StatusCode>>,
    }

    impl MapFetcher {
        fn new(pages: &[(&str, Result<String, StatusCode>)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, page)| ((*url).to_owned(), page.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for MapFetcher {
        async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
            match self.pages.get(url.as_str()) {
                Some(Ok(html)) => Ok(html.clone()),
                Some(Err(status)) => Err(FetchError::Status(*status)),
                None => Err(FetchError::Status(StatusCode::NOT_FOUND)),
            }
        }
    }

    /// Delegates reads and deletes, refuses every insert.
    struct RejectingInserts {
        inner: SqliteStore,
    }

    #[async_trait]
    impl CatalogStore for RejectingInserts {
        async fn clear(&self) -> anyhow::Result<u64> {
            self.inner.clear().await
        }
        async fn insert_batch(&self, _books: &[BookFields]) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn replace_all(&self, _books: &[BookFields]) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn recommendations(
            &self,
            filter: &RecommendationFilter,
        ) -> anyhow::Result<Vec<CatalogItem>> {
            self.inner.recommendations(filter).await
        }
        async fn count(&self) -> anyhow::Result<u64> {
            self.inner.count().await
        }
        async fn latest(&self) -> anyhow::Result<Option<CatalogItem>> {
            self.inner.latest().await
        }
        async fn find_by_title(&self, title: &str) -> anyhow::Result<Option<CatalogItem>> {
            self.inner.find_by_title(title).await
        }
    }

    const A: &str = "https://books.test/a/index.html";
    const B: &str = "https://books.test/b/index.html";
    const C: &str = "https://books.test/c/index.html";
    const D: &str = "https://books.test/d/index.html";

    fn page(title: &str, price: Option<&str>) -> Result<String, StatusCode> {
        let price = price
            .map(|p| format!("<p class=\"price_color\">{p}</p>"))
            .unwrap_or_default();
        Ok(format!(
            r#"<html><body>
            <ul class="breadcrumb"><li><a>Home</a></li><li><a>Books</a></li><li><a>Fiction</a></li></ul>
            <h1>{title}</h1>{price}<p class="instock">In stock</p>
            </body></html>"#
        ))
    }

    fn plan(sources: &[&str], refresh: RefreshMode) -> Arc<CatalogPlan> {
        let config = CatalogConfig {
            sources: sources.iter().map(|s| (*s).to_owned()).collect(),
            refresh,
            ..CatalogConfig::default()
        };
        Arc::new(config.plan().unwrap())
    }

    fn old_book() -> BookFields {
        BookFields {
            title: "Old".to_owned(),
            price: 1.0,
            category: "Poetry".to_owned(),
            availability: "In stock".to_owned(),
        }
    }

    #[tokio::test]
    async fn failed_pages_are_skipped_and_the_rest_is_stored() {
        let fetcher = MapFetcher::new(&[
            (A, page("Alpha", Some("£10.00"))),
            (B, page("No Price", None)),
            (C, Err(StatusCode::INTERNAL_SERVER_ERROR)),
            (D, page("Delta", Some("£4.50"))),
        ]);
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let ingestor = Ingestor::new(
            Arc::new(fetcher),
            store.clone(),
            plan(&[A, B, C, D], RefreshMode::Atomic),
        );

        let report = ingestor.run().await.unwrap();
        let titles = report.scraped().map(|b| b.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, ["Alpha", "Delta"]);
        assert_eq!(report.scraped().next().unwrap().url, A);

        let skipped = report.skipped().collect::<Vec<_>>();
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].url, B);
        assert!(skipped[0].reason.contains("price element not found"));
        assert_eq!(skipped[1].url, C);
        assert!(skipped[1].reason.contains("500"));

        assert_eq!(store.count().await.unwrap() as usize, report.scraped_count());
        let summary = serde_json::to_value(report.summary()).unwrap();
        assert_eq!(summary["status"], "success");
        assert_eq!(summary["total_books_scraped"], 2);
        assert_eq!(summary["books"][1]["price"], 4.5);
        assert_eq!(summary["books"][1]["category"], "Fiction");
    }

    #[tokio::test]
    async fn no_successful_page_still_succeeds_with_an_empty_catalog() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.replace_all(&[old_book()]).await.unwrap();
        let fetcher = MapFetcher::new(&[(A, page("No Price", None))]);
        let ingestor = Ingestor::new(
            Arc::new(fetcher),
            store.clone(),
            plan(&[A, B], RefreshMode::Atomic),
        );

        let report = ingestor.run().await.unwrap();
        assert_eq!(report.scraped_count(), 0);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rerunning_with_stable_pages_keeps_the_same_catalog() {
        let pages = [
            (A, page("Alpha", Some("£10.00"))),
            (B, page("Beta", Some("£12.00"))),
        ];
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        for refresh in [RefreshMode::Atomic, RefreshMode::ClearFirst] {
            let ingestor = Ingestor::new(
                Arc::new(MapFetcher::new(&pages)),
                store.clone(),
                plan(&[A, B], refresh),
            );
            let first = ingestor.run().await.unwrap().scraped_count();
            let after_first = store.count().await.unwrap();
            let second = ingestor.run().await.unwrap().scraped_count();
            let after_second = store.count().await.unwrap();
            assert_eq!((first, second), (2, 2));
            assert_eq!((after_first, after_second), (2, 2));
        }
    }

    #[tokio::test]
    async fn atomic_commit_failure_keeps_the_previous_catalog() {
        let inner = SqliteStore::open_in_memory().unwrap();
        inner.replace_all(&[old_book()]).await.unwrap();
        let store = Arc::new(RejectingInserts {
            inner: inner.clone(),
        });
        let ingestor = Ingestor::new(
            Arc::new(MapFetcher::new(&[(A, page("Alpha", Some("£10.00")))])),
            store,
            plan(&[A], RefreshMode::Atomic),
        );

        let err = ingestor.run().await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Commit {
                staged: 1,
                catalog_cleared: false,
                ..
            }
        ));
        assert!(err.to_string().contains("disk full"));
        assert_eq!(inner.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_first_commit_failure_leaves_the_catalog_empty() {
        let inner = SqliteStore::open_in_memory().unwrap();
        inner.replace_all(&[old_book()]).await.unwrap();
        let store = Arc::new(RejectingInserts {
            inner: inner.clone(),
        });
        let ingestor = Ingestor::new(
            Arc::new(MapFetcher::new(&[(A, page("Alpha", Some("£10.00")))])),
            store,
            plan(&[A], RefreshMode::ClearFirst),
        );

        let err = ingestor.run().await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Commit {
                catalog_cleared: true,
                ..
            }
        ));
        assert!(err.to_string().contains("catalog left empty"));
        assert_eq!(inner.count().await.unwrap(), 0);
    }
}
