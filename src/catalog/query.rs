use anyhow::Context as _;

use crate::catalog::model::{CatalogItem, ScrapeStatus};
use crate::cli::{RecommendArgs, StatusArgs};
use crate::store::{CatalogStore, SqliteStore};

pub const DEFAULT_PRICE_MIN: f64 = 0.0;
pub const DEFAULT_PRICE_MAX: f64 = 1000.0;
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("{name} must be a finite number")]
    NonFiniteBound { name: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationFilter {
    /// Case-insensitive substring of the category.
    pub category: Option<String>,
    pub price_min: f64,
    pub price_max: f64,
    pub limit: u32,
}

impl Default for RecommendationFilter {
    fn default() -> Self {
        Self {
            category: None,
            price_min: DEFAULT_PRICE_MIN,
            price_max: DEFAULT_PRICE_MAX,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl RecommendationFilter {
    /// Drops a blank category and rejects NaN/infinite price bounds.
    pub fn normalized(self) -> Result<Self, QueryError> {
        if !self.price_min.is_finite() {
            return Err(QueryError::NonFiniteBound { name: "price_min" });
        }
        if !self.price_max.is_finite() {
            return Err(QueryError::NonFiniteBound { name: "price_max" });
        }
        let category = self
            .category
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());
        Ok(Self { category, ..self })
    }
}

/// Books matching `filter`, cheapest first.
pub async fn list_recommendations(
    store: &dyn CatalogStore,
    filter: &RecommendationFilter,
) -> anyhow::Result<Vec<CatalogItem>> {
    let items = store
        .recommendations(filter)
        .await
        .context("load recommendations")?;
    if items.is_empty() {
        tracing::warn!(?filter, "no books found with current filters");
    }
    Ok(items)
}

pub async fn scrape_status(store: &dyn CatalogStore) -> anyhow::Result<ScrapeStatus> {
    let total_books = store.count().await.context("count books")?;
    let latest = store.latest().await.context("load latest book")?;
    Ok(ScrapeStatus {
        total_books,
        last_added: latest.as_ref().map(|item| item.title.clone()),
        last_added_time: latest.map(|item| item.created_at),
    })
}

pub async fn recommend(args: RecommendArgs) -> anyhow::Result<()> {
    let store = SqliteStore::open(&args.db.database)?;
    let filter = RecommendationFilter {
        category: args.category,
        price_min: args.price_min,
        price_max: args.price_max,
        limit: args.limit,
    }
    .normalized()?;

    let items = list_recommendations(&store, &filter).await?;
    crate::cli::print_json(&items)
}

pub async fn status(args: StatusArgs) -> anyhow::Result<()> {
    let store = SqliteStore::open(&args.db.database)?;
    let status = scrape_status(&store).await?;
    crate::cli::print_json(&status)
}
