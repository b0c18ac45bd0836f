use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{ApiError, AppState};
use crate::catalog::model::{BookSummary, CatalogItem, ScrapeStatus};
use crate::catalog::query::{self, RecommendationFilter};
use crate::catalog::summary;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub category: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub limit: Option<u32>,
}

impl RecommendationQuery {
    fn into_filter(self) -> RecommendationFilter {
        let defaults = RecommendationFilter::default();
        RecommendationFilter {
            category: self.category,
            price_min: self.price_min.unwrap_or(defaults.price_min),
            price_max: self.price_max.unwrap_or(defaults.price_max),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Recommendation {
    pub title: String,
    pub price: f64,
    pub category: String,
    pub availability: String,
    pub created_at: DateTime<Utc>,
}

impl From<CatalogItem> for Recommendation {
    fn from(item: CatalogItem) -> Self {
        Self {
            title: item.title,
            price: item.price,
            category: item.category,
            availability: item.availability,
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub title: String,
}

/// Runs one catalog refresh inside the request.
pub async fn scrape_books(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = state.ingestor.run().await?;
    let body = serde_json::to_value(report.summary())
        .map_err(|err| ApiError::internal(err.into()))?;
    Ok(Json(body))
}

pub async fn recommendations(
    State(state): State<AppState>,
    q: Result<Query<RecommendationQuery>, QueryRejection>,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
    let Query(q) = q?;
    let filter = q.into_filter().normalized()?;
    let items = query::list_recommendations(state.catalog.as_ref(), &filter).await?;
    Ok(Json(items.into_iter().map(Recommendation::from).collect()))
}

pub async fn scrape_status(State(state): State<AppState>) -> Result<Json<ScrapeStatus>, ApiError> {
    Ok(Json(query::scrape_status(state.catalog.as_ref()).await?))
}

pub async fn book_summary(
    State(state): State<AppState>,
    q: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<BookSummary>, ApiError> {
    let Query(q) = q?;
    let summary =
        summary::summarize(state.catalog.as_ref(), state.summarizer.as_ref(), &q.title).await?;
    Ok(Json(summary))
}
