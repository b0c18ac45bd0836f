use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

/// Book fields pulled out of one product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookFields {
    pub title: String,
    pub price: f64,
    pub category: String,
    pub availability: String,
}

/// A stored catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub title: String,
    pub price: f64,
    pub category: String,
    pub availability: String,
    pub created_at: DateTime<Utc>,
}

/// One successfully scraped page, as reported back by an ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedBook {
    pub title: String,
    pub price: f64,
    pub category: String,
    pub availability: String,
    pub url: String,
}

impl ScrapedBook {
    pub fn new(fields: BookFields, url: &url::Url) -> Self {
        Self {
            title: fields.title,
            price: fields.price,
            category: fields.category,
            availability: fields.availability,
            url: url.to_string(),
        }
    }

    pub fn fields(&self) -> BookFields {
        BookFields {
            title: self.title.clone(),
            price: self.price,
            category: self.category.clone(),
            availability: self.availability.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeStatus {
    pub total_books: u64,
    pub last_added: Option<String>,
    pub last_added_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub title: String,
    pub summary: String,
}
