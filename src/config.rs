use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::catalog::extract::FieldSelectors;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const DEFAULT_SOURCES: &[&str] = &[
    "https://books.toscrape.com/catalogue/a-light-in-the-attic_1000/index.html",
    "https://books.toscrape.com/catalogue/shakespeares-sonnets_989/index.html",
    "https://books.toscrape.com/catalogue/the-black-maria_991/index.html",
    "https://books.toscrape.com/catalogue/security_925/index.html",
    "https://books.toscrape.com/catalogue/the-secret-of-dreadwillow-carse_944/index.html",
    "https://books.toscrape.com/catalogue/the-bear-and-the-piano_967/index.html",
    "https://books.toscrape.com/catalogue/my-mrs-brown_719/index.html",
    "https://books.toscrape.com/catalogue/take-me-with-you_741/index.html",
    "https://books.toscrape.com/catalogue/the-time-keeper_766/index.html",
];

/// How the pipeline swaps the old catalog for the freshly scraped one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Delete and insert inside one transaction once every page was processed.
    #[default]
    Atomic,
    /// Commit the delete before fetching; a failed insert leaves the catalog empty.
    ClearFirst,
}

/// CSS selectors used to pull book fields out of a product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorConfig {
    pub title: String,
    pub price: String,
    pub availability: String,
    pub breadcrumb: String,
    /// Zero-based index of the breadcrumb link holding the category.
    pub category_position: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            title: "h1".to_owned(),
            price: "p.price_color".to_owned(),
            availability: "p.instock".to_owned(),
            breadcrumb: ".breadcrumb li a".to_owned(),
            category_position: 2,
        }
    }
}

/// On-disk catalog configuration. Every field is optional in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub sources: Vec<String>,
    pub selectors: SelectorConfig,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub refresh: RefreshMode,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| (*s).to_owned()).collect(),
            selectors: SelectorConfig::default(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            refresh: RefreshMode::default(),
        }
    }
}

/// Validated catalog configuration, ready to drive an ingestion run.
#[derive(Debug, Clone)]
pub struct CatalogPlan {
    pub sources: Vec<Url>,
    pub selectors: FieldSelectors,
    pub user_agent: String,
    pub timeout: Duration,
    pub refresh: RefreshMode,
}

impl CatalogConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read catalog config: {}", path.display()))?;
        serde_yaml::from_str(&yaml)
            .with_context(|| format!("parse catalog config: {}", path.display()))
    }

    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn plan(&self) -> anyhow::Result<CatalogPlan> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be > 0");
        }
        if self.user_agent.trim().is_empty() {
            anyhow::bail!("user_agent must not be empty");
        }

        let sources = self
            .sources
            .iter()
            .map(|raw| parse_source(raw))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let selectors = FieldSelectors::compile(&self.selectors).context("compile selectors")?;

        Ok(CatalogPlan {
            sources,
            selectors,
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            refresh: self.refresh,
        })
    }
}

fn parse_source(raw: &str) -> anyhow::Result<Url> {
    let raw = raw.trim();
    // A missing separator in a hand-written list silently glues two URLs together.
    if raw.matches("://").count() > 1 {
        anyhow::bail!("source looks like two URLs joined together: {raw}");
    }

    let url = Url::parse(raw).with_context(|| format!("parse source url: {raw}"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("source must be http/https: {url}");
    }
    Ok(url)
}
