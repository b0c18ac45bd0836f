use scraper::{ElementRef, Html, Selector};

use crate::catalog::model::{BookFields, UNKNOWN};
use crate::config::SelectorConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("title element not found")]
    MissingTitle,
    #[error("price element not found")]
    MissingPrice,
    #[error("price {raw:?} is not a number")]
    UnparsablePrice { raw: String },
}

/// Compiled form of [`SelectorConfig`].
#[derive(Debug, Clone)]
pub struct FieldSelectors {
    title: Selector,
    price: Selector,
    availability: Selector,
    breadcrumb: Selector,
    category_position: usize,
}

impl FieldSelectors {
    pub fn compile(config: &SelectorConfig) -> anyhow::Result<Self> {
        Ok(Self {
            title: parse_selector("title", &config.title)?,
            price: parse_selector("price", &config.price)?,
            availability: parse_selector("availability", &config.availability)?,
            breadcrumb: parse_selector("breadcrumb", &config.breadcrumb)?,
            category_position: config.category_position,
        })
    }
}

fn parse_selector(field: &str, raw: &str) -> anyhow::Result<Selector> {
    Selector::parse(raw).map_err(|err| anyhow::anyhow!("invalid {field} selector {raw:?}: {err}"))
}

/// Pulls a book out of product-page markup.
///
/// Title and price are required. Availability and category fall back to
/// `"Unknown"` when their elements are missing or blank.
pub fn extract_book(html: &str, selectors: &FieldSelectors) -> Result<BookFields, ExtractError> {
    let document = Html::parse_document(html);

    let title = first_text(&document, &selectors.title)
        .filter(|title| !title.is_empty())
        .ok_or(ExtractError::MissingTitle)?;

    let price_text =
        first_text(&document, &selectors.price).ok_or(ExtractError::MissingPrice)?;
    let price = parse_price(&price_text)?;

    let availability = first_text(&document, &selectors.availability)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_owned());

    let category = document
        .select(&selectors.breadcrumb)
        .nth(selectors.category_position)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_owned());

    Ok(BookFields {
        title,
        price,
        category,
        availability,
    })
}

/// Parses a currency string such as `£51.77` by keeping only digits and dots.
pub fn parse_price(raw: &str) -> Result<f64, ExtractError> {
    let cleaned = raw
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.')
        .collect::<String>();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite())
        .ok_or_else(|| ExtractError::UnparsablePrice {
            raw: raw.to_owned(),
        })
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).next().map(element_text)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}
