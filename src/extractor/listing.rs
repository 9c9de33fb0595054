use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::config::MAX_TITLE_CHARS;
use crate::error::{AppError, Result};
use crate::extractor::marketplace::{ExtractionStrategy, PriceSource};
use crate::types::{new_id, ListingRecord, Marketplace};

pub const UNKNOWN_TITLE: &str = "Unknown";

/// Extracts up to `limit` listing records from a parsed page. Cards beyond
/// `limit` are ignored. A field that cannot be read leaves that field at its
/// default; it never drops the card or the rest of the batch.
pub fn extract_listings(
    document: &Html,
    marketplace: Marketplace,
    page_url: &str,
    limit: usize,
    now_ms: i64,
) -> Vec<ListingRecord> {
    let strategy = marketplace.strategy();
    let card_selector = match parse_selector(strategy.listing) {
        Ok(s) => s,
        Err(e) => {
            warn!(marketplace = %marketplace, "Cannot select listings: {e}");
            return Vec::new();
        }
    };

    let records: Vec<ListingRecord> = document
        .select(&card_selector)
        .take(limit)
        .map(|card| build_record(card, &strategy, marketplace, page_url, now_ms))
        .collect();

    debug!(marketplace = %marketplace, count = records.len(), "Extracted listings");
    records
}

fn build_record(
    card: ElementRef<'_>,
    strategy: &ExtractionStrategy,
    marketplace: Marketplace,
    page_url: &str,
    now_ms: i64,
) -> ListingRecord {
    let mut record = ListingRecord {
        id: new_id(),
        title: UNKNOWN_TITLE.to_string(),
        marketplace,
        timestamp: now_ms,
        url: page_url.to_string(),
        sales: None,
        price: None,
    };

    match read_title(card, strategy) {
        Ok(Some(title)) => record.title = title,
        Ok(None) => {}
        Err(e) => warn!(marketplace = %marketplace, "Title extraction failed: {e}"),
    }
    if let Some(source) = strategy.price {
        match read_price(card, source) {
            Ok(price) => record.price = price,
            Err(e) => warn!(marketplace = %marketplace, "Price extraction failed: {e}"),
        }
    }
    if let Some(selector) = strategy.sales {
        match read_sales(card, selector) {
            Ok(sales) => record.sales = sales,
            Err(e) => warn!(marketplace = %marketplace, "Sales extraction failed: {e}"),
        }
    }
    record
}

fn read_title(card: ElementRef<'_>, strategy: &ExtractionStrategy) -> Result<Option<String>> {
    for raw in strategy.title {
        let selector = parse_selector(raw)?;
        if let Some(text) = card.select(&selector).map(element_text).find(|t| !t.is_empty()) {
            return Ok(Some(truncate_chars(&text, MAX_TITLE_CHARS)));
        }
    }
    let own = element_text(card);
    Ok((!own.is_empty()).then(|| truncate_chars(&own, MAX_TITLE_CHARS)))
}

fn read_price(card: ElementRef<'_>, source: PriceSource) -> Result<Option<String>> {
    let price = match source {
        PriceSource::Text(raw) => {
            let selector = parse_selector(raw)?;
            card.select(&selector).next().map(element_text)
        }
        PriceSource::Attr(raw, attr) => {
            let selector = parse_selector(raw)?;
            card.select(&selector)
                .next()
                .and_then(|el| el.value().attr(attr))
                .map(|v| v.trim().to_string())
        }
    };
    Ok(price.filter(|p| !p.is_empty()))
}

/// "1,024 sold" -> 1024. Present-but-digitless text is an error.
fn read_sales(card: ElementRef<'_>, raw: &str) -> Result<Option<u64>> {
    let selector = parse_selector(raw)?;
    let Some(text) = card.select(&selector).next().map(element_text) else {
        return Ok(None);
    };
    let digits: String = text
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits
        .parse::<u64>()
        .map(Some)
        .map_err(|_| AppError::Extraction(format!("unparsable sales text {text:?}")))
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| AppError::Extraction(format!("bad selector {raw:?}: {e}")))
}

/// All descendant text with whitespace runs collapsed and ends trimmed.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect::<String>().trim_end().to_string()
}
