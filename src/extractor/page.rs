use std::time::{Duration, Instant};

use scraper::Html;
use tracing::debug;

use crate::extractor::debounce::{Debouncer, Trigger};
use crate::extractor::listing::extract_listings;
use crate::extractor::marketplace::identify_marketplace;
use crate::types::{ActivityType, Marketplace, TrackEvent};

/// Tracking state for one open marketplace page.
#[derive(Debug, Clone)]
pub struct PageTracker {
    url: String,
    marketplace: Marketplace,
    debouncer: Debouncer,
    limit: usize,
}

impl PageTracker {
    /// None when the URL does not parse or its host is not a tracked marketplace.
    pub fn for_url(url: &str, cooldown: Duration, limit: usize) -> Option<Self> {
        let parsed = reqwest::Url::parse(url).ok()?;
        let marketplace = identify_marketplace(parsed.host_str()?)?;
        Some(Self {
            url: url.to_string(),
            marketplace,
            debouncer: Debouncer::new(cooldown),
            limit,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    /// Runs one extraction if the debouncer allows it and turns the result
    /// into a tracking event. A click on a listing reports that single
    /// listing; everything else reports the whole batch.
    pub fn observe(
        &mut self,
        trigger: Trigger,
        html: &str,
        now: Instant,
        now_ms: i64,
    ) -> Option<TrackEvent> {
        if !self.debouncer.should_fire(trigger, now) {
            debug!(url = %self.url, ?trigger, "Extraction debounced");
            return None;
        }

        let document = Html::parse_document(html);
        let mut listings = extract_listings(&document, self.marketplace, &self.url, self.limit, now_ms);
        if listings.is_empty() {
            debug!(url = %self.url, "No listings on page");
            return None;
        }

        let event = if trigger.bypasses_cooldown() {
            listings.truncate(1);
            let mut event = TrackEvent::new(ActivityType::ListingViewed, self.marketplace, &self.url);
            event.details = serde_json::to_value(&listings[0]).ok();
            event.listings = listings;
            event
        } else {
            let mut event = TrackEvent::new(ActivityType::ListingsViewed, self.marketplace, &self.url);
            event.count = Some(listings.len() as u64);
            event.listings = listings;
            event
        };
        Some(event)
    }
}
