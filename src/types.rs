use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Marketplace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marketplace {
    Avito,
    YandexMarket,
    Ozon,
    Aliexpress,
    Ebay,
}

impl Marketplace {
    pub const ALL: [Marketplace; 5] = [
        Marketplace::Avito,
        Marketplace::YandexMarket,
        Marketplace::Ozon,
        Marketplace::Aliexpress,
        Marketplace::Ebay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Marketplace::Avito => "avito",
            Marketplace::YandexMarket => "yandex_market",
            Marketplace::Ozon => "ozon",
            Marketplace::Aliexpress => "aliexpress",
            Marketplace::Ebay => "ebay",
        }
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Marketplace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Marketplace::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown marketplace: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Activity classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// A single listing the user clicked on.
    ListingViewed,
    /// A batch of listings seen on a results page.
    ListingsViewed,
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityType::ListingViewed => write!(f, "listing_viewed"),
            ActivityType::ListingsViewed => write!(f, "listings_viewed"),
        }
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "listing_viewed" => Ok(ActivityType::ListingViewed),
            "listings_viewed" => Ok(ActivityType::ListingsViewed),
            other => Err(format!("unknown activity type: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// One listing as seen on a marketplace page. `id` is random per extraction,
/// so the same listing observed twice yields two records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: String,
    pub title: String,
    pub marketplace: Marketplace,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub marketplace: Marketplace,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ActivityEntry {
    /// Short human label for list views: the listing title if the entry
    /// carries one, otherwise a count summary.
    pub fn label(&self) -> String {
        let title = self
            .details
            .as_ref()
            .and_then(|d| d.get("title"))
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty());
        match (title, self.kind, self.count) {
            (Some(t), _, _) => t.to_string(),
            (None, ActivityType::ListingsViewed, Some(n)) => format!("{n} listings on {}", self.marketplace),
            _ => "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub auto_sync: bool,
    /// Milliseconds.
    pub sync_interval: u64,
    pub enable_notifications: bool,
    pub marketplaces: Vec<Marketplace>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval: 3_600_000,
            enable_notifications: true,
            marketplaces: Marketplace::ALL.to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound tracking event
// ---------------------------------------------------------------------------

/// Raw `trackActivity` payload. `type` and `marketplace` stay as strings so a
/// malformed event can be rejected with `accepted: false` instead of failing
/// to deserialize the whole message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackEvent {
    /// Set when the payload could not be decoded at all. Never sent.
    #[serde(skip)]
    pub malformed: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listings: Vec<ListingRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TrackEvent {
    pub fn new(kind: ActivityType, marketplace: Marketplace, url: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.to_string()),
            marketplace: Some(marketplace.to_string()),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Decodes a message's `data`. A missing or undecodable payload still
    /// yields an event, marked malformed, so it can be refused like any other
    /// invalid event.
    pub fn from_data(data: Option<serde_json::Value>) -> Self {
        let Some(data) = data else {
            return Self {
                malformed: Some("missing data".to_string()),
                ..Self::default()
            };
        };
        let url = data
            .get("url")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        match serde_json::from_value::<Self>(data) {
            Ok(event) => event,
            Err(e) => Self {
                malformed: Some(e.to_string()),
                url,
                ..Self::default()
            },
        }
    }
}

/// Epoch milliseconds, the timestamp unit for every persisted record.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marketplace_round_trips_through_str() {
        for m in Marketplace::ALL {
            assert_eq!(m.as_str().parse::<Marketplace>(), Ok(m));
        }
        assert!("amazon".parse::<Marketplace>().is_err());
    }

    #[test]
    fn activity_entry_serializes_type_field() {
        let entry = ActivityEntry {
            id: "a".to_string(),
            kind: ActivityType::ListingsViewed,
            marketplace: Marketplace::YandexMarket,
            count: Some(3),
            timestamp: 1,
            url: "https://market.yandex.ru/".to_string(),
            details: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "listings_viewed");
        assert_eq!(json["marketplace"], "yandex_market");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn label_prefers_title_then_count() {
        let mut entry = ActivityEntry {
            id: "a".to_string(),
            kind: ActivityType::ListingsViewed,
            marketplace: Marketplace::Ozon,
            count: Some(12),
            timestamp: 1,
            url: String::new(),
            details: None,
        };
        assert_eq!(entry.label(), "12 listings on ozon");

        entry.details = Some(serde_json::json!({ "title": "Phone case" }));
        assert_eq!(entry.label(), "Phone case");

        entry.details = None;
        entry.kind = ActivityType::ListingViewed;
        assert_eq!(entry.label(), "Unknown");
    }

    #[test]
    fn default_settings_enable_every_marketplace() {
        let s = Settings::default();
        assert!(s.auto_sync);
        assert_eq!(s.sync_interval, 3_600_000);
        assert_eq!(s.marketplaces.len(), 5);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["syncInterval"], 3_600_000);
    }
}
