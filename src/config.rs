use crate::error::{AppError, Result};

pub const AGGREGATOR_URL: &str = "http://localhost:3000";

/// Maximum entries kept in the activity log. Oldest entries are evicted first.
pub const ACTIVITY_LOG_CAP: usize = 1000;

/// Maximum records kept in the listing cache. Same FIFO eviction as the log.
pub const LISTING_CACHE_CAP: usize = 5000;

/// Entries returned by `getStats` and shown by the popup, newest first.
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Listings extracted per page observation.
pub const DEFAULT_EXTRACT_LIMIT: usize = 50;

/// Titles longer than this (in chars) are truncated at extraction time.
pub const MAX_TITLE_CHARS: usize = 100;

/// Minimum gap between two extractions on the same page.
pub const DEFAULT_EXTRACT_COOLDOWN_MS: u64 = 2000;

/// Request timeout for every message sent to the aggregator.
pub const MESSAGE_TIMEOUT_SECS: u64 = 5;

/// Store keys, shared by the aggregator (writer) and popup (direct reader).
pub mod keys {
    pub const ACTIVITY_LOG: &str = "activity_log";
    pub const LISTINGS: &str = "listings_data";
    pub const SETTINGS: &str = "extension_settings";
    pub const SYNC_TIME: &str = "last_sync_time";
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Base URL the extractor and popup send messages to (AGGREGATOR_URL)
    pub aggregator_url: String,
    /// Pages the extractor watches (TRACK_URLS, comma-separated).
    pub track_urls: Vec<String>,
    /// Listings taken per page observation (EXTRACT_LIMIT)
    pub extract_limit: usize,
    /// Debounce window between extractions of the same page (EXTRACT_COOLDOWN_MS)
    pub extract_cooldown_ms: u64,
    /// How often the extractor re-fetches each page (EXTRACT_POLL_SECS)
    pub extract_poll_secs: u64,
    /// Guard every read-modify-write with a mutex (SERIALIZE_WRITES)
    pub serialize_writes: bool,
    pub export_dir: String,
    pub export_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "tracker.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            aggregator_url: std::env::var("AGGREGATOR_URL")
                .unwrap_or_else(|_| AGGREGATOR_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            track_urls: std::env::var("TRACK_URLS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            extract_limit: std::env::var("EXTRACT_LIMIT")
                .unwrap_or_else(|_| DEFAULT_EXTRACT_LIMIT.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_EXTRACT_LIMIT),
            extract_cooldown_ms: std::env::var("EXTRACT_COOLDOWN_MS")
                .unwrap_or_else(|_| DEFAULT_EXTRACT_COOLDOWN_MS.to_string())
                .parse::<u64>()
                .unwrap_or(DEFAULT_EXTRACT_COOLDOWN_MS),
            extract_poll_secs: std::env::var("EXTRACT_POLL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .unwrap_or(30),
            serialize_writes: std::env::var("SERIALIZE_WRITES")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
            export_dir: std::env::var("EXPORT_DIR").unwrap_or_else(|_| ".".to_string()),
            export_prefix: std::env::var("EXPORT_PREFIX")
                .unwrap_or_else(|_| "marketplace-activity".to_string()),
        })
    }
}
