use serde_json::json;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::aggregator::capped::append_capped;
use crate::config::{keys, ACTIVITY_LOG_CAP, LISTING_CACHE_CAP, RECENT_ACTIVITY_LIMIT};
use crate::error::{AppError, Result};
use crate::message::{ClearResponse, Request, Response, StatsResponse, TrackResponse};
use crate::store::{self, read_or_default, KvStore};
use crate::types::{
    new_id, now_ms, ActivityEntry, ActivityType, ListingRecord, Marketplace, Settings, TrackEvent,
};

/// How read-modify-write cycles against the store are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDiscipline {
    /// Cycles may interleave; two overlapping `track_activity` calls can lose
    /// one update. Acceptable for an approximate activity log.
    Unserialized,
    /// Every cycle holds a process-wide mutex from first read to last write.
    Serialized,
}

/// The only writer of persisted state. Holds no authoritative in-memory
/// state: every operation starts by re-reading the store, so the process can
/// be restarted between any two messages.
pub struct Aggregator<S> {
    store: S,
    discipline: WriteDiscipline,
    write_lock: Mutex<()>,
    activity_cap: usize,
    listing_cap: usize,
}

impl<S: KvStore> Aggregator<S> {
    pub fn new(store: S, discipline: WriteDiscipline) -> Self {
        Self::with_caps(store, discipline, ACTIVITY_LOG_CAP, LISTING_CACHE_CAP)
    }

    pub fn with_caps(
        store: S,
        discipline: WriteDiscipline,
        activity_cap: usize,
        listing_cap: usize,
    ) -> Self {
        Self {
            store,
            discipline,
            write_lock: Mutex::new(()),
            activity_cap,
            listing_cap,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// First-install initialization: writes default settings and empty
    /// log/cache for any key that is absent. Returns true if settings were
    /// created (a fresh install).
    pub async fn install(&self) -> Result<bool> {
        let _guard = self.lock().await;
        let mut writes = Vec::new();
        let fresh = self.store.get(keys::SETTINGS).await?.is_none();
        if fresh {
            writes.push((keys::SETTINGS.to_string(), serde_json::to_value(Settings::default())?));
        }
        if self.store.get(keys::ACTIVITY_LOG).await?.is_none() {
            writes.push((keys::ACTIVITY_LOG.to_string(), json!([])));
        }
        if self.store.get(keys::LISTINGS).await?.is_none() {
            writes.push((keys::LISTINGS.to_string(), json!([])));
        }
        if !writes.is_empty() {
            self.store.set_many(writes).await?;
        }
        Ok(fresh)
    }

    /// Dispatches one message to its operation.
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::TrackActivity(event) => Response::Track(self.track_activity(event).await),
            Request::GetStats => Response::Stats(self.get_stats().await),
            Request::ClearData => Response::Clear(self.clear_data().await),
            Request::GetSettings => Response::Settings(self.get_settings().await),
        }
    }

    pub async fn track_activity(&self, event: TrackEvent) -> TrackResponse {
        let (kind, marketplace) = match validate(&event) {
            Ok(v) => v,
            Err(e) => {
                warn!(url = %event.url, "Rejected tracking event: {e}");
                return TrackResponse::default();
            }
        };

        let _guard = self.lock().await;
        match self.append_activity(kind, marketplace, event).await {
            Ok(total_activities) => TrackResponse {
                accepted: true,
                total_activities,
            },
            Err(e) => {
                error!("Error saving activity: {e}");
                TrackResponse::default()
            }
        }
    }

    pub async fn get_stats(&self) -> StatsResponse {
        match self.read_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Error getting stats: {e}");
                StatsResponse::default()
            }
        }
    }

    /// Empties the activity log and listing cache. Settings and the last sync
    /// time are untouched.
    pub async fn clear_data(&self) -> ClearResponse {
        let _guard = self.lock().await;
        let result = self
            .store
            .set_many(vec![
                (keys::ACTIVITY_LOG.to_string(), json!([])),
                (keys::LISTINGS.to_string(), json!([])),
            ])
            .await;
        match result {
            Ok(()) => {
                info!(event = "DATA_CLEARED", "Activity log and listing cache cleared");
                ClearResponse { cleared: true }
            }
            Err(e) => {
                error!("Error clearing data: {e}");
                ClearResponse { cleared: false }
            }
        }
    }

    pub async fn get_settings(&self) -> Settings {
        match read_or_default::<_, Option<Settings>>(&self.store, keys::SETTINGS).await {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                error!("Error reading settings: {e}");
                Settings::default()
            }
        }
    }

    async fn lock(&self) -> Option<MutexGuard<'_, ()>> {
        match self.discipline {
            WriteDiscipline::Serialized => Some(self.write_lock.lock().await),
            WriteDiscipline::Unserialized => None,
        }
    }

    async fn append_activity(
        &self,
        kind: ActivityType,
        marketplace: Marketplace,
        event: TrackEvent,
    ) -> Result<usize> {
        let mut log = store::read_activity_log(&self.store).await?;

        let now = now_ms();
        let listing_count = event.listings.len();
        let entry = ActivityEntry {
            id: new_id(),
            kind,
            marketplace,
            count: event
                .count
                .or_else(|| (listing_count > 0).then_some(listing_count as u64)),
            timestamp: now,
            url: event.url,
            details: event.details,
        };
        append_capped(&mut log, [entry], self.activity_cap);

        let mut writes = vec![
            (keys::ACTIVITY_LOG.to_string(), serde_json::to_value(&log)?),
            (keys::SYNC_TIME.to_string(), json!(now)),
        ];

        if listing_count > 0 {
            let mut cache: Vec<ListingRecord> = store::read_listings(&self.store).await?;
            append_capped(&mut cache, event.listings, self.listing_cap);
            writes.push((keys::LISTINGS.to_string(), serde_json::to_value(&cache)?));
        }

        self.store.set_many(writes).await?;
        debug!(
            event = "ACTIVITY_SAVED",
            kind = %kind,
            marketplace = %marketplace,
            listings = listing_count,
            total = log.len(),
        );
        Ok(log.len())
    }

    async fn read_stats(&self) -> Result<StatsResponse> {
        let log = store::read_activity_log(&self.store).await?;
        let listings = store::read_listings(&self.store).await?;
        let last_update: Option<i64> = read_or_default(&self.store, keys::SYNC_TIME).await?;
        Ok(StatsResponse {
            total_activities: log.len(),
            total_listings: listings.len(),
            recent_activities: store::newest_first(&log, RECENT_ACTIVITY_LIMIT),
            last_update,
        })
    }
}

/// The payload must have decoded, and both `type` and `marketplace` must be
/// present and known; nothing is written otherwise.
fn validate(event: &TrackEvent) -> Result<(ActivityType, Marketplace)> {
    if let Some(reason) = &event.malformed {
        return Err(AppError::InvalidEvent(reason.clone()));
    }
    let kind = event
        .kind
        .as_deref()
        .ok_or_else(|| "missing type".to_string())
        .and_then(str::parse::<ActivityType>)
        .map_err(AppError::InvalidEvent)?;
    let marketplace = event
        .marketplace
        .as_deref()
        .ok_or_else(|| "missing marketplace".to_string())
        .and_then(str::parse::<Marketplace>)
        .map_err(AppError::InvalidEvent)?;
    Ok((kind, marketplace))
}
