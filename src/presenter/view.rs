use std::path::Path;

use tracing::warn;

use crate::client::AggregatorClient;
use crate::config::RECENT_ACTIVITY_LIMIT;
use crate::message::StatsResponse;
use crate::presenter::export::export_to_dir;
use crate::store::{self, KvStore};
use crate::types::{now_ms, ActivityEntry, Settings};

pub const EMPTY_STATE: &str = "No activity yet";

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browsing,
    /// Clear was requested; waiting for y/n.
    ConfirmClear,
}

/// Everything the popup renders. Mutated only by `refresh` and the two
/// user actions.
#[derive(Debug, Clone)]
pub struct PopupState {
    pub status: ConnectionStatus,
    pub stats: StatsResponse,
    /// Newest first, at most `RECENT_ACTIVITY_LIMIT`.
    pub recent: Vec<ActivityEntry>,
    pub settings: Option<Settings>,
    pub mode: Mode,
    /// One-line result of the last action.
    pub notice: Option<String>,
    /// Why the store could not be opened for direct reads, if it couldn't.
    pub store_error: Option<String>,
}

impl Default for PopupState {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupState {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            stats: StatsResponse::default(),
            recent: Vec::new(),
            settings: None,
            mode: Mode::Browsing,
            notice: None,
            store_error: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    /// Stats come over the message interface; the recent list is read
    /// straight from the store when one is available, falling back to the
    /// stats snapshot otherwise.
    pub async fn refresh<S: KvStore>(&mut self, client: &AggregatorClient, store: Option<&S>) {
        match client.get_stats().await {
            Ok(stats) => {
                self.stats = stats;
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => self.status = ConnectionStatus::Error(e.to_string()),
        }

        if self.settings.is_none() && self.status == ConnectionStatus::Connected {
            self.settings = client.get_settings().await.ok();
        }

        self.recent = match store {
            Some(store) => match store::read_recent_activities(store, RECENT_ACTIVITY_LIMIT).await {
                Ok(recent) => recent,
                Err(e) => {
                    warn!("Error loading activities: {e}");
                    self.stats.recent_activities.clone()
                }
            },
            None => self.stats.recent_activities.clone(),
        };
    }

    pub fn request_clear(&mut self) {
        self.mode = Mode::ConfirmClear;
    }

    pub fn cancel_clear(&mut self) {
        self.mode = Mode::Browsing;
    }

    /// Sends `clearData` only if a clear was requested first, then refreshes.
    pub async fn confirm_clear<S: KvStore>(&mut self, client: &AggregatorClient, store: Option<&S>) {
        if self.mode != Mode::ConfirmClear {
            return;
        }
        self.mode = Mode::Browsing;
        self.notice = Some(match client.clear_data().await {
            Ok(resp) if resp.cleared => "Data cleared".to_string(),
            Ok(_) => "Clear failed".to_string(),
            Err(e) => format!("Clear failed: {e}"),
        });
        self.refresh(client, store).await;
    }

    pub async fn export<S: KvStore>(&mut self, store: Option<&S>, dir: &Path, prefix: &str) {
        let Some(store) = store else {
            self.notice = Some(match &self.store_error {
                Some(e) => format!("Export unavailable, store not readable: {e}"),
                None => "Export needs a readable store (DB_PATH)".to_string(),
            });
            return;
        };
        self.notice = Some(match export_to_dir(store, dir, prefix, now_ms()).await {
            Ok(path) => format!("Exported to {}", path.display()),
            Err(e) => {
                warn!("Error exporting data: {e}");
                format!("Export failed: {e}")
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::aggregator::{Aggregator, WriteDiscipline};
    use crate::api::routes::spawn_test_server;
    use crate::store::MemoryStore;
    use crate::types::{ActivityType, Marketplace, TrackEvent};

    fn dead_client() -> AggregatorClient {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        AggregatorClient::new(format!("http://{addr}")).unwrap()
    }

    fn event(n: u64) -> TrackEvent {
        let mut e = TrackEvent::new(ActivityType::ListingsViewed, Marketplace::Ozon, "https://www.ozon.ru/search");
        e.count = Some(n);
        e
    }

    #[test]
    fn starts_empty() {
        let state = PopupState::new();
        assert!(state.is_empty());
        assert_eq!(state.status, ConnectionStatus::Connecting);
    }

    #[tokio::test]
    async fn refresh_reads_stats_and_recent_newest_first() {
        let agg = Arc::new(Aggregator::new(MemoryStore::new(), WriteDiscipline::Serialized));
        agg.install().await.unwrap();
        for n in 1..=12 {
            agg.track_activity(event(n)).await;
        }
        let client = AggregatorClient::new(spawn_test_server(Arc::clone(&agg)).await).unwrap();

        let mut state = PopupState::new();
        state.refresh(&client, Some(agg.store())).await;

        assert_eq!(state.status, ConnectionStatus::Connected);
        assert_eq!(state.stats.total_activities, 12);
        assert_eq!(state.recent.len(), 10);
        assert_eq!(state.recent[0].count, Some(12));
        assert_eq!(state.recent[9].count, Some(3));
        assert_eq!(state.settings, Some(Settings::default()));
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let agg = Arc::new(Aggregator::new(MemoryStore::new(), WriteDiscipline::Serialized));
        agg.track_activity(event(1)).await;
        let client = AggregatorClient::new(spawn_test_server(Arc::clone(&agg)).await).unwrap();
        let mut state = PopupState::new();

        state.confirm_clear(&client, Some(agg.store())).await;
        assert_eq!(agg.get_stats().await.total_activities, 1, "no clear without request");

        state.request_clear();
        state.cancel_clear();
        state.confirm_clear(&client, Some(agg.store())).await;
        assert_eq!(agg.get_stats().await.total_activities, 1, "cancelled");

        state.request_clear();
        state.confirm_clear(&client, Some(agg.store())).await;
        assert_eq!(agg.get_stats().await.total_activities, 0);
        assert_eq!(state.notice.as_deref(), Some("Data cleared"));
        assert!(state.is_empty());
        assert_eq!(state.mode, Mode::Browsing);
    }

    #[tokio::test]
    async fn unreachable_aggregator_still_shows_direct_read() {
        let store = MemoryStore::new();
        let agg = Aggregator::new(store, WriteDiscipline::Unserialized);
        agg.track_activity(event(4)).await;

        let mut state = PopupState::new();
        state.refresh(&dead_client(), Some(agg.store())).await;

        assert!(matches!(state.status, ConnectionStatus::Error(_)));
        assert_eq!(state.stats, StatsResponse::default());
        assert_eq!(state.recent.len(), 1);
    }

    #[tokio::test]
    async fn export_without_store_only_sets_notice() {
        let mut state = PopupState::new();
        let dir = tempfile::tempdir().unwrap();
        state.export::<MemoryStore>(None, dir.path(), "x").await;
        assert!(state.notice.unwrap().contains("DB_PATH"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn export_reports_why_the_store_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("tracker.db");
        let err = crate::store::SqliteStore::open_read_only(missing.to_str().unwrap())
            .await
            .err()
            .unwrap();

        let mut state = PopupState::new();
        state.store_error = Some(err.to_string());
        state.export::<MemoryStore>(None, dir.path(), "x").await;

        let notice = state.notice.unwrap();
        assert!(notice.starts_with("Export unavailable"), "{notice}");
        assert!(notice.contains(&err.to_string()));
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn export_writes_file_and_reports_path() {
        let agg = Aggregator::new(MemoryStore::new(), WriteDiscipline::Unserialized);
        agg.track_activity(event(2)).await;
        let mut state = PopupState::new();
        let dir = tempfile::tempdir().unwrap();

        state.export(Some(agg.store()), dir.path(), "marketplace-activity").await;

        assert!(state.notice.unwrap().starts_with("Exported to"));
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(agg.get_stats().await.total_activities, 1);
    }
}
