use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::store::{self, KvStore};
use crate::types::{ActivityEntry, ListingRecord};

/// Export document. Field names match the store keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub activity_log: Vec<ActivityEntry>,
    pub listings_data: Vec<ListingRecord>,
}

impl ExportSnapshot {
    /// Reads both sequences straight from the store. Read-only.
    pub async fn read<S: KvStore>(store: &S) -> Result<Self> {
        Ok(Self {
            activity_log: store::read_activity_log(store).await?,
            listings_data: store::read_listings(store).await?,
        })
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

pub fn export_filename(prefix: &str, now_ms: i64) -> String {
    format!("{prefix}-{now_ms}.json")
}

/// Writes `<dir>/<prefix>-<now_ms>.json` and returns its path.
pub async fn export_to_dir<S: KvStore>(
    store: &S,
    dir: &Path,
    prefix: &str,
    now_ms: i64,
) -> Result<PathBuf> {
    let snapshot = ExportSnapshot::read(store).await?;
    let path = dir.join(export_filename(prefix, now_ms));
    tokio::fs::write(&path, snapshot.to_pretty_json()?).await?;
    info!(
        event = "EXPORT",
        activities = snapshot.activity_log.len(),
        listings = snapshot.listings_data.len(),
        "Exported to {}",
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{Aggregator, WriteDiscipline};
    use crate::store::MemoryStore;
    use crate::types::{ActivityType, Marketplace, TrackEvent};

    async fn populated() -> Aggregator<MemoryStore> {
        let agg = Aggregator::new(MemoryStore::new(), WriteDiscipline::Unserialized);
        let mut event = TrackEvent::new(ActivityType::ListingsViewed, Marketplace::Aliexpress, "https://aliexpress.ru/w/x");
        event.listings = vec![ListingRecord {
            id: "l1".to_string(),
            title: "USB hub".to_string(),
            marketplace: Marketplace::Aliexpress,
            timestamp: 5,
            url: "https://aliexpress.ru/w/x".to_string(),
            sales: Some(1200),
            price: Some("399 ₽".to_string()),
        }];
        event.details = Some(serde_json::json!({ "query": "hub" }));
        agg.track_activity(event).await;
        agg.track_activity(TrackEvent::new(ActivityType::ListingViewed, Marketplace::Ebay, "https://ebay.com/itm/2"))
            .await;
        agg
    }

    #[test]
    fn filename_pattern() {
        assert_eq!(export_filename("marketplace-activity", 1234), "marketplace-activity-1234.json");
    }

    #[tokio::test]
    async fn export_round_trips_to_identical_content() {
        let agg = populated().await;
        let dir = tempfile::tempdir().unwrap();

        let path = export_to_dir(agg.store(), dir.path(), "marketplace-activity", 99).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "marketplace-activity-99.json");

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"activity_log\""), "pretty-printed");
        let parsed = ExportSnapshot::from_json(&raw).unwrap();
        assert_eq!(parsed, ExportSnapshot::read(agg.store()).await.unwrap());
        assert_eq!(parsed.activity_log.len(), 2);
        assert_eq!(parsed.listings_data[0].sales, Some(1200));
    }

    #[tokio::test]
    async fn export_does_not_mutate_the_store() {
        let agg = populated().await;
        let before = ExportSnapshot::read(agg.store()).await.unwrap();
        let stats_before = agg.get_stats().await;

        let dir = tempfile::tempdir().unwrap();
        export_to_dir(agg.store(), dir.path(), "x", 1).await.unwrap();

        assert_eq!(ExportSnapshot::read(agg.store()).await.unwrap(), before);
        assert_eq!(agg.get_stats().await, stats_before);
    }
}
