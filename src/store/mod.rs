//! Local key-value store shared by the aggregator (sole writer) and the popup
//! (direct reader). Values are JSON documents.
//!
//! There is no transaction spanning a read and a later write: a caller doing
//! read-modify-write can race another caller doing the same.

pub mod memory;
pub mod sqlite;

use std::future::Future;

use serde::de::DeserializeOwned;

use crate::config::keys;
use crate::error::Result;
use crate::types::{ActivityEntry, ListingRecord};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub trait KvStore: Send + Sync {
    /// Returns None when the key has never been written.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<serde_json::Value>>> + Send;

    /// Writes every entry in one batch.
    fn set_many(
        &self,
        entries: Vec<(String, serde_json::Value)>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Reads and decodes `key`, falling back to `T::default()` when it is absent.
pub async fn read_or_default<S, T>(store: &S, key: &str) -> Result<T>
where
    S: KvStore,
    T: DeserializeOwned + Default,
{
    match store.get(key).await? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(T::default()),
    }
}

pub async fn read_activity_log<S: KvStore>(store: &S) -> Result<Vec<ActivityEntry>> {
    read_or_default(store, keys::ACTIVITY_LOG).await
}

pub async fn read_listings<S: KvStore>(store: &S) -> Result<Vec<ListingRecord>> {
    read_or_default(store, keys::LISTINGS).await
}

/// Last `n` log entries, newest first. The log is stored oldest first.
pub fn newest_first(log: &[ActivityEntry], n: usize) -> Vec<ActivityEntry> {
    log.iter().rev().take(n).cloned().collect()
}

pub async fn read_recent_activities<S: KvStore>(store: &S, n: usize) -> Result<Vec<ActivityEntry>> {
    let log = read_activity_log(store).await?;
    Ok(newest_first(&log, n))
}
