use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use crate::error::{AppError, Result};
use crate::store::KvStore;

/// Process-local store. Used when `DB_PATH=:memory:` and by tests, which can
/// inject read/write failures and force a yield between a read and the
/// caller's next step to reproduce interleavings.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, serde_json::Value>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    yield_after_read: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, v: bool) {
        self.fail_reads.store(v, Ordering::Relaxed);
    }

    pub fn set_fail_writes(&self, v: bool) {
        self.fail_writes.store(v, Ordering::Relaxed);
    }

    /// When set, `get` snapshots the value and then yields to the scheduler
    /// before returning it.
    pub fn set_yield_after_read(&self, v: bool) {
        self.yield_after_read.store(v, Ordering::Relaxed);
    }
}

impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(AppError::Storage(format!("read of {key} failed")));
        }
        let snapshot = self.entries.get(key).map(|v| v.value().clone());
        if self.yield_after_read.load(Ordering::Relaxed) {
            tokio::task::yield_now().await;
        }
        Ok(snapshot)
    }

    async fn set_many(&self, entries: Vec<(String, serde_json::Value)>) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(AppError::Storage("write failed".to_string()));
        }
        for (key, value) in entries {
            self.entries.insert(key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn injected_failures_surface_as_storage_errors() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let err = store
            .set_many(vec![("k".to_string(), json!(1))])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));

        store.set_fail_writes(false);
        store.set_many(vec![("k".to_string(), json!(1))]).await.unwrap();
        store.set_fail_reads(true);
        assert!(store.get("k").await.is_err());
        store.set_fail_reads(false);
        assert_eq!(store.get("k").await.unwrap(), Some(json!(1)));
    }
}
