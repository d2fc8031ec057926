//! Typed cache entries over the key-value store
//!
//! Every cached value is wrapped in a [`CacheEntry`] envelope recording when
//! it was written. The envelope is shape-validated on read: a persisted value
//! that is not exactly `{ last_updated, data }` is surfaced as
//! [`CacheError::Corrupt`] rather than returned malformed or silently
//! evicted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::store::{KeyValueStore, StoreError};

/// Timestamped wrapper around a cached value
///
/// Immutable once written; a new save under the same key fully replaces the
/// prior entry. `deny_unknown_fields` makes the on-read shape check exact:
/// both fields required, no extras tolerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheEntry<T> {
    /// Wall-clock time of the write that produced this entry
    pub last_updated: DateTime<Utc>,
    /// The cached data
    pub data: T,
}

/// Errors that can occur reading or writing cache entries
#[derive(Debug, Error)]
pub enum CacheError {
    /// A persisted value exists but does not match the entry envelope.
    /// Never auto-repaired; the caller decides what to do with it.
    #[error("corrupt cache entry at key '{key}'")]
    Corrupt { key: String },

    /// The backing store failed
    #[error("cache store access failed: {0}")]
    Store(#[from] StoreError),

    /// Serializing an entry for writing failed
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Typed save/remove/find over the key-value store
///
/// A cache miss is a normal `Ok(None)` outcome, distinct from
/// [`CacheError::Corrupt`].
#[derive(Clone)]
pub struct EntryStore {
    store: Arc<dyn KeyValueStore>,
}

impl EntryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saves `data` under `key`, stamped with the current time.
    ///
    /// Overwrites any prior value at `key`.
    pub async fn save<T: Serialize>(&self, key: &str, data: &T) -> Result<(), CacheError> {
        let entry = CacheEntry {
            last_updated: Utc::now(),
            data,
        };
        let raw = serde_json::to_string(&entry)?;
        self.store.set(key, &raw).await?;
        Ok(())
    }

    /// Deletes the entry at `key`; a no-op if the key is absent
    pub async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(key).await?;
        Ok(())
    }

    /// Looks up the entry at `key`.
    ///
    /// Returns `Ok(None)` on a miss. A present value that fails the envelope
    /// shape check fails with [`CacheError::Corrupt`].
    pub async fn find<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<CacheEntry<T>>, CacheError> {
        let raw = match self.store.get(key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let entry = serde_json::from_str(&raw).map_err(|_| CacheError::Corrupt {
            key: key.to_string(),
        })?;

        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};
    use chrono::Duration;
    use serde_json::{json, Value};

    fn entry_store() -> (EntryStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (EntryStore::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_save_then_find_roundtrip() {
        let (cache, _store) = entry_store();
        let payload = json!({"temp": 70});

        let before = Utc::now();
        cache.save("30301-current", &payload).await.unwrap();
        let after = Utc::now();

        let entry: CacheEntry<Value> = cache
            .find("30301-current")
            .await
            .unwrap()
            .expect("entry should exist");

        assert_eq!(entry.data, payload);
        assert!(entry.last_updated >= before - Duration::seconds(1));
        assert!(entry.last_updated <= after + Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_find_absent_key_returns_none() {
        let (cache, _store) = entry_store();
        let found: Option<CacheEntry<Value>> = cache.find("nowhere").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_remove_absent_key_is_ok() {
        let (cache, _store) = entry_store();
        cache.remove("nowhere").await.unwrap();
        let found: Option<CacheEntry<Value>> = cache.find("nowhere").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_remove_deletes_entry() {
        let (cache, _store) = entry_store();
        cache.save("k", &json!(1)).await.unwrap();
        cache.remove("k").await.unwrap();
        let found: Option<CacheEntry<Value>> = cache.find("k").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_prior_entry() {
        let (cache, _store) = entry_store();
        cache.save("k", &json!("first")).await.unwrap();
        cache.save("k", &json!("second")).await.unwrap();

        let entry: CacheEntry<Value> = cache.find("k").await.unwrap().unwrap();
        assert_eq!(entry.data, json!("second"));
    }

    #[tokio::test]
    async fn test_missing_data_field_is_corrupt() {
        let (cache, store) = entry_store();
        store
            .set("bad", "{\"last_updated\":\"2024-01-01T00:00:00Z\"}")
            .await
            .unwrap();

        let result = cache.find::<Value>("bad").await;
        assert!(matches!(result, Err(CacheError::Corrupt { key }) if key == "bad"));
    }

    #[tokio::test]
    async fn test_missing_timestamp_field_is_corrupt() {
        let (cache, store) = entry_store();
        store.set("bad", "{\"data\":{}}").await.unwrap();

        let result = cache.find::<Value>("bad").await;
        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_extra_field_is_corrupt() {
        let (cache, store) = entry_store();
        store
            .set(
                "bad",
                "{\"last_updated\":\"2024-01-01T00:00:00Z\",\"data\":{},\"extra\":true}",
            )
            .await
            .unwrap();

        let result = cache.find::<Value>("bad").await;
        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_unparseable_json_is_corrupt() {
        let (cache, store) = entry_store();
        store.set("bad", "not json at all").await.unwrap();

        let result = cache.find::<Value>("bad").await;
        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_not_evicted() {
        let (cache, store) = entry_store();
        store.set("bad", "not json at all").await.unwrap();

        let _ = cache.find::<Value>("bad").await;
        assert_eq!(
            store.get("bad").await.unwrap(),
            Some("not json at all".to_string())
        );
    }
}
