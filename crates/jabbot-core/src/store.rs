//! The counter/liveness store contract.
//!
//! Usage accounting and the heartbeat write to an external key-value store.
//! The store is hit concurrently by many dispatches and the heartbeat timer,
//! so increments must be atomic on the store side: callers never
//! read-modify-write.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{StoreError, StoreResult};

/// A key-value store with hash fields and atomic increments.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Overwrites a plain string key.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Sets a hash field only if it does not exist yet.
    ///
    /// Returns `true` if the field was created.
    async fn hash_set_if_not_exists(&self, key: &str, field: &str, value: &str)
    -> StoreResult<bool>;

    /// Atomically adds `delta` to a hash field, returning the new value.
    async fn hash_increment(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;
}

/// Shared store handle.
pub type BoxedStore = Arc<dyn CounterStore>;

// ============================================================================
// In-process store
// ============================================================================

#[derive(Default)]
struct MemoryData {
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
}

/// An in-process [`CounterStore`].
///
/// Every operation runs under one lock, so increments are atomic. Used when
/// no external store is configured, and in tests.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a plain string key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.lock().strings.get(key).cloned()
    }

    /// Reads a hash field.
    pub fn hash_get(&self, key: &str, field: &str) -> Option<String> {
        self.data
            .lock()
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned()
    }

    /// Reads a hash field as a counter.
    pub fn counter(&self, key: &str, field: &str) -> Option<i64> {
        self.hash_get(key, field).and_then(|v| v.parse().ok())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.data
            .lock()
            .strings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_set_if_not_exists(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> StoreResult<bool> {
        let mut data = self.data.lock();
        let hash = data.hashes.entry(key.to_string()).or_default();
        if hash.contains_key(field) {
            return Ok(false);
        }
        hash.insert(field.to_string(), value.to_string());
        Ok(true)
    }

    async fn hash_increment(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let mut data = self.data.lock();
        let slot = data
            .hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert_with(|| "0".to_string());

        let current: i64 = slot.parse().map_err(|_| StoreError::NotAnInteger {
            key: format!("{key}/{field}"),
        })?;
        let next = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::Command("increment would overflow".to_string()))?;
        *slot = next.to_string();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = MemoryStore::new();
        store.set("Jabbot:LastSeen", "first").await.unwrap();
        store.set("Jabbot:LastSeen", "second").await.unwrap();
        assert_eq!(store.get("Jabbot:LastSeen").as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_set_if_not_exists_never_resets() {
        let store = MemoryStore::new();
        assert!(store.hash_set_if_not_exists("h", "f", "0").await.unwrap());
        store.hash_increment("h", "f", 5).await.unwrap();

        assert!(!store.hash_set_if_not_exists("h", "f", "0").await.unwrap());
        assert_eq!(store.counter("h", "f"), Some(5));
    }

    #[tokio::test]
    async fn test_increment_missing_field_starts_at_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.hash_increment("h", "f", 1).await.unwrap(), 1);
        assert_eq!(store.hash_increment("h", "f", 2).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_increment_non_integer_fails() {
        let store = MemoryStore::new();
        store.hash_set_if_not_exists("h", "f", "abc").await.unwrap();
        let err = store.hash_increment("h", "f", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotAnInteger { .. }));
    }
}
