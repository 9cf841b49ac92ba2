//! Store double shared by the runtime's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use jabbot_core::{CounterStore, MemoryStore, StoreResult};

/// A memory store that counts plain `set` calls.
#[derive(Default)]
pub(crate) struct CountingStore {
    pub(crate) inner: MemoryStore,
    sets: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CounterStore for CountingStore {
    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn hash_set_if_not_exists(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> StoreResult<bool> {
        self.inner.hash_set_if_not_exists(key, field, value).await
    }

    async fn hash_increment(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        self.inner.hash_increment(key, field, delta).await
    }
}
