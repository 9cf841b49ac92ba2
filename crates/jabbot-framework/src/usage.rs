//! Per-sprocket usage counters.
//!
//! Every handled message bumps four hash counters, one per [`UsageBucket`],
//! with the sprocket name as the hash field:
//!
//! ```text
//! Jabbot:Statistics:Sprockets:Usage:AllTime   "Auto-Stache Sprocket" -> 42
//! Jabbot:Statistics:Sprockets:Usage:2024      "Auto-Stache Sprocket" -> 17
//! Jabbot:Statistics:Sprockets:Usage:202403    "Auto-Stache Sprocket" -> 5
//! Jabbot:Statistics:Sprockets:Usage:20240305  "Auto-Stache Sprocket" -> 2
//! ```
//!
//! Each counter is first created with `0` if absent (never reset), then
//! incremented on the store side. Store faults are logged and swallowed; a
//! failed bucket is simply undercounted.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{trace, warn};

use jabbot_core::{BoxedStore, StoreResult};

/// Default key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "Jabbot";

/// A rolling time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageBucket {
    AllTime,
    Year,
    Month,
    Day,
}

impl UsageBucket {
    /// Every bucket, in key order.
    pub const ALL: [UsageBucket; 4] = [Self::AllTime, Self::Year, Self::Month, Self::Day];

    /// The bucket's key suffix for a point in time (`AllTime`, `yyyy`, `yyyyMM`, `yyyyMMdd`).
    pub fn label(&self, at: DateTime<Utc>) -> String {
        match self {
            Self::AllTime => "AllTime".to_string(),
            Self::Year => at.format("%Y").to_string(),
            Self::Month => at.format("%Y%m").to_string(),
            Self::Day => at.format("%Y%m%d").to_string(),
        }
    }

    /// The full hash key for a point in time.
    pub fn key(&self, prefix: &str, at: DateTime<Utc>) -> String {
        format!("{prefix}:Statistics:Sprockets:Usage:{}", self.label(at))
    }
}

impl fmt::Display for UsageBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AllTime => "all-time",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
        };
        f.write_str(name)
    }
}

/// Outcome of one [`UsageRecorder::record`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageReport {
    /// Buckets that were incremented.
    pub recorded: usize,
    /// Buckets whose store calls failed.
    pub failed: usize,
}

impl UsageReport {
    /// Whether all four buckets were incremented.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.recorded == UsageBucket::ALL.len()
    }
}

/// Writes usage counters to a [`CounterStore`](jabbot_core::CounterStore).
#[derive(Clone)]
pub struct UsageRecorder {
    store: BoxedStore,
    prefix: Arc<str>,
}

impl UsageRecorder {
    /// Creates a recorder writing under `prefix`.
    pub fn new(store: BoxedStore, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().into(),
        }
    }

    /// Returns the key prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Records one use of `sprocket` at `at`.
    ///
    /// The four buckets are updated concurrently and independently.
    pub async fn record(&self, sprocket: &str, at: DateTime<Utc>) -> UsageReport {
        let results = join_all(
            UsageBucket::ALL
                .iter()
                .map(|bucket| self.bump(*bucket, sprocket, at)),
        )
        .await;

        let mut report = UsageReport::default();
        for (bucket, result) in UsageBucket::ALL.iter().zip(results) {
            match result {
                Ok(count) => {
                    trace!(sprocket, %bucket, count, "Usage counter incremented");
                    report.recorded += 1;
                }
                Err(e) => {
                    warn!(sprocket, %bucket, error = %e, "Failed to record sprocket usage");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn bump(&self, bucket: UsageBucket, sprocket: &str, at: DateTime<Utc>) -> StoreResult<i64> {
        let key = bucket.key(&self.prefix, at);
        self.store.hash_set_if_not_exists(&key, sprocket, "0").await?;
        self.store.hash_increment(&key, sprocket, 1).await
    }
}

impl fmt::Debug for UsageRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageRecorder")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use jabbot_core::{CounterStore, MemoryStore, StoreError};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 17, 30, 0).unwrap()
    }

    #[test]
    fn test_bucket_keys() {
        let keys: Vec<_> = UsageBucket::ALL
            .iter()
            .map(|b| b.key("Jabbot", at()))
            .collect();
        assert_eq!(
            keys,
            [
                "Jabbot:Statistics:Sprockets:Usage:AllTime",
                "Jabbot:Statistics:Sprockets:Usage:2024",
                "Jabbot:Statistics:Sprockets:Usage:202403",
                "Jabbot:Statistics:Sprockets:Usage:20240305",
            ]
        );
    }

    #[tokio::test]
    async fn test_n_records_count_n_in_every_bucket() {
        let store = Arc::new(MemoryStore::new());
        let recorder = UsageRecorder::new(store.clone(), DEFAULT_KEY_PREFIX);

        for _ in 0..3 {
            let report = recorder.record("X", at()).await;
            assert!(report.is_complete());
        }

        for bucket in UsageBucket::ALL {
            assert_eq!(store.counter(&bucket.key("Jabbot", at()), "X"), Some(3));
        }
    }

    #[tokio::test]
    async fn test_existing_counter_is_not_reset() {
        let store = Arc::new(MemoryStore::new());
        let key = UsageBucket::AllTime.key("Jabbot", at());
        store.hash_increment(&key, "X", 41).await.unwrap();

        UsageRecorder::new(store.clone(), "Jabbot")
            .record("X", at())
            .await;

        assert_eq!(store.counter(&key, "X"), Some(42));
    }

    /// Fails every call touching the day bucket.
    struct FlakyStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl CounterStore for FlakyStore {
        async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
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
            if key.ends_with("20240305") {
                return Err(StoreError::Connection("connection reset".into()));
            }
            self.inner.hash_increment(key, field, delta).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_contained_per_bucket() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
        });
        let report = UsageRecorder::new(store.clone(), "Jabbot")
            .record("X", at())
            .await;

        assert_eq!(report, UsageReport { recorded: 3, failed: 1 });
        assert_eq!(
            store
                .inner
                .counter(&UsageBucket::Year.key("Jabbot", at()), "X"),
            Some(1)
        );
    }
}
