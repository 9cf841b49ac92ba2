//! The liveness watchdog: two timers independent of the dispatch engine.
//!
//! - [`Heartbeat`]: after an initial delay, periodically writes the current
//!   UTC time to `{prefix}:LastSeen` while the session reports itself
//!   connected. External monitoring reads the key to tell a live bot from a
//!   dead one. A failed write is logged; the next tick tries again.
//! - [`Defibrillator`]: a one-shot timer that requests a process exit after a
//!   fixed lifetime, whatever the observed health. It recovers from states
//!   the process cannot detect itself, such as a wedged session that still
//!   claims to be connected.
//!
//! Both stop as soon as the [`Lifecycle`] is cancelled.

use std::time::Duration;

use chrono::Utc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use jabbot_core::{BoxedSession, BoxedStore};

use crate::lifecycle::{ExitReason, Lifecycle};

/// Timestamp format of the `LastSeen` key.
pub const LAST_SEEN_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Result of a single heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatOutcome {
    /// The session was not connected.
    Skipped,
    /// The timestamp was written.
    Written,
    /// The store write failed.
    Failed,
}

/// Periodic liveness report.
pub struct Heartbeat {
    session: BoxedSession,
    store: BoxedStore,
    key: String,
    delay: Duration,
    interval: Duration,
}

impl Heartbeat {
    pub fn new(
        session: BoxedSession,
        store: BoxedStore,
        key_prefix: &str,
        delay: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            session,
            store,
            key: format!("{key_prefix}:LastSeen"),
            delay,
            interval,
        }
    }

    /// The key the timestamp is written to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Performs one tick.
    pub async fn beat(&self) -> BeatOutcome {
        if !self.session.is_connected() {
            debug!("Session not connected, skipping heartbeat");
            return BeatOutcome::Skipped;
        }

        let now = Utc::now().format(LAST_SEEN_FORMAT).to_string();
        match self.store.set(&self.key, &now).await {
            Ok(()) => {
                debug!(key = %self.key, at = %now, "Heartbeat");
                BeatOutcome::Written
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to write heartbeat");
                BeatOutcome::Failed
            }
        }
    }

    /// Ticks until the lifecycle is cancelled.
    pub async fn run(self, lifecycle: Lifecycle) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.delay, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = lifecycle.cancelled() => break,
                _ = ticker.tick() => {
                    self.beat().await;
                }
            }
        }
        debug!("Heartbeat stopped");
    }
}

/// One-shot forced recycle.
#[derive(Debug, Clone, Copy)]
pub struct Defibrillator {
    after: Duration,
}

impl Defibrillator {
    pub fn new(after: Duration) -> Self {
        Self { after }
    }

    /// Sleeps, then requests an exit. Returns `true` if it fired, `false`
    /// if the lifecycle was cancelled first.
    pub async fn run(self, lifecycle: Lifecycle) -> bool {
        tokio::select! {
            _ = lifecycle.cancelled() => false,
            _ = tokio::time::sleep(self.after) => {
                warn!(after_secs = self.after.as_secs(), "Defibrillator fired, recycling process");
                lifecycle.request_exit(ExitReason::Defibrillator);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CountingStore;
    use jabbot_core::testing::RecordingSession;
    use std::sync::Arc;

    const SECOND: Duration = Duration::from_secs(1);

    fn heartbeat(session: Arc<RecordingSession>, store: Arc<CountingStore>) -> Heartbeat {
        Heartbeat::new(session, store, "Jabbot", 10 * SECOND, 300 * SECOND)
    }

    #[tokio::test]
    async fn test_beat_writes_timestamp_only_when_connected() {
        let session = RecordingSession::new();
        let store = Arc::new(CountingStore::default());
        let heartbeat = heartbeat(session.clone(), store.clone());

        assert_eq!(heartbeat.beat().await, BeatOutcome::Skipped);
        assert_eq!(store.inner.get("Jabbot:LastSeen"), None);

        session.set_connected(true);
        assert_eq!(heartbeat.beat().await, BeatOutcome::Written);

        let written = store.inner.get("Jabbot:LastSeen").unwrap();
        assert!(written.ends_with('Z'));
        assert!(chrono::NaiveDateTime::parse_from_str(&written, LAST_SEEN_FORMAT).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_schedule() {
        let session = RecordingSession::new();
        session.set_connected(true);
        let store = Arc::new(CountingStore::default());
        let lifecycle = Lifecycle::new();
        let task = tokio::spawn(heartbeat(session.clone(), store.clone()).run(lifecycle.clone()));

        tokio::time::sleep(9 * SECOND).await;
        assert_eq!(store.sets(), 0);

        tokio::time::sleep(2 * SECOND).await;
        assert_eq!(store.sets(), 1);

        tokio::time::sleep(300 * SECOND).await;
        assert_eq!(store.sets(), 2);

        session.set_connected(false);
        tokio::time::sleep(300 * SECOND).await;
        assert_eq!(store.sets(), 2);

        lifecycle.request_exit(ExitReason::Signal);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_defibrillator_fires_once() {
        let lifecycle = Lifecycle::new();
        let fired = Defibrillator::new(3600 * SECOND)
            .run(lifecycle.clone())
            .await;

        assert!(fired);
        assert_eq!(lifecycle.exit_reason(), Some(ExitReason::Defibrillator));
    }

    #[tokio::test(start_paused = true)]
    async fn test_defibrillator_stops_on_cancel() {
        let lifecycle = Lifecycle::new();
        let task = tokio::spawn(Defibrillator::new(3600 * SECOND).run(lifecycle.clone()));

        tokio::time::sleep(60 * SECOND).await;
        lifecycle.request_exit(ExitReason::SessionClosed);

        assert!(!task.await.unwrap());
        assert_eq!(lifecycle.exit_reason(), Some(ExitReason::SessionClosed));
    }
}
