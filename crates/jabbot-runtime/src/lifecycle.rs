//! Process lifecycle: the shared "should exit" flag.
//!
//! A [`Lifecycle`] is a [`CancellationToken`] plus the reason it was
//! cancelled. Any component may request an exit; the first reason wins and
//! every task selecting on [`Lifecycle::cancelled`] wakes up.
//!
//! Exiting is how the bot heals itself: the process supervisor (systemd,
//! a container runtime, ...) restarts it. [`ExitReason::exit_code`] tells
//! the supervisor whether the exit was a planned recycle or a fault.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Why the process is exiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The defibrillator's hard lifetime elapsed.
    Defibrillator,
    /// Ctrl+C, SIGTERM, or a direct cancellation of the token.
    Signal,
    /// The session's event stream ended.
    SessionClosed,
    /// A critical task failed.
    Fault(String),
}

impl ExitReason {
    /// Process exit code: `-1` for faults, `0` for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Fault(_) => -1,
            Self::Defibrillator | Self::Signal | Self::SessionClosed => 0,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defibrillator => f.write_str("defibrillator"),
            Self::Signal => f.write_str("signal"),
            Self::SessionClosed => f.write_str("session closed"),
            Self::Fault(msg) => write!(f, "fault: {msg}"),
        }
    }
}

/// The shared exit flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    token: CancellationToken,
    reason: Arc<OnceLock<ExitReason>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an exit. Returns `true` if this call set the reason.
    pub fn request_exit(&self, reason: ExitReason) -> bool {
        let first = self.reason.set(reason.clone()).is_ok();
        if first {
            info!(%reason, "Exit requested");
        } else {
            debug!(%reason, "Exit already requested, ignoring");
        }
        self.token.cancel();
        first
    }

    /// Whether an exit has been requested.
    pub fn should_exit(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once an exit has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// The first requested reason, if any.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.reason.get().cloned()
    }

    /// A token cancelled together with this lifecycle.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitReason::Defibrillator.exit_code(), 0);
        assert_eq!(ExitReason::Signal.exit_code(), 0);
        assert_eq!(ExitReason::SessionClosed.exit_code(), 0);
        assert_eq!(ExitReason::Fault("heartbeat".into()).exit_code(), -1);
    }

    #[test]
    fn test_first_reason_wins() {
        let lifecycle = Lifecycle::new();
        let clone = lifecycle.clone();
        assert!(!lifecycle.should_exit());

        assert!(clone.request_exit(ExitReason::Defibrillator));
        assert!(!lifecycle.request_exit(ExitReason::Signal));

        assert!(lifecycle.should_exit());
        assert_eq!(lifecycle.exit_reason(), Some(ExitReason::Defibrillator));
        assert!(lifecycle.child_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let lifecycle = Lifecycle::new();
        let waiter = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.cancelled().await })
        };

        lifecycle.request_exit(ExitReason::SessionClosed);
        waiter.await.unwrap();
    }
}
