//! Supervised background work.
//!
//! Every unit of work the runtime starts, whether an event dispatch or one of
//! the watchdog timers, goes through [`Supervisor::spawn`]. The supervisor:
//!
//! - tracks the task on a [`TaskTracker`] so shutdown can drain it,
//! - optionally bounds concurrency with a semaphore; the permit is acquired
//!   inside the spawned task, so spawning never waits,
//! - catches errors and panics at the task boundary and applies the task's
//!   [`FaultPolicy`].

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::lifecycle::{ExitReason, Lifecycle};

/// What to do when a supervised task fails or panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Log and carry on.
    Contain,
    /// Log as fatal and request a process exit.
    Fatal,
}

/// Spawns and tracks supervised tasks.
#[derive(Debug, Clone)]
pub struct Supervisor {
    tracker: TaskTracker,
    limit: Option<Arc<Semaphore>>,
    lifecycle: Lifecycle,
}

impl Supervisor {
    /// Creates a supervisor with no concurrency limit.
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self {
            tracker: TaskTracker::new(),
            limit: None,
            lifecycle,
        }
    }

    /// Bounds the number of concurrently running tasks. `None` or `0` is unbounded.
    pub fn with_limit(mut self, max_in_flight: Option<usize>) -> Self {
        self.limit = max_in_flight
            .filter(|n| *n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    /// Spawns a supervised task that counts against the concurrency limit.
    pub fn spawn<F, E>(&self, name: &'static str, policy: FaultPolicy, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.spawn_with(name, policy, self.limit.clone(), task)
    }

    /// Spawns a long-lived supervised task that never waits for a permit.
    pub fn spawn_unbounded<F, E>(
        &self,
        name: &'static str,
        policy: FaultPolicy,
        task: F,
    ) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.spawn_with(name, policy, None, task)
    }

    fn spawn_with<F, E>(
        &self,
        name: &'static str,
        policy: FaultPolicy,
        limit: Option<Arc<Semaphore>>,
        task: F,
    ) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let lifecycle = self.lifecycle.clone();

        self.tracker.spawn(async move {
            let _permit = match limit {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };

            let fault = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("panicked: {}", panic_message(&*panic)),
            };

            match policy {
                FaultPolicy::Contain => {
                    warn!(task = name, error = %fault, "Supervised task failed");
                }
                FaultPolicy::Fatal => {
                    error!(task = name, error = %fault, "Critical task failed, shutting down");
                    lifecycle.request_exit(ExitReason::Fault(format!("{name}: {fault}")));
                }
            }
        })
    }

    /// Number of tasks still running or waiting for a permit.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Closes the tracker and waits up to `grace` for tracked tasks.
    /// Returns `true` if everything finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        debug!(in_flight = self.tracker.len(), "Draining supervised tasks");

        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    in_flight = self.tracker.len(),
                    grace_secs = grace.as_secs(),
                    "Tasks still running after shutdown grace period"
                );
                false
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_contained_failures_do_not_exit() {
        let lifecycle = Lifecycle::new();
        let supervisor = Supervisor::new(lifecycle.clone());

        supervisor.spawn("failing", FaultPolicy::Contain, async { Err("boom") });
        supervisor
            .spawn("panicking", FaultPolicy::Contain, async {
                if true {
                    panic!("kaboom");
                }
                Ok::<(), Infallible>(())
            })
            .await
            .unwrap();

        assert!(supervisor.shutdown(Duration::from_secs(1)).await);
        assert!(!lifecycle.should_exit());
    }

    #[tokio::test]
    async fn test_fatal_failure_requests_exit() {
        let lifecycle = Lifecycle::new();
        let supervisor = Supervisor::new(lifecycle.clone());

        supervisor
            .spawn("heartbeat", FaultPolicy::Fatal, async { Err("store gone") })
            .await
            .unwrap();

        assert_eq!(
            lifecycle.exit_reason(),
            Some(ExitReason::Fault("heartbeat: store gone".into()))
        );
    }

    #[tokio::test]
    async fn test_fatal_panic_requests_exit() {
        let lifecycle = Lifecycle::new();
        let supervisor = Supervisor::new(lifecycle.clone());

        supervisor
            .spawn("defibrillator", FaultPolicy::Fatal, async {
                if true {
                    panic!("wedged");
                }
                Ok::<(), Infallible>(())
            })
            .await
            .unwrap();

        assert_eq!(lifecycle.exit_reason().map(|r| r.exit_code()), Some(-1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_bounds_concurrency() {
        let supervisor = Supervisor::new(Lifecycle::new()).with_limit(Some(2));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            supervisor.spawn("work", FaultPolicy::Contain, async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(1)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), Infallible>(())
            });
        }

        assert!(supervisor.shutdown(Duration::from_secs(10)).await);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_tasks_skip_the_limit() {
        let lifecycle = Lifecycle::new();
        let supervisor = Supervisor::new(lifecycle.clone()).with_limit(Some(1));

        let service = {
            let lifecycle = lifecycle.clone();
            supervisor.spawn_unbounded("service", FaultPolicy::Fatal, async move {
                lifecycle.cancelled().await;
                Ok::<(), Infallible>(())
            })
        };
        supervisor
            .spawn("work", FaultPolicy::Contain, async { Ok::<(), Infallible>(()) })
            .await
            .unwrap();

        lifecycle.request_exit(ExitReason::Signal);
        service.await.unwrap();
        assert!(supervisor.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_gives_up_after_grace() {
        let supervisor = Supervisor::new(Lifecycle::new());
        supervisor.spawn("stuck", FaultPolicy::Contain, async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<(), Infallible>(())
        });

        assert!(!supervisor.shutdown(Duration::from_secs(5)).await);
        assert_eq!(supervisor.in_flight(), 1);
    }
}
