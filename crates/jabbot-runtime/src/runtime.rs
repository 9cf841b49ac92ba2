//! The application context and its main loop.
//!
//! A [`JabbotRuntime`] owns everything a running bot needs: the frozen
//! sprocket registry (inside the [`Dispatcher`]), the session, the counter
//! store, the watchdog timers and the [`Lifecycle`]. Nothing is global;
//! tests build as many runtimes as they like.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use jabbot_runtime::{JabbotRuntime, load_config};
//!
//! let config = load_config()?;
//! let (session, events) = ConsoleSession::stdio();
//!
//! let runtime = JabbotRuntime::builder(config, session, events)
//!     .registry(registry)
//!     .build()?;
//!
//! let reason = runtime.run().await?;
//! std::process::exit(reason.exit_code());
//! ```
//!
//! # Run Phases
//!
//! 1. **Watchdog**: the heartbeat and defibrillator start as fatal tasks,
//!    before anything touches the network.
//! 2. **Boot**: connect and log in, bounded by `watchdog.boot_timeout_secs`.
//!    Failures and timeouts are logged and the bot keeps running degraded;
//!    the heartbeat stays silent and the defibrillator eventually recycles
//!    the process.
//! 3. **Pump**: each inbound event is dispatched on its own supervised task
//!    until an exit is requested or the event stream ends.
//! 4. **Drain**: in-flight dispatches get a grace period to finish.

use std::convert::Infallible;

use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use jabbot_core::{BoxedSession, BoxedStore, InboundEvent};
use jabbot_framework::{Dispatcher, SprocketRegistry, UsageRecorder};

use crate::config::{BotConfig, JabbotConfig};
use crate::error::RuntimeResult;
use crate::lifecycle::{ExitReason, Lifecycle};
use crate::store::select_store;
use crate::supervisor::{FaultPolicy, Supervisor};
use crate::watchdog::{Defibrillator, Heartbeat};

/// A fully wired bot, ready to [`run`](JabbotRuntime::run).
pub struct JabbotRuntime {
    config: JabbotConfig,
    session: BoxedSession,
    store: BoxedStore,
    events: mpsc::Receiver<InboundEvent>,
    dispatcher: Dispatcher,
    lifecycle: Lifecycle,
    supervisor: Supervisor,
}

impl JabbotRuntime {
    /// Starts building a runtime around a session and its event stream.
    pub fn builder(
        config: JabbotConfig,
        session: BoxedSession,
        events: mpsc::Receiver<InboundEvent>,
    ) -> RuntimeBuilder {
        RuntimeBuilder {
            config,
            session,
            events,
            registry: None,
            store: None,
            lifecycle: None,
        }
    }

    /// The lifecycle; requesting an exit on it stops [`run`](Self::run).
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &JabbotConfig {
        &self.config
    }

    /// Runs the bot until an exit is requested or the session closes.
    ///
    /// Returns the reason the bot stopped; map it to a process exit code
    /// with [`ExitReason::exit_code`].
    pub async fn run(self) -> RuntimeResult<ExitReason> {
        let Self {
            config,
            session,
            store,
            mut events,
            dispatcher,
            lifecycle,
            supervisor,
        } = self;

        let signals = listen_for_signals(lifecycle.clone())?;

        let heartbeat = Heartbeat::new(
            session.clone(),
            store,
            &config.store.key_prefix,
            config.watchdog.heartbeat_delay(),
            config.watchdog.heartbeat_interval(),
        );
        let watch = lifecycle.clone();
        supervisor.spawn_unbounded("heartbeat", FaultPolicy::Fatal, async move {
            heartbeat.run(watch).await;
            Ok::<(), Infallible>(())
        });

        let defibrillator = Defibrillator::new(config.watchdog.defibrillator());
        let watch = lifecycle.clone();
        supervisor.spawn_unbounded("defibrillator", FaultPolicy::Fatal, async move {
            defibrillator.run(watch).await;
            Ok::<(), Infallible>(())
        });

        let boot_timeout = config.watchdog.boot_timeout();
        tokio::select! {
            _ = lifecycle.cancelled() => {}
            booted = tokio::time::timeout(boot_timeout, boot(&session, &config.bot)) => {
                if booted.is_err() {
                    warn!(
                        timeout = ?boot_timeout,
                        "Connect and login did not finish, continuing without a session"
                    );
                }
            }
        }

        info!(
            bot = %config.bot.name,
            sprockets = dispatcher.registry().len(),
            "Jabbot is running"
        );

        loop {
            tokio::select! {
                biased;
                _ = lifecycle.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        let dispatcher = dispatcher.clone();
                        supervisor.spawn("dispatch", FaultPolicy::Contain, async move {
                            dispatcher.process(event).await;
                            Ok::<(), Infallible>(())
                        });
                    }
                    None => {
                        info!("Session event stream closed");
                        lifecycle.request_exit(ExitReason::SessionClosed);
                        break;
                    }
                },
            }
        }

        drop(events);
        supervisor
            .shutdown(config.dispatch.shutdown_grace())
            .await;
        if let Err(e) = signals.await {
            debug!(error = %e, "Signal listener did not finish cleanly");
        }

        let reason = lifecycle.exit_reason().unwrap_or(ExitReason::Signal);
        info!(%reason, exit_code = reason.exit_code(), "Exiting");
        Ok(reason)
    }
}

/// Builder for [`JabbotRuntime`].
pub struct RuntimeBuilder {
    config: JabbotConfig,
    session: BoxedSession,
    events: mpsc::Receiver<InboundEvent>,
    registry: Option<SprocketRegistry>,
    store: Option<BoxedStore>,
    lifecycle: Option<Lifecycle>,
}

impl RuntimeBuilder {
    /// Sets the sprocket registry. Defaults to an empty one.
    pub fn registry(mut self, registry: SprocketRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Uses this store instead of the one described by `[store]`.
    pub fn store(mut self, store: BoxedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Shares an existing lifecycle, e.g. one an embedding program also watches.
    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Wires everything together.
    pub fn build(self) -> RuntimeResult<JabbotRuntime> {
        let store = match self.store {
            Some(store) => store,
            None => select_store(&self.config.store)?,
        };
        let registry = self.registry.unwrap_or_default();
        let lifecycle = self.lifecycle.unwrap_or_default();

        let usage = UsageRecorder::new(store.clone(), self.config.store.key_prefix.clone());
        let dispatcher = Dispatcher::builder(registry, self.session.clone())
            .bot_name(self.config.bot.name.clone())
            .usage(usage)
            .usage_timeout(self.config.dispatch.usage_timeout())
            .fallback_reply(self.config.dispatch.fallback_reply.clone())
            .build();

        let supervisor = Supervisor::new(lifecycle.clone())
            .with_limit(self.config.dispatch.concurrency_limit());

        debug!(
            sprockets = dispatcher.registry().len(),
            max_in_flight = self.config.dispatch.max_in_flight,
            "Runtime built"
        );

        Ok(JabbotRuntime {
            config: self.config,
            session: self.session,
            store,
            events: self.events,
            dispatcher,
            lifecycle,
            supervisor,
        })
    }
}

/// Connects and logs in. Never fails: a bot that cannot reach its server
/// keeps running so the watchdog can recycle it.
async fn boot(session: &BoxedSession, bot: &BotConfig) {
    info!(server = ?bot.server, "Connecting");
    match session.connect().await {
        Ok(true) => {}
        Ok(false) => {
            warn!("Server refused the connection, continuing without a session");
            return;
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect, continuing without a session");
            return;
        }
    }

    match session.login(&bot.credentials()).await {
        Ok(true) => info!(name = %bot.name, "Logged in"),
        Ok(false) => warn!(name = %bot.name, "Login rejected"),
        Err(e) => warn!(name = %bot.name, error = %e, "Login failed"),
    }
}

/// Turns Ctrl+C and SIGTERM into an exit request. The listener stops on its
/// own once the lifecycle is cancelled for any other reason.
fn listen_for_signals(lifecycle: Lifecycle) -> RuntimeResult<JoinHandle<()>> {
    #[cfg(unix)]
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        let terminate = async {
            sigterm.recv().await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = lifecycle.cancelled() => {}
            result = signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("Received Ctrl+C, shutting down");
                    lifecycle.request_exit(ExitReason::Signal);
                }
                Err(e) => warn!(error = %e, "Ctrl+C handler unavailable"),
            },
            _ = terminate => {
                info!("Received SIGTERM, shutting down");
                lifecycle.request_exit(ExitReason::Signal);
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use jabbot_framework::{DEFAULT_FALLBACK_REPLY, Pattern, PatternContext, RegexSprocket};

    use jabbot_core::testing::{RecordingSession, Sent};

    use crate::test_support::CountingStore;

    fn private(from: &str, content: &str) -> InboundEvent {
        InboundEvent::Private {
            from: from.into(),
            to: "jabbot".into(),
            content: content.into(),
        }
    }

    fn echo_registry() -> SprocketRegistry {
        let echo = RegexSprocket::new("Echo Sprocket")
            .private_pattern(Pattern::regex(r"^echo (.+)$").unwrap())
            .on_private(|ctx: PatternContext| async move {
                let text = ctx.captures.get(1).unwrap_or_default().to_string();
                ctx.session.private_reply(ctx.message.from(), &text).await?;
                Ok(())
            });
        SprocketRegistry::builder().register(echo).unwrap().build()
    }

    #[tokio::test]
    async fn test_runs_until_session_closes() {
        let session = RecordingSession::new();
        let store = Arc::new(CountingStore::default());
        let (tx, rx) = mpsc::channel(8);

        let runtime = JabbotRuntime::builder(JabbotConfig::default(), session.clone(), rx)
            .registry(echo_registry())
            .store(store.clone())
            .build()
            .unwrap();

        tx.send(private("alice", "echo hi")).await.unwrap();
        tx.send(private("bob", "what?")).await.unwrap();
        drop(tx);

        let reason = runtime.run().await.unwrap();
        assert_eq!(reason, ExitReason::SessionClosed);
        assert_eq!(reason.exit_code(), 0);
        assert_eq!(session.logins(), 1);

        let sent = session.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.contains(&Sent::Private {
            to: "alice".into(),
            text: "hi".into()
        }));
        assert!(sent.contains(&Sent::Private {
            to: "bob".into(),
            text: DEFAULT_FALLBACK_REPLY.into()
        }));
        assert_eq!(
            store
                .inner
                .counter("Jabbot:Statistics:Sprockets:Usage:AllTime", "Echo Sprocket"),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_ignores_own_messages() {
        let session = RecordingSession::new();
        let (tx, rx) = mpsc::channel(8);
        let runtime = JabbotRuntime::builder(JabbotConfig::default(), session.clone(), rx)
            .store(Arc::new(CountingStore::default()))
            .build()
            .unwrap();

        tx.send(private("Jabbot", "echo me")).await.unwrap();
        drop(tx);

        runtime.run().await.unwrap();
        assert!(session.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_defibrillator_recycles_process() {
        let session = RecordingSession::new();
        let store = Arc::new(CountingStore::default());
        let (_tx, rx) = mpsc::channel(8);

        let runtime = JabbotRuntime::builder(JabbotConfig::default(), session.clone(), rx)
            .store(store.clone())
            .build()
            .unwrap();

        let reason = runtime.run().await.unwrap();
        assert_eq!(reason, ExitReason::Defibrillator);
        assert_eq!(reason.exit_code(), 0);

        // 10s delay, then every 300s until the 3600s mark.
        assert_eq!(store.sets(), 12);
        assert!(store.inner.get("Jabbot:LastSeen").is_some());
    }

    #[tokio::test]
    async fn test_external_fault_exits_with_failure() {
        let (_tx, rx) = mpsc::channel(8);
        let lifecycle = Lifecycle::new();
        let runtime = JabbotRuntime::builder(JabbotConfig::default(), RecordingSession::new(), rx)
            .store(Arc::new(CountingStore::default()))
            .lifecycle(lifecycle.clone())
            .build()
            .unwrap();

        lifecycle.request_exit(ExitReason::Fault("session wedged".into()));
        let reason = runtime.run().await.unwrap();
        assert_eq!(reason.exit_code(), -1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_connect_runs_degraded() {
        let session = RecordingSession::new();
        session.refuse_connect();
        let store = Arc::new(CountingStore::default());
        let (tx, rx) = mpsc::channel(8);

        let runtime = JabbotRuntime::builder(JabbotConfig::default(), session.clone(), rx)
            .store(store.clone())
            .build()
            .unwrap();
        let lifecycle = runtime.lifecycle().clone();
        let task = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_secs(700)).await;
        assert_eq!(session.logins(), 0);
        assert_eq!(store.sets(), 0);

        tx.send(private("alice", "hello")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(session.sent().len(), 1);

        lifecycle.request_exit(ExitReason::Signal);
        assert_eq!(task.await.unwrap().unwrap(), ExitReason::Signal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_connect_still_recycles() {
        let session = RecordingSession::new();
        session.hang_connect();
        let store = Arc::new(CountingStore::default());
        let (_tx, rx) = mpsc::channel(8);

        let runtime = JabbotRuntime::builder(JabbotConfig::default(), session.clone(), rx)
            .store(store.clone())
            .build()
            .unwrap();

        let reason = tokio::time::timeout(Duration::from_secs(3 * 3600), runtime.run())
            .await
            .expect("runtime exited")
            .unwrap();
        assert_eq!(reason, ExitReason::Defibrillator);
        assert_eq!(session.logins(), 0);
        assert_eq!(store.sets(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_is_armed_while_boot_hangs() {
        let session = RecordingSession::new();
        session.hang_connect();
        let mut config = JabbotConfig::default();
        config.watchdog.boot_timeout_secs = 24 * 3600;
        let (_tx, rx) = mpsc::channel(8);

        let runtime = JabbotRuntime::builder(config, session, rx)
            .store(Arc::new(CountingStore::default()))
            .build()
            .unwrap();

        let started = tokio::time::Instant::now();
        assert_eq!(runtime.run().await.unwrap(), ExitReason::Defibrillator);
        assert!(started.elapsed() < Duration::from_secs(3601));
    }

    #[test]
    fn test_build_rejects_bad_store_url() {
        let (_tx, rx) = mpsc::channel(1);
        let mut config = JabbotConfig::default();
        config.store.url = Some("ftp://nowhere".into());

        assert!(JabbotRuntime::builder(config, RecordingSession::new(), rx).build().is_err());
    }
}
