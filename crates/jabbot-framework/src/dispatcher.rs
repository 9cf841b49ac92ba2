//! The dispatch engine.
//!
//! [`Dispatcher::process`] takes one raw [`InboundEvent`] through the whole
//! pipeline:
//!
//! 1. Decode the transport's HTML entity escaping.
//! 2. Drop messages sent by the bot itself (name compared case-insensitively).
//! 3. Build the typed [`Message`].
//! 4. Walk the registry in order; the first sprocket whose `can_handle`
//!    accepts the message gets it. Usage is recorded while the sprocket runs;
//!    recording is bounded by the usage timeout, so a stalled store never
//!    holds up a reply. Later sprockets are not consulted.
//! 5. If nothing matched a private message, reply with the fallback text.
//!    Unmatched room messages are ignored.
//!
//! `process` never fails. Every fault, including a panicking sprocket, is
//! logged and reported as [`DispatchOutcome::Failed`], so one bad event can
//! never stop the event pump.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::builder(registry, session)
//!     .bot_name("jabbot")
//!     .usage(UsageRecorder::new(store, "Jabbot"))
//!     .build();
//!
//! while let Some(event) = events.recv().await {
//!     let dispatcher = dispatcher.clone();
//!     tokio::spawn(async move { dispatcher.process(event).await });
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tracing::{Instrument, debug, error, info_span, trace, warn};
use uuid::Uuid;

use jabbot_core::{
    BoxedSession, InboundEvent, Message, PrivateMessage, RoomEnvelope, RoomMessage,
    decode_entities,
};

use crate::error::DispatchError;
use crate::registry::SprocketRegistry;
use crate::usage::UsageRecorder;

/// The canned reply for private messages nothing understood.
pub const DEFAULT_FALLBACK_REPLY: &str = "I don't understand that command.";

/// Default upper bound on recording usage for one event.
pub const DEFAULT_USAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The bot sent it; ignored.
    SelfMessage,
    /// A sprocket handled it.
    Handled {
        /// Name of the sprocket.
        sprocket: String,
    },
    /// Nothing matched a private message; the fallback reply was sent.
    Fallback,
    /// Nothing matched a room message.
    Unhandled,
    /// Processing failed; the failure was logged.
    Failed,
}

impl DispatchOutcome {
    /// Whether a sprocket handled the event.
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }
}

struct DispatcherInner {
    registry: SprocketRegistry,
    session: BoxedSession,
    bot_name: Option<String>,
    usage: Option<UsageRecorder>,
    usage_timeout: Duration,
    fallback_reply: String,
}

/// Routes inbound events to sprockets.
///
/// Cheap to clone: clones share the same registry, session and recorder, so
/// each event can be processed on its own task.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    registry: SprocketRegistry,
    session: BoxedSession,
    bot_name: Option<String>,
    usage: Option<UsageRecorder>,
    usage_timeout: Duration,
    fallback_reply: String,
}

impl DispatcherBuilder {
    /// Sets the bot's own name; messages from it are ignored.
    pub fn bot_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.bot_name = (!name.is_empty()).then_some(name);
        self
    }

    /// Enables usage accounting.
    pub fn usage(mut self, recorder: UsageRecorder) -> Self {
        self.usage = Some(recorder);
        self
    }

    /// Bounds how long one event may spend recording usage.
    pub fn usage_timeout(mut self, timeout: Duration) -> Self {
        self.usage_timeout = timeout;
        self
    }

    /// Overrides the fallback reply.
    pub fn fallback_reply(mut self, text: impl Into<String>) -> Self {
        self.fallback_reply = text.into();
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                registry: self.registry,
                session: self.session,
                bot_name: self.bot_name,
                usage: self.usage,
                usage_timeout: self.usage_timeout,
                fallback_reply: self.fallback_reply,
            }),
        }
    }
}

impl Dispatcher {
    /// Starts building a dispatcher over a frozen registry.
    pub fn builder(registry: SprocketRegistry, session: BoxedSession) -> DispatcherBuilder {
        DispatcherBuilder {
            registry,
            session,
            bot_name: None,
            usage: None,
            usage_timeout: DEFAULT_USAGE_TIMEOUT,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
        }
    }

    /// Returns the registry.
    pub fn registry(&self) -> &SprocketRegistry {
        &self.inner.registry
    }

    /// Returns the session replies go through.
    pub fn session(&self) -> &BoxedSession {
        &self.inner.session
    }

    /// Processes one event. Never fails; see the module docs.
    pub async fn process(&self, event: InboundEvent) -> DispatchOutcome {
        let event_id = Uuid::new_v4();
        let span = info_span!("dispatch", %event_id, kind = event.kind_str());

        async move {
            match AssertUnwindSafe(self.try_process(event)).catch_unwind().await {
                Ok(Ok(outcome)) => {
                    trace!(?outcome, "Event processed");
                    outcome
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Failed to process event");
                    DispatchOutcome::Failed
                }
                Err(panic) => {
                    error!(panic = panic_message(&*panic), "Sprocket panicked while processing event");
                    DispatchOutcome::Failed
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Processes one event, surfacing the failure instead of logging it.
    pub async fn try_process(&self, event: InboundEvent) -> Result<DispatchOutcome, DispatchError> {
        let inner = &self.inner;
        let message = to_message(event)?;

        if self.is_own_message(&message) {
            trace!(from = message.from(), "Ignoring own message");
            return Ok(DispatchOutcome::SelfMessage);
        }

        let Some(sprocket) = inner.registry.find_handler(&message) else {
            if let Message::Private(private) = &message {
                debug!(from = private.from(), "No sprocket matched, sending fallback");
                inner
                    .session
                    .private_reply(private.from(), &inner.fallback_reply)
                    .await
                    .map_err(DispatchError::Fallback)?;
                return Ok(DispatchOutcome::Fallback);
            }
            return Ok(DispatchOutcome::Unhandled);
        };

        let name = sprocket.name().to_string();
        debug!(sprocket = %name, from = message.from(), "Sprocket matched");

        let handled = sprocket.handle(&message, &inner.session);
        let result = match &inner.usage {
            Some(usage) => {
                let ((), result) = futures::join!(self.record_usage(usage, &name), handled);
                result
            }
            None => handled.await,
        };

        result.map_err(|source| DispatchError::Sprocket {
            sprocket: name.clone(),
            source,
        })?;

        Ok(DispatchOutcome::Handled { sprocket: name })
    }

    async fn record_usage(&self, usage: &UsageRecorder, sprocket: &str) {
        let timeout = self.inner.usage_timeout;
        if tokio::time::timeout(timeout, usage.record(sprocket, Utc::now()))
            .await
            .is_err()
        {
            warn!(sprocket, ?timeout, "Usage recording timed out, counters not updated");
        }
    }

    fn is_own_message(&self, message: &Message) -> bool {
        self.inner
            .bot_name
            .as_deref()
            .is_some_and(|bot| bot.eq_ignore_ascii_case(message.from()))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.inner.registry)
            .field("bot_name", &self.inner.bot_name)
            .field("usage", &self.inner.usage.is_some())
            .finish()
    }
}

fn to_message(event: InboundEvent) -> Result<Message, DispatchError> {
    let message = match event {
        InboundEvent::Private { from, content, .. } => {
            PrivateMessage::new(from, decode_entities(&content)).into()
        }
        InboundEvent::Room { room, envelope } => {
            let envelope = RoomEnvelope::parse(&envelope)?;
            RoomMessage::new(room, envelope.user.name, decode_entities(&envelope.content)).into()
        }
    };
    Ok(message)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
