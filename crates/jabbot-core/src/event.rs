//! Raw inbound events as delivered by a session.
//!
//! Sessions report two callbacks: a private message (`from`, `to`, `content`)
//! and a room message carrying the transport's raw envelope. The dispatcher
//! turns these into [`Message`](crate::Message)s.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{EventError, EventResult};

/// An event received from the chat session, before any decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A direct message to the bot.
    Private {
        /// Sender name.
        from: String,
        /// Recipient name (the bot).
        to: String,
        /// Transport-encoded content.
        content: String,
    },
    /// A message said in a room.
    Room {
        /// Room name.
        room: String,
        /// Raw message envelope as sent by the chat server.
        envelope: Value,
    },
}

impl InboundEvent {
    /// Returns a short label for logging.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Private { .. } => "private",
            Self::Room { .. } => "room",
        }
    }
}

/// The fields the dispatcher reads from a room envelope.
///
/// Envelopes look like `{"user": {"name": "alice"}, "content": "hi"}`;
/// any additional fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomEnvelope {
    /// The author.
    pub user: EnvelopeUser,
    /// Transport-encoded content.
    pub content: String,
}

/// The `user` object inside a [`RoomEnvelope`].
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeUser {
    /// Display name of the author.
    pub name: String,
}

impl RoomEnvelope {
    /// Reads the author and content out of a raw envelope.
    pub fn parse(envelope: &Value) -> EventResult<Self> {
        Self::deserialize(envelope).map_err(|e| EventError::MalformedEnvelope {
            reason: e.to_string(),
        })
    }
}
