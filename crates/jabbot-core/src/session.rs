//! The chat session contract.
//!
//! A [`Session`] is the bot's persistent connection to the chat service. The
//! core only needs a narrow slice of it: connect/login at boot, a
//! point-in-time liveness query for the heartbeat, and the two outbound
//! effects sprockets use. Inbound traffic arrives separately as
//! [`InboundEvent`](crate::InboundEvent)s on a channel owned by the adapter.
//!
//! Sessions are shared by every in-flight dispatch, so implementations must
//! make concurrent sends safe.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SessionResult;

/// Login identity for the bot.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// The bot's user name.
    pub name: String,
    /// The bot's password.
    pub password: String,
    /// Email used for the bot's avatar, if any.
    pub gravatar_email: Option<String>,
}

/// A connection to the chat service.
#[async_trait]
pub trait Session: Send + Sync {
    /// Establishes the connection. Returns `false` if the server refused it.
    async fn connect(&self) -> SessionResult<bool>;

    /// Logs in as the bot. Returns `false` on rejected credentials.
    async fn login(&self, credentials: &Credentials) -> SessionResult<bool>;

    /// Whether the session currently believes it is connected.
    fn is_connected(&self) -> bool;

    /// Sends a private reply to a user.
    async fn private_reply(&self, to: &str, text: &str) -> SessionResult<()>;

    /// Says something in a room.
    async fn say_to_room(&self, room: &str, text: &str) -> SessionResult<()>;
}

/// Shared session handle.
pub type BoxedSession = Arc<dyn Session>;
