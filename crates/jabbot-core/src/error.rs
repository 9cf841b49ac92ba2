//! Unified error types for the Jabbot core contracts.
//!
//! Framework-level errors (pattern compilation, registry, dispatch) are
//! defined in `jabbot-framework`.

use thiserror::Error;

// =============================================================================
// Session Errors
// =============================================================================

/// Errors raised by a [`Session`](crate::Session) implementation.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The session is not connected to the chat service.
    #[error("session is not connected")]
    NotConnected,

    /// Establishing the connection failed.
    #[error("connection to '{server}' failed: {reason}")]
    ConnectFailed {
        /// The server that refused the connection.
        server: String,
        /// Reason for failure.
        reason: String,
    },

    /// An outbound message could not be delivered.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors raised by a [`CounterStore`](crate::CounterStore) implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store endpoint could not be parsed or resolved.
    #[error("invalid store endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// The offending connection string.
        url: String,
        /// Reason for rejection.
        reason: String,
    },

    /// The store could not be reached.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// The store rejected the command.
    #[error("store replied with error: {0}")]
    Command(String),

    /// The store sent a reply that could not be understood.
    #[error("store protocol error: {0}")]
    Protocol(String),

    /// The value stored under a key is not an integer.
    #[error("value at '{key}' is not an integer")]
    NotAnInteger {
        /// The key holding the non-integer value.
        key: String,
    },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

// =============================================================================
// Sprocket Errors
// =============================================================================

/// Errors raised while a sprocket handles a message.
#[derive(Debug, Clone, Error)]
pub enum SprocketError {
    /// `handle` was called for a message the sprocket cannot resolve.
    #[error("sprocket '{sprocket}' has no match for the message")]
    NoMatch {
        /// Name of the sprocket.
        sprocket: String,
    },

    /// A session operation failed while handling.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Sprocket-specific failure.
    #[error("{0}")]
    Failed(String),
}

impl SprocketError {
    /// Creates a sprocket-specific failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

// =============================================================================
// Event Errors
// =============================================================================

/// Errors raised while turning a raw inbound event into a [`Message`](crate::Message).
#[derive(Debug, Clone, Error)]
pub enum EventError {
    /// A room envelope did not have the expected shape.
    #[error("malformed room envelope: {reason}")]
    MalformedEnvelope {
        /// Reason for failure.
        reason: String,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for counter store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for sprocket handling.
pub type SprocketResult<T> = Result<T, SprocketError>;

/// Result type for event decoding.
pub type EventResult<T> = Result<T, EventError>;
