//! Framework error types.

use thiserror::Error;

use jabbot_core::{EventError, SessionError, SprocketError};

/// Errors raised while building patterns.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The regular expression did not compile.
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// A delimited pattern was given an empty delimiter.
    #[error("delimited pattern needs non-empty delimiters")]
    EmptyDelimiter,
}

/// Errors raised while building the sprocket registry.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Two sprockets share a name.
    #[error("sprocket '{0}' is registered more than once")]
    DuplicateName(String),

    /// A sprocket has an empty name.
    #[error("sprocket names must not be empty")]
    EmptyName,
}

/// Errors raised while processing a single inbound event.
///
/// These never escape the dispatcher: they are logged and the event is dropped.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The raw event could not be turned into a message.
    #[error(transparent)]
    Event(#[from] EventError),

    /// The matched sprocket failed.
    #[error("sprocket '{sprocket}' failed: {source}")]
    Sprocket {
        /// Name of the sprocket.
        sprocket: String,
        /// The underlying failure.
        #[source]
        source: SprocketError,
    },

    /// The fallback reply could not be sent.
    #[error("fallback reply failed: {0}")]
    Fallback(#[source] SessionError),
}

/// Result type for pattern construction.
pub type PatternResult<T> = Result<T, PatternError>;

/// Result type for registry construction.
pub type RegistryResult<T> = Result<T, RegistryError>;
