//! Runtime error types.

use thiserror::Error;

use jabbot_core::StoreError;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that can occur while building or running the bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The counter store could not be set up.
    #[error("Counter store error: {0}")]
    Store(#[from] StoreError),

    /// Signal handlers could not be installed.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
