//! Configuration for the Jabbot runtime.
//!
//! Layered loading with figment ([`ConfigLoader`]), a serde schema
//! ([`JabbotConfig`]) and post-load validation ([`validate_config`]).
//! Configuration is read once at boot.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config};
pub use schema::{
    BotConfig, DispatchConfig, JabbotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    StoreConfig, WatchdogConfig,
};
pub use validation::validate_config;
