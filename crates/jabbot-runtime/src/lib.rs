//! Jabbot Runtime - process orchestration for the Jabbot chat dispatcher.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `JabbotConfig`)
//! - Logging setup (`LoggingBuilder`, `init_from_config`)
//! - Counter store backends (`RespStore`, `select_store`)
//! - The liveness watchdog (`Heartbeat`, `Defibrillator`)
//! - Supervised tasks and the exit flag (`Supervisor`, `Lifecycle`)
//! - The application context and main loop (`JabbotRuntime`)
//!
//! ```ignore
//! use jabbot_runtime::{JabbotRuntime, load_config, logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let runtime = JabbotRuntime::builder(config, session, events)
//!         .registry(registry)
//!         .build()?;
//!
//!     let reason = runtime.run().await?;
//!     std::process::exit(reason.exit_code());
//! }
//! ```
//!
//! # Exit Codes
//!
//! The bot never restarts itself. Every stop ends the process and an outer
//! supervisor brings it back. Faults exit with `-1`; planned recycles,
//! signals and a closed session exit with `0`.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod runtime;
pub mod store;
pub mod supervisor;
pub mod watchdog;

#[cfg(test)]
mod test_support;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, JabbotConfig, Profile, load_config, validate_config,
};
pub use error::{RuntimeError, RuntimeResult};
pub use lifecycle::{ExitReason, Lifecycle};
pub use logging::{LoggingBuilder, init_from_config};
pub use runtime::{JabbotRuntime, RuntimeBuilder};
pub use store::{RespStore, StoreEndpoint, select_store};
pub use supervisor::{FaultPolicy, Supervisor};
pub use watchdog::{BeatOutcome, Defibrillator, Heartbeat, LAST_SEEN_FORMAT};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
