//! # Jabbot
//!
//! A plugin-based chat bot. Messages from a chat session are routed to the
//! first registered sprocket that understands them; every handled message
//! bumps four usage counters; a watchdog reports liveness and periodically
//! recycles the process.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐ InboundEvent ┌────────────┐ Message ┌──────────────────┐
//! │ Session │─────────────▶│ Dispatcher │────────▶│ first Sprocket   │──▶ Session (replies)
//! └─────────┘              └────────────┘         │ that can_handle  │
//!      ▲                         │                └──────────────────┘
//!      │                         └──▶ CounterStore (usage counters)
//!  Heartbeat ──▶ CounterStore ({prefix}:LastSeen)
//!  Defibrillator ──▶ Lifecycle (exit, outer supervisor restarts)
//! ```
//!
//! - **Core**: message, event, session, sprocket and store contracts
//! - **Framework**: patterns, sprocket builders, registry, usage, dispatch
//! - **Runtime**: config, logging, supervision, watchdog, the main loop
//! - **Adapters**: session implementations (console)
//! - **Sprockets**: bundled sprockets (Auto-Stache, help)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jabbot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     init_from_config(&config.logging);
//!
//!     let shout = CustomSprocket::new("Shout")
//!         .check(|m| m.content().ends_with('!'))
//!         .handler(|message: Message, session: BoxedSession| async move {
//!             session.private_reply(message.from(), "inside voice, please").await?;
//!             Ok(())
//!         });
//!     let registry = SprocketRegistry::builder().register(shout)?.build();
//!
//!     let (session, events) = ConsoleSession::stdio();
//!     let reason = JabbotRuntime::builder(config, session, events)
//!         .registry(registry)
//!         .build()?
//!         .run()
//!         .await?;
//!     std::process::exit(reason.exit_code());
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use jabbot_adapter_console as console;
pub use jabbot_core as core;
pub use jabbot_framework as framework;
pub use jabbot_runtime as runtime;
pub use jabbot_sprockets as sprockets;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use jabbot::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use jabbot_runtime::{
        ExitReason, JabbotConfig, JabbotRuntime, Lifecycle, init_from_config, load_config,
    };

    // Sprockets
    pub use jabbot_core::{
        BoxedSession, Message, MessageKind, Session, Sprocket, SprocketError, SprocketInfo,
        SprocketResult,
    };
    pub use jabbot_framework::{
        CustomSprocket, Pattern, PatternContext, RegexSprocket, SprocketRegistry,
    };

    // Adapters
    pub use jabbot_adapter_console::ConsoleSession;

    // Logging
    pub use jabbot_runtime::prelude::*;
}
