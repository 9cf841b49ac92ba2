//! # Jabbot Framework
//!
//! Everything between a raw inbound event and a sprocket's reply.
//!
//! This layer provides:
//! - Pattern matching with ordered, per-kind pattern sets ([`pattern`])
//! - Ready-made sprockets built from closures ([`RegexSprocket`], [`CustomSprocket`])
//! - The ordered, immutable [`SprocketRegistry`]
//! - Usage accounting over four rolling time buckets ([`UsageRecorder`])
//! - The [`Dispatcher`], which routes each event to the first matching sprocket
//!
//! The framework performs no I/O of its own: replies go through the
//! [`Session`](jabbot_core::Session) and counters through the
//! [`CounterStore`](jabbot_core::CounterStore) it is given.

pub mod dispatcher;
pub mod error;
pub mod pattern;
pub mod registry;
pub mod sprocket;
pub mod usage;

pub use dispatcher::{
    DEFAULT_FALLBACK_REPLY, DEFAULT_USAGE_TIMEOUT, DispatchOutcome, Dispatcher, DispatcherBuilder,
};
pub use error::{DispatchError, PatternError, PatternResult, RegistryError, RegistryResult};
pub use pattern::{Pattern, PatternMatch, PatternMatcher, PatternSet};
pub use registry::{RegistryBuilder, SprocketRegistry};
pub use sprocket::{BoxFuture, CheckFn, CustomSprocket, PatternContext, RegexSprocket};
pub use usage::{DEFAULT_KEY_PREFIX, UsageBucket, UsageRecorder, UsageReport};
