//! # Jabbot Core
//!
//! The contracts every other Jabbot crate is written against.
//!
//! ## Contents
//!
//! - **Messages**: typed chat messages ([`Message`], [`PrivateMessage`], [`RoomMessage`])
//!   and transport decoding ([`decode_entities`])
//! - **Events**: raw session callbacks ([`InboundEvent`], [`RoomEnvelope`])
//! - **Sprockets**: the pluggable handler contract ([`Sprocket`], [`SprocketInfo`])
//! - **Sessions**: the chat connection contract ([`Session`], [`Credentials`])
//! - **Stores**: the counter/liveness store contract ([`CounterStore`], [`MemoryStore`])
//!
//! ## Data Flow
//!
//! ```text
//! ┌─────────┐  InboundEvent  ┌────────────┐  Message  ┌──────────┐
//! │ Session │───────────────▶│ Dispatcher │──────────▶│ Sprocket │──▶ Session (replies)
//! └─────────┘                └────────────┘           └──────────┘
//!                                  │
//!                                  └──▶ CounterStore (usage counters)
//! ```

pub mod error;
pub mod event;
pub mod message;
pub mod session;
pub mod sprocket;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{
    EventError, EventResult, SessionError, SessionResult, SprocketError, SprocketResult,
    StoreError, StoreResult,
};
pub use event::{EnvelopeUser, InboundEvent, RoomEnvelope};
pub use message::{Message, MessageKind, PrivateMessage, RoomMessage, decode_entities};
pub use session::{BoxedSession, Credentials, Session};
pub use sprocket::{BoxedSprocket, Sprocket, SprocketInfo};
pub use store::{BoxedStore, CounterStore, MemoryStore};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        BoxedSession, BoxedSprocket, BoxedStore, CounterStore, InboundEvent, Message,
        MessageKind, PrivateMessage, RoomMessage, Session, Sprocket, SprocketError,
        SprocketInfo, SprocketResult,
    };
}
