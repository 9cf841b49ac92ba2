//! The ordered sprocket registry.
//!
//! Sprockets are registered explicitly, in priority order, and frozen into
//! an immutable [`SprocketRegistry`] before the dispatcher is built. The
//! first registered sprocket that accepts a message handles it.
//!
//! ```rust,ignore
//! let builder = SprocketRegistry::builder()
//!     .register(auto_stache()?)?
//!     .register(weather)?;
//! // The help sprocket lists everything registered before it.
//! let help = help_sprocket(builder.infos())?;
//! let registry = builder.register(help)?.build();
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use jabbot_core::{BoxedSprocket, Message, Sprocket, SprocketInfo};

use crate::error::{RegistryError, RegistryResult};

/// Collects sprockets in registration order.
#[derive(Default)]
pub struct RegistryBuilder {
    sprockets: Vec<BoxedSprocket>,
    names: HashSet<String>,
}

impl RegistryBuilder {
    /// Registers a sprocket after every previously registered one.
    ///
    /// Fails if the name is empty or already taken: usage counters are keyed
    /// by name, so names must be unique.
    pub fn register<S>(self, sprocket: S) -> RegistryResult<Self>
    where
        S: Sprocket + 'static,
    {
        self.register_arc(Arc::new(sprocket))
    }

    /// Registers an already shared sprocket.
    pub fn register_arc(mut self, sprocket: BoxedSprocket) -> RegistryResult<Self> {
        let name = sprocket.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if !self.names.insert(name.clone()) {
            return Err(RegistryError::DuplicateName(name));
        }

        debug!(sprocket = %name, position = self.sprockets.len(), "Registered sprocket");
        self.sprockets.push(sprocket);
        Ok(self)
    }

    /// Metadata of everything registered so far, in order.
    pub fn infos(&self) -> Vec<SprocketInfo> {
        self.sprockets.iter().map(|s| s.info().clone()).collect()
    }

    /// Number of registered sprockets.
    pub fn len(&self) -> usize {
        self.sprockets.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.sprockets.is_empty()
    }

    /// Freezes the registry.
    pub fn build(self) -> SprocketRegistry {
        SprocketRegistry {
            sprockets: self.sprockets.into(),
        }
    }
}

/// An immutable, ordered list of sprockets.
///
/// Cheap to clone; safe to read from any number of concurrent dispatches.
#[derive(Clone, Default)]
pub struct SprocketRegistry {
    sprockets: Arc<[BoxedSprocket]>,
}

impl SprocketRegistry {
    /// Starts a new registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Returns the first sprocket, in registration order, that accepts the message.
    pub fn find_handler(&self, message: &Message) -> Option<&BoxedSprocket> {
        self.sprockets.iter().find(|s| s.can_handle(message))
    }

    /// Iterates over the sprockets in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BoxedSprocket> {
        self.sprockets.iter()
    }

    /// Metadata of every sprocket, in order.
    pub fn infos(&self) -> Vec<SprocketInfo> {
        self.sprockets.iter().map(|s| s.info().clone()).collect()
    }

    /// Number of sprockets.
    pub fn len(&self) -> usize {
        self.sprockets.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sprockets.is_empty()
    }
}

impl std::fmt::Debug for SprocketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SprocketRegistry")
            .field(
                "sprockets",
                &self.sprockets.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
