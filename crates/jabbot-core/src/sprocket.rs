//! The sprocket contract.
//!
//! A sprocket is a named, pluggable message handler. The dispatcher asks
//! each registered sprocket, in order, whether it can handle a message and
//! hands the message to the first one that says yes.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SprocketResult;
use crate::message::Message;
use crate::session::BoxedSession;

/// Descriptive metadata of a sprocket.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SprocketInfo {
    /// Unique, stable name. Usage counters are keyed by it.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Example invocations, shown verbatim in help text.
    pub usage: Vec<String>,
}

impl SprocketInfo {
    /// Creates metadata with a name and no description or usage.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a usage example.
    pub fn usage(mut self, example: impl Into<String>) -> Self {
        self.usage.push(example.into());
        self
    }

    /// Renders the help text: a title line followed by indented usage lines.
    pub fn formatted_help(&self) -> String {
        let mut help = self.summary();
        for example in &self.usage {
            let _ = write!(help, "\n  {example}");
        }
        help
    }

    /// Renders `name - description`, or just the name without a description.
    pub fn summary(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, self.description)
        }
    }
}

/// A pluggable message handler.
///
/// `can_handle` must be cheap and synchronous: the dispatcher calls it for
/// every registered sprocket until one accepts. `handle` may perform I/O
/// through the session; the handle can be cloned into spawned work.
#[async_trait]
pub trait Sprocket: Send + Sync {
    /// Returns the sprocket's metadata.
    fn info(&self) -> &SprocketInfo;

    /// Returns the sprocket's unique name.
    fn name(&self) -> &str {
        &self.info().name
    }

    /// Whether this sprocket wants the message.
    fn can_handle(&self, message: &Message) -> bool;

    /// Handles a message previously accepted by [`can_handle`](Self::can_handle).
    async fn handle(&self, message: &Message, session: &BoxedSession) -> SprocketResult<()>;
}

/// Shared sprocket handle.
pub type BoxedSprocket = Arc<dyn Sprocket>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_help() {
        let info = SprocketInfo::new("Echo Sprocket")
            .description("Repeats things.")
            .usage("/msg <botnick> echo <text>")
            .usage("echo <text>");

        assert_eq!(
            info.formatted_help(),
            "Echo Sprocket - Repeats things.\n  /msg <botnick> echo <text>\n  echo <text>"
        );
    }

    #[test]
    fn test_summary_without_description() {
        assert_eq!(SprocketInfo::new("Bare").summary(), "Bare");
        assert_eq!(SprocketInfo::new("Bare").formatted_help(), "Bare");
    }
}
