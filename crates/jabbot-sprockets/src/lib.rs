//! Community sprockets for Jabbot.
//!
//! - [`AutoStache`]: puts mustaches (and worse) on images posted in rooms
//! - [`help_sprocket`]: a private `help` command listing every sprocket
//!
//! [`default_registry`] wires both in the order the bot ships with.

pub mod auto_stache;
pub mod help;

pub use auto_stache::{ACCESSORIES, AutoStache, stache_url};
pub use help::{HELP_SPROCKET_NAME, directory, help_sprocket};

use jabbot_framework::{PatternError, RegistryError, SprocketRegistry};
use thiserror::Error;

/// Errors raised while assembling the bundled sprockets.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Auto-Stache first, then the help directory over everything before it.
pub fn default_registry() -> Result<SprocketRegistry, SetupError> {
    let builder = SprocketRegistry::builder().register(AutoStache::new()?)?;
    let help = help_sprocket(&builder.infos())?;
    Ok(builder.register(help)?.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jabbot_core::InboundEvent;
    use jabbot_core::testing::{RecordingSession, Sent};
    use jabbot_framework::{DEFAULT_FALLBACK_REPLY, DispatchOutcome, Dispatcher};
    use serde_json::json;

    fn private(content: &str) -> InboundEvent {
        InboundEvent::Private {
            from: "alice".into(),
            to: "jabbot".into(),
            content: content.into(),
        }
    }

    #[test]
    fn test_default_registry_order() {
        let registry = default_registry().unwrap();
        let names: Vec<String> = registry.infos().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec![AutoStache::NAME, HELP_SPROCKET_NAME]);
    }

    #[tokio::test]
    async fn test_bundled_sprockets_through_the_dispatcher() {
        let (session, recorder) = RecordingSession::shared();
        let dispatcher = Dispatcher::builder(default_registry().unwrap(), session)
            .bot_name("jabbot")
            .build();

        assert_eq!(
            dispatcher.process(private("auto-stache help")).await,
            DispatchOutcome::Handled {
                sprocket: AutoStache::NAME.into()
            }
        );
        assert_eq!(
            dispatcher.process(private("help")).await,
            DispatchOutcome::Handled {
                sprocket: HELP_SPROCKET_NAME.into()
            }
        );

        let room = InboundEvent::Room {
            room: "lobby".into(),
            envelope: json!({
                "user": { "name": "bob" },
                "content": "check this out &gt;http://example.com/cat.png&lt;"
            }),
        };
        assert_eq!(
            dispatcher.process(room).await,
            DispatchOutcome::Handled {
                sprocket: AutoStache::NAME.into()
            }
        );

        assert_eq!(dispatcher.process(private("dance")).await, DispatchOutcome::Fallback);

        let sent = recorder.sent();
        assert_eq!(sent.len(), 4);

        let Sent::Private { to, text } = &sent[0] else {
            panic!("expected the Auto-Stache help, got {:?}", sent[0]);
        };
        assert_eq!(to, "alice");
        assert!(text.starts_with("Auto-Stache Sprocket - "));
        assert_ne!(text, DEFAULT_FALLBACK_REPLY);

        let Sent::Private { text, .. } = &sent[1] else {
            panic!("expected the directory, got {:?}", sent[1]);
        };
        assert!(text.contains(AutoStache::NAME));

        let Sent::Room { room, text } = &sent[2] else {
            panic!("expected a room reply, got {:?}", sent[2]);
        };
        assert_eq!(room, "lobby");
        assert!(text.starts_with("http://faceup.me/img.jpg?overlay="));
        assert!(text.ends_with("&src=http%3A%2F%2Fexample.com%2Fcat.png"));

        assert_eq!(
            sent[3],
            Sent::Private {
                to: "alice".into(),
                text: DEFAULT_FALLBACK_REPLY.into()
            }
        );
    }
}
