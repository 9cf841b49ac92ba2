//! Ready-made sprocket implementations.
//!
//! - [`RegexSprocket`]: matches with a [`PatternMatcher`] and hands the
//!   captures of the winning pattern to a per-kind async handler.
//! - [`CustomSprocket`]: an arbitrary predicate paired with an async handler.
//!
//! Both are built with the same builder style:
//!
//! ```rust,ignore
//! let echo = RegexSprocket::new("Echo Sprocket")
//!     .description("Repeats what you tell it.")
//!     .usage("/msg <botnick> echo <text>")
//!     .private_pattern(Pattern::regex(r"^echo (.+)$")?)
//!     .on_private(|ctx: PatternContext| async move {
//!         let text = ctx.captures.get(1).unwrap_or_default().to_string();
//!         ctx.session.private_reply(ctx.message.from(), &text).await?;
//!         Ok(())
//!     });
//! ```
//!
//! Sprockets with richer state implement [`Sprocket`] directly and keep a
//! [`PatternMatcher`] of their own.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use jabbot_core::{
    BoxedSession, Message, MessageKind, Sprocket, SprocketError, SprocketInfo, SprocketResult,
};

use crate::pattern::{Pattern, PatternMatch, PatternMatcher};

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// RegexSprocket
// ============================================================================

/// Everything a pattern handler gets to work with.
pub struct PatternContext {
    /// The matched message.
    pub message: Message,
    /// Captures of the first matching pattern.
    pub captures: PatternMatch,
    /// The session to reply through.
    pub session: BoxedSession,
}

type PatternHandlerFn =
    Arc<dyn Fn(PatternContext) -> BoxFuture<'static, SprocketResult<()>> + Send + Sync>;

fn into_pattern_handler<F, Fut>(f: F) -> PatternHandlerFn
where
    F: Fn(PatternContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SprocketResult<()>> + Send + 'static,
{
    Arc::new(move |ctx| -> BoxFuture<'static, SprocketResult<()>> { Box::pin(f(ctx)) })
}

/// A sprocket driven by per-kind pattern sets.
///
/// A message kind is only handled if it has both patterns and a handler.
#[derive(Clone)]
pub struct RegexSprocket {
    info: SprocketInfo,
    matcher: PatternMatcher,
    private_handler: Option<PatternHandlerFn>,
    room_handler: Option<PatternHandlerFn>,
}

impl RegexSprocket {
    /// Creates a sprocket with no patterns and no handlers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: SprocketInfo::new(name),
            matcher: PatternMatcher::new(),
            private_handler: None,
            room_handler: None,
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.info = self.info.description(description);
        self
    }

    /// Appends a usage example.
    pub fn usage(mut self, example: impl Into<String>) -> Self {
        self.info = self.info.usage(example);
        self
    }

    /// Appends a pattern for private messages.
    pub fn private_pattern(mut self, pattern: Pattern) -> Self {
        self.matcher = self.matcher.private(pattern);
        self
    }

    /// Appends a pattern for room messages.
    pub fn room_pattern(mut self, pattern: Pattern) -> Self {
        self.matcher = self.matcher.room(pattern);
        self
    }

    /// Sets the handler for matched private messages.
    pub fn on_private<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PatternContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SprocketResult<()>> + Send + 'static,
    {
        self.private_handler = Some(into_pattern_handler(f));
        self
    }

    /// Sets the handler for matched room messages.
    pub fn on_room<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PatternContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SprocketResult<()>> + Send + 'static,
    {
        self.room_handler = Some(into_pattern_handler(f));
        self
    }

    /// Returns the pattern matcher.
    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    fn handler_for(&self, kind: MessageKind) -> Option<&PatternHandlerFn> {
        match kind {
            MessageKind::Private => self.private_handler.as_ref(),
            MessageKind::Room => self.room_handler.as_ref(),
        }
    }
}

#[async_trait]
impl Sprocket for RegexSprocket {
    fn info(&self) -> &SprocketInfo {
        &self.info
    }

    fn can_handle(&self, message: &Message) -> bool {
        self.handler_for(message.kind()).is_some() && self.matcher.can_handle(message)
    }

    async fn handle(&self, message: &Message, session: &BoxedSession) -> SprocketResult<()> {
        let no_match = || SprocketError::NoMatch {
            sprocket: self.info.name.clone(),
        };

        let handler = self.handler_for(message.kind()).ok_or_else(no_match)?;
        let captures = self.matcher.resolve(message).ok_or_else(no_match)?;

        handler(PatternContext {
            message: message.clone(),
            captures,
            session: Arc::clone(session),
        })
        .await
    }
}

// ============================================================================
// CustomSprocket
// ============================================================================

/// A type-erased check function.
pub type CheckFn = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

type MessageHandlerFn =
    Arc<dyn Fn(Message, BoxedSession) -> BoxFuture<'static, SprocketResult<()>> + Send + Sync>;

/// A sprocket with an arbitrary predicate and handler.
///
/// Without a check, the sprocket accepts every message. Without a handler,
/// accepted messages are consumed silently.
#[derive(Clone)]
pub struct CustomSprocket {
    info: SprocketInfo,
    check_fn: Option<CheckFn>,
    handler: Option<MessageHandlerFn>,
}

impl CustomSprocket {
    /// Creates a sprocket that accepts everything and does nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: SprocketInfo::new(name),
            check_fn: None,
            handler: None,
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.info = self.info.description(description);
        self
    }

    /// Appends a usage example.
    pub fn usage(mut self, example: impl Into<String>) -> Self {
        self.info = self.info.usage(example);
        self
    }

    /// Sets the predicate.
    pub fn check<F>(mut self, f: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.check_fn = Some(Arc::new(f));
        self
    }

    /// Sets the handler.
    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Message, BoxedSession) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SprocketResult<()>> + Send + 'static,
    {
        self.handler = Some(Arc::new(
            move |message, session| -> BoxFuture<'static, SprocketResult<()>> {
                Box::pin(f(message, session))
            },
        ));
        self
    }
}

#[async_trait]
impl Sprocket for CustomSprocket {
    fn info(&self) -> &SprocketInfo {
        &self.info
    }

    fn can_handle(&self, message: &Message) -> bool {
        match &self.check_fn {
            Some(f) => f(message),
            None => true,
        }
    }

    async fn handle(&self, message: &Message, session: &BoxedSession) -> SprocketResult<()> {
        match &self.handler {
            Some(f) => f(message.clone(), Arc::clone(session)).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jabbot_core::testing::{RecordingSession, Sent};
    use jabbot_core::{PrivateMessage, RoomMessage};

    fn echo() -> RegexSprocket {
        RegexSprocket::new("Echo Sprocket")
            .description("Repeats things.")
            .private_pattern(Pattern::regex(r"^echo (.+)$").unwrap())
            .room_pattern(Pattern::regex(r"^!echo (.+)$").unwrap())
            .on_private(|ctx: PatternContext| async move {
                let text = ctx.captures.get(1).unwrap_or_default().to_string();
                ctx.session.private_reply(ctx.message.from(), &text).await?;
                Ok(())
            })
    }

    #[tokio::test]
    async fn test_regex_sprocket_passes_captures() {
        let (session, recorder) = RecordingSession::shared();
        let sprocket = echo();
        let msg: Message = PrivateMessage::new("alice", "ECHO hi there").into();

        assert!(sprocket.can_handle(&msg));
        sprocket.handle(&msg, &session).await.unwrap();

        assert_eq!(
            recorder.sent(),
            vec![Sent::Private {
                to: "alice".into(),
                text: "hi there".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_regex_sprocket_kind_without_handler_is_ignored() {
        let sprocket = echo();
        let msg: Message = RoomMessage::new("lobby", "alice", "!echo hi").into();
        assert!(!sprocket.can_handle(&msg));
    }

    #[tokio::test]
    async fn test_regex_sprocket_handle_without_match_errors() {
        let (session, _) = RecordingSession::shared();
        let msg: Message = PrivateMessage::new("alice", "nope").into();
        let err = echo().handle(&msg, &session).await.unwrap_err();
        assert!(matches!(err, SprocketError::NoMatch { .. }));
    }

    #[tokio::test]
    async fn test_custom_sprocket() {
        let (session, recorder) = RecordingSession::shared();
        let sprocket = CustomSprocket::new("Shout")
            .check(|m| m.content().ends_with('!'))
            .handler(|message: Message, session: BoxedSession| async move {
                let room = message.room().unwrap_or("nowhere").to_string();
                session
                    .say_to_room(&room, &message.content().to_uppercase())
                    .await?;
                Ok(())
            });

        let quiet: Message = RoomMessage::new("lobby", "bob", "hello").into();
        let loud: Message = RoomMessage::new("lobby", "bob", "hello!").into();
        assert!(!sprocket.can_handle(&quiet));
        assert!(sprocket.can_handle(&loud));

        sprocket.handle(&loud, &session).await.unwrap();
        assert_eq!(
            recorder.sent(),
            vec![Sent::Room {
                room: "lobby".into(),
                text: "HELLO!".into()
            }]
        );
    }

    #[test]
    fn test_custom_sprocket_without_check_accepts_all() {
        let sprocket = CustomSprocket::new("Catch-all");
        let msg: Message = PrivateMessage::new("x", "anything").into();
        assert!(sprocket.can_handle(&msg));
        assert_eq!(sprocket.name(), "Catch-all");
    }
}
