//! Auto-Stache: decorates images posted in rooms.
//!
//! Any image link that shows up in a room between `>` and `<` (how the chat
//! server renders links) gets answered with the same image run through the
//! faceup.me overlay service, wearing a random accessory.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::debug;

use jabbot_core::{BoxedSession, Message, Sprocket, SprocketError, SprocketInfo, SprocketResult};
use jabbot_framework::{Pattern, PatternMatcher, PatternResult};

/// Overlays the service knows about.
pub const ACCESSORIES: [&str; 5] = ["hipster", "clown", "mustache", "scumbag", "jason"];

const OVERLAY_ENDPOINT: &str = "http://faceup.me/img.jpg";

/// Builds the overlay URL for an image.
pub fn stache_url(accessory: &str, image: &str) -> String {
    format!(
        "{OVERLAY_ENDPOINT}?overlay={accessory}&src={}",
        urlencoding::encode(image)
    )
}

fn random_accessory() -> &'static str {
    ACCESSORIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(ACCESSORIES[0])
}

/// The Auto-Stache sprocket.
pub struct AutoStache {
    info: SprocketInfo,
    matcher: PatternMatcher,
}

impl AutoStache {
    pub const NAME: &'static str = "Auto-Stache Sprocket";

    pub fn new() -> PatternResult<Self> {
        let info = SprocketInfo::new(Self::NAME)
            .description(
                "Automatically add mustaches, hipster glasses, clown noses, scumbag hats, \
                 or Jason masks to any images it can.",
            )
            .usage("/msg <botnick> auto-stache help")
            .usage("Type a link to any image (png, jpg, or jpeg)");

        let matcher = PatternMatcher::new()
            .private(Pattern::regex(r"^auto-stache help$")?)
            .room(Pattern::delimited(">", "<", r"https?:\S+(png|jpg|jpeg)")?);

        Ok(Self { info, matcher })
    }
}

#[async_trait]
impl Sprocket for AutoStache {
    fn info(&self) -> &SprocketInfo {
        &self.info
    }

    fn can_handle(&self, message: &Message) -> bool {
        self.matcher.can_handle(message)
    }

    async fn handle(&self, message: &Message, session: &BoxedSession) -> SprocketResult<()> {
        let found = self
            .matcher
            .resolve(message)
            .ok_or_else(|| SprocketError::NoMatch {
                sprocket: self.info.name.clone(),
            })?;

        match message {
            Message::Private(m) => {
                session
                    .private_reply(m.from(), &self.info.formatted_help())
                    .await?;
            }
            Message::Room(m) => {
                let url = stache_url(random_accessory(), found.whole());
                debug!(room = m.room(), image = found.whole(), "Staching image");
                session.say_to_room(m.room(), &url).await?;
            }
        }
        Ok(())
    }
}
