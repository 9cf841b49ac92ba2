//! The help directory.
//!
//! Lists every sprocket registered before it. Register it last:
//!
//! ```rust,ignore
//! let builder = SprocketRegistry::builder().register(AutoStache::new()?)?;
//! let help = help_sprocket(&builder.infos())?;
//! let registry = builder.register(help)?.build();
//! ```

use std::sync::Arc;

use jabbot_core::SprocketInfo;
use jabbot_framework::{Pattern, PatternContext, PatternResult, RegexSprocket};

pub const HELP_SPROCKET_NAME: &str = "Help Sprocket";

const HELP_HINT: &str =
    "Most sprockets explain themselves: /msg <botnick> <sprocket> help";

/// Renders the directory text for a set of sprockets.
pub fn directory(infos: &[SprocketInfo]) -> String {
    let mut lines: Vec<String> = infos.iter().map(SprocketInfo::summary).collect();
    lines.push(HELP_HINT.to_string());
    lines.join("\n")
}

/// Builds the help sprocket over a snapshot of sprocket metadata.
pub fn help_sprocket(infos: &[SprocketInfo]) -> PatternResult<RegexSprocket> {
    let text: Arc<str> = directory(infos).into();

    Ok(RegexSprocket::new(HELP_SPROCKET_NAME)
        .description("Lists the available sprockets.")
        .usage("/msg <botnick> help")
        .private_pattern(Pattern::regex(r"^help$")?)
        .on_private(move |ctx: PatternContext| {
            let text = text.clone();
            async move {
                ctx.session.private_reply(ctx.message.from(), &text).await?;
                Ok(())
            }
        }))
}
