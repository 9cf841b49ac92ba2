//! Pattern matching for regex-style sprockets.
//!
//! A [`PatternMatcher`] owns two ordered [`PatternSet`]s, one for private
//! messages and one for room messages. Matching is case-insensitive and the
//! first pattern that matches wins.
//!
//! `can_handle` and the later re-resolution inside `handle` both go through
//! [`PatternSet::find`], so they can never disagree about which pattern
//! matched.
//!
//! # Delimited Patterns
//!
//! Some extractions are defined by what surrounds the interesting text, for
//! example an image URL sitting between `>` and `<` in rendered chat HTML.
//! [`Pattern::delimited`] scans for the opening delimiter, slices up to the
//! next closing delimiter and accepts the slice only if it matches the inner
//! pattern in full:
//!
//! ```rust,ignore
//! let image = Pattern::delimited(">", "<", r"https?:\S+(png|jpg|jpeg)")?;
//! let found = image.find("look >http://example.com/cat.png<").unwrap();
//! assert_eq!(found.whole(), "http://example.com/cat.png");
//! ```
//!
//! An opening delimiter with no closing delimiter after it never matches.

use regex::{Captures, Regex, RegexBuilder};

use jabbot_core::{Message, MessageKind};

use crate::error::{PatternError, PatternResult};

/// Capture groups of a successful match.
///
/// Group 0 is the whole match (for delimited patterns: the interior between
/// the delimiters). Optional groups that did not participate are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    groups: Vec<Option<String>>,
}

impl PatternMatch {
    fn from_captures(captures: &Captures<'_>) -> Self {
        Self {
            groups: captures
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    /// Returns capture group `index`, if it participated in the match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Returns the whole match.
    pub fn whole(&self) -> &str {
        self.get(0).unwrap_or_default()
    }

    /// Number of groups, including group 0.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Always `false`: a match has at least group 0.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// A single matching strategy.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// A case-insensitive regular expression searched anywhere in the content.
    Regex(Regex),
    /// Text between two delimiters that must match `inner` in full.
    Delimited {
        /// Opening delimiter.
        open: String,
        /// Closing delimiter.
        close: String,
        /// Anchored, case-insensitive pattern for the interior.
        inner: Regex,
    },
}

impl Pattern {
    /// Compiles a case-insensitive regular expression.
    pub fn regex(source: &str) -> PatternResult<Self> {
        Ok(Self::Regex(compile(source)?))
    }

    /// Builds a delimited pattern.
    ///
    /// `inner` is anchored on both ends, so the whole interior has to match.
    pub fn delimited(
        open: impl Into<String>,
        close: impl Into<String>,
        inner: &str,
    ) -> PatternResult<Self> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() || close.is_empty() {
            return Err(PatternError::EmptyDelimiter);
        }
        let inner = compile(&format!("^(?:{inner})$"))?;
        Ok(Self::Delimited { open, close, inner })
    }

    /// Finds the first match in `content`.
    pub fn find(&self, content: &str) -> Option<PatternMatch> {
        match self {
            Self::Regex(regex) => regex
                .captures(content)
                .map(|c| PatternMatch::from_captures(&c)),
            Self::Delimited { open, close, inner } => find_delimited(content, open, close, inner),
        }
    }
}

fn compile(source: &str) -> PatternResult<Regex> {
    Ok(RegexBuilder::new(source).case_insensitive(true).build()?)
}

fn find_delimited(content: &str, open: &str, close: &str, inner: &Regex) -> Option<PatternMatch> {
    let mut cursor = 0;

    while let Some(offset) = content[cursor..].find(open) {
        let start = cursor + offset + open.len();
        // No closing delimiter anywhere after this opening: nothing later can match either.
        let len = content[start..].find(close)?;
        let interior = &content[start..start + len];

        if let Some(captures) = inner.captures(interior) {
            return Some(PatternMatch::from_captures(&captures));
        }
        cursor = start;
    }

    None
}

/// An ordered list of patterns; the first one that matches wins.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Creates an empty set. An empty set never matches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pattern.
    pub fn push(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    /// Appends a pattern (builder style).
    pub fn with(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Returns the captures of the first matching pattern.
    pub fn find(&self, content: &str) -> Option<PatternMatch> {
        self.patterns.iter().find_map(|p| p.find(content))
    }

    /// Whether any pattern matches.
    pub fn is_match(&self, content: &str) -> bool {
        self.find(content).is_some()
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Per-kind pattern sets for one sprocket.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    private: PatternSet,
    room: PatternSet,
}

impl PatternMatcher {
    /// Creates a matcher that matches nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pattern for private messages.
    pub fn private(mut self, pattern: Pattern) -> Self {
        self.private.push(pattern);
        self
    }

    /// Adds a pattern for room messages.
    pub fn room(mut self, pattern: Pattern) -> Self {
        self.room.push(pattern);
        self
    }

    /// Returns the set used for `kind`.
    pub fn patterns(&self, kind: MessageKind) -> &PatternSet {
        match kind {
            MessageKind::Private => &self.private,
            MessageKind::Room => &self.room,
        }
    }

    /// Whether any pattern for the message's kind matches its content.
    pub fn can_handle(&self, message: &Message) -> bool {
        self.patterns(message.kind()).is_match(message.content())
    }

    /// Re-resolves the first matching pattern and returns its captures.
    pub fn resolve(&self, message: &Message) -> Option<PatternMatch> {
        self.patterns(message.kind()).find(message.content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jabbot_core::{PrivateMessage, RoomMessage};

    const IMAGE: &str = r"https?:\S+(png|jpg|jpeg)";

    #[test]
    fn test_regex_is_case_insensitive() {
        let pattern = Pattern::regex("^(auto-stache help)$").unwrap();
        let found = pattern.find("AUTO-Stache HELP").unwrap();
        assert_eq!(found.get(1), Some("AUTO-Stache HELP"));
        assert!(pattern.find("auto-stache help me").is_none());
    }

    #[test]
    fn test_delimited_extracts_interior() {
        let pattern = Pattern::delimited(">", "<", IMAGE).unwrap();
        let found = pattern
            .find("check this out >http://example.com/cat.png<")
            .unwrap();
        assert_eq!(found.whole(), "http://example.com/cat.png");
        assert_eq!(found.get(1), Some("png"));
    }

    #[test]
    fn test_delimited_from_rendered_anchor() {
        let pattern = Pattern::delimited(">", "<", IMAGE).unwrap();
        let content = r#"<a href="http://x.org/DOG.JPG">http://x.org/DOG.JPG</a>"#;
        assert_eq!(pattern.find(content).unwrap().whole(), "http://x.org/DOG.JPG");
    }

    #[test]
    fn test_delimited_skips_non_matching_segments() {
        let pattern = Pattern::delimited(">", "<", IMAGE).unwrap();
        let content = ">not an image< then >https://a.io/b.jpeg<";
        assert_eq!(pattern.find(content).unwrap().whole(), "https://a.io/b.jpeg");
    }

    #[test]
    fn test_delimited_unbalanced_is_no_match() {
        let pattern = Pattern::delimited(">", "<", IMAGE).unwrap();
        assert!(pattern.find("look >http://example.com/cat.png").is_none());
        assert!(pattern.find("http://example.com/cat.png<").is_none());
        assert!(pattern.find(">http://example.com/cat.gif<").is_none());
    }

    #[test]
    fn test_delimited_rejects_empty_delimiters() {
        assert!(matches!(
            Pattern::delimited("", "<", IMAGE),
            Err(PatternError::EmptyDelimiter)
        ));
    }

    #[test]
    fn test_first_pattern_wins() {
        let set = PatternSet::new()
            .with(Pattern::regex("^say (\\w+)$").unwrap())
            .with(Pattern::regex("^(say) .*$").unwrap());

        let found = set.find("say hello").unwrap();
        assert_eq!(found.get(1), Some("hello"));
    }

    #[test]
    fn test_matcher_uses_set_for_message_kind() {
        let matcher = PatternMatcher::new()
            .private(Pattern::regex("^help$").unwrap())
            .room(Pattern::delimited(">", "<", IMAGE).unwrap());

        let private: Message = PrivateMessage::new("alice", "help").into();
        let room_help: Message = RoomMessage::new("lobby", "alice", "help").into();
        let room_image: Message =
            RoomMessage::new("lobby", "alice", ">http://e.com/a.png<").into();

        assert!(matcher.can_handle(&private));
        assert!(!matcher.can_handle(&room_help));
        assert!(matcher.can_handle(&room_image));
        assert_eq!(
            matcher.resolve(&room_image).unwrap().whole(),
            "http://e.com/a.png"
        );
    }
}
