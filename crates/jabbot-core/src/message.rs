//! Typed chat messages.
//!
//! A [`Message`] is what sprockets see: the sender, the (already decoded)
//! content and, for room traffic, the room it was said in. Messages are
//! immutable once constructed.

use std::fmt;

/// The two kinds of message a sprocket can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A direct message to the bot.
    Private,
    /// A message said in a room the bot is in.
    Room,
}

impl MessageKind {
    /// Returns the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Room => "room",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A direct message sent to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateMessage {
    from: String,
    content: String,
}

impl PrivateMessage {
    /// Creates a private message.
    pub fn new(from: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            content: content.into(),
        }
    }

    /// The user who sent the message.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// The message text.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A message said in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMessage {
    room: String,
    from: String,
    content: String,
}

impl RoomMessage {
    /// Creates a room message.
    pub fn new(
        room: impl Into<String>,
        from: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            room: room.into(),
            from: from.into(),
            content: content.into(),
        }
    }

    /// The room the message was said in.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// The user who said it.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// The message text.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A message routed to sprockets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Direct message.
    Private(PrivateMessage),
    /// Room message.
    Room(RoomMessage),
}

impl Message {
    /// Returns the message kind.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Private(_) => MessageKind::Private,
            Self::Room(_) => MessageKind::Room,
        }
    }

    /// The sender's name.
    pub fn from(&self) -> &str {
        match self {
            Self::Private(m) => m.from(),
            Self::Room(m) => m.from(),
        }
    }

    /// The message text.
    pub fn content(&self) -> &str {
        match self {
            Self::Private(m) => m.content(),
            Self::Room(m) => m.content(),
        }
    }

    /// The room, for room messages.
    pub fn room(&self) -> Option<&str> {
        match self {
            Self::Private(_) => None,
            Self::Room(m) => Some(m.room()),
        }
    }

    /// Returns `true` for private messages.
    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private(_))
    }
}

impl From<PrivateMessage> for Message {
    fn from(msg: PrivateMessage) -> Self {
        Self::Private(msg)
    }
}

impl From<RoomMessage> for Message {
    fn from(msg: RoomMessage) -> Self {
        Self::Room(msg)
    }
}

// ============================================================================
// Transport Decoding
// ============================================================================

/// Longest entity body we try to decode (`&#x10FFFF;` is the longest numeric form).
const MAX_ENTITY_LEN: usize = 10;

/// Decodes HTML entities in chat content.
///
/// Named entities cover the markup escapes (`&amp;`, `&lt;`, `&gt;`,
/// `&quot;`, `&apos;`), the whole Latin-1 block (`&nbsp;` through `&yuml;`,
/// e.g. `&copy;`, `&eacute;`), the HTML 4 special characters (`&mdash;`,
/// `&hellip;`, curly quotes, `&euro;`, `&trade;`) plus arrows and card
/// suits. Greek and math names are not recognised; decimal and hex
/// character references cover everything. Names are case-sensitive, and
/// anything that is not a recognised entity is kept verbatim.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail
            .find(';')
            .filter(|&end| end <= MAX_ENTITY_LEN)
            .and_then(|end| decode_entity(&tail[1..end]).map(|ch| (ch, end)));

        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Names of U+00A0 through U+00FF, in code point order.
const LATIN1_ENTITIES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect",
    "uml", "copy", "ordf", "laquo", "not", "shy", "reg", "macr",
    "deg", "plusmn", "sup2", "sup3", "acute", "micro", "para", "middot",
    "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil",
    "Egrave", "Eacute", "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml",
    "ETH", "Ntilde", "Ograve", "Oacute", "Ocirc", "Otilde", "Ouml", "times",
    "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml", "Yacute", "THORN", "szlig",
    "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig", "ccedil",
    "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml",
    "eth", "ntilde", "ograve", "oacute", "ocirc", "otilde", "ouml", "divide",
    "oslash", "ugrave", "uacute", "ucirc", "uuml", "yacute", "thorn", "yuml",
];

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("OElig", '\u{152}'),
    ("oelig", '\u{153}'),
    ("Scaron", '\u{160}'),
    ("scaron", '\u{161}'),
    ("Yuml", '\u{178}'),
    ("fnof", '\u{192}'),
    ("circ", '\u{2c6}'),
    ("tilde", '\u{2dc}'),
    ("ensp", '\u{2002}'),
    ("emsp", '\u{2003}'),
    ("thinsp", '\u{2009}'),
    ("zwnj", '\u{200c}'),
    ("zwj", '\u{200d}'),
    ("lrm", '\u{200e}'),
    ("rlm", '\u{200f}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("sbquo", '\u{201a}'),
    ("ldquo", '\u{201c}'),
    ("rdquo", '\u{201d}'),
    ("bdquo", '\u{201e}'),
    ("dagger", '\u{2020}'),
    ("Dagger", '\u{2021}'),
    ("bull", '\u{2022}'),
    ("hellip", '\u{2026}'),
    ("permil", '\u{2030}'),
    ("prime", '\u{2032}'),
    ("Prime", '\u{2033}'),
    ("lsaquo", '\u{2039}'),
    ("rsaquo", '\u{203a}'),
    ("euro", '\u{20ac}'),
    ("trade", '\u{2122}'),
    ("larr", '\u{2190}'),
    ("uarr", '\u{2191}'),
    ("rarr", '\u{2192}'),
    ("darr", '\u{2193}'),
    ("harr", '\u{2194}'),
    ("spades", '\u{2660}'),
    ("clubs", '\u{2663}'),
    ("hearts", '\u{2665}'),
    ("diams", '\u{2666}'),
];

fn decode_entity(body: &str) -> Option<char> {
    if let Some(number) = body.strip_prefix('#') {
        let code = match number
            .strip_prefix('x')
            .or_else(|| number.strip_prefix('X'))
        {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }

    if let Some(&(_, ch)) = NAMED_ENTITIES.iter().find(|(name, _)| *name == body) {
        return Some(ch);
    }
    LATIN1_ENTITIES
        .iter()
        .position(|name| *name == body)
        .and_then(|offset| char::from_u32(0xa0 + offset as u32))
}
