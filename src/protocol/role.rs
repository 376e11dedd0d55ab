//! Role classification
//!
//! Decides from the first frame of a connection whether it is a reader or a
//! writer session.

use super::codec::trim_frame;

const WRITER_TOKEN: &str = "writer";
const READER_TOKEN: &str = "reader";

/// Role of a connection, resolved once from its first frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Neither token present; the connection is closed without a reply
    Unknown,
    Reader,
    Writer,
}

/// Outcome of classifying a first frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub role: Role,

    /// Text that followed the writer token in the same frame, to be handled
    /// as the writer's first command. Always `None` for readers.
    pub inline: Option<String>,
}

impl Classification {
    fn unknown() -> Self {
        Self {
            role: Role::Unknown,
            inline: None,
        }
    }

    fn reader() -> Self {
        Self {
            role: Role::Reader,
            inline: None,
        }
    }

    fn writer(rest: &str) -> Self {
        let payload = trim_frame(rest.trim_start_matches(|c: char| c.is_whitespace() || c == '\0'));
        Self {
            role: Role::Writer,
            inline: (!payload.is_empty()).then(|| payload.to_string()),
        }
    }
}

/// Classify the first frame received on a connection
///
/// Prefix matches win; otherwise the tokens are searched for anywhere in the
/// frame, `writer` before `reader`. Never fails: anything unrecognizable is
/// [`Role::Unknown`].
pub fn classify(frame: &[u8]) -> Classification {
    let text = String::from_utf8_lossy(frame);
    let text = trim_frame(&text);

    if let Some(rest) = text.strip_prefix(WRITER_TOKEN) {
        return Classification::writer(rest);
    }
    if text.starts_with(READER_TOKEN) {
        return Classification::reader();
    }

    if let Some(pos) = text.find(WRITER_TOKEN) {
        return Classification::writer(&text[pos + WRITER_TOKEN.len()..]);
    }
    if text.contains(READER_TOKEN) {
        return Classification::reader();
    }

    Classification::unknown()
}
