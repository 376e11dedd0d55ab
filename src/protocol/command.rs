//! Command definitions
//!
//! Commands a writer connection can send once its role is known.

/// A parsed writer command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterCommand {
    /// Acquire exclusive access
    Start,

    /// Release exclusive access (no-op when not held)
    Stop,

    /// End the session without a reply
    Exit,

    /// Anything else: message text to append to the log
    Message(String),
}

impl WriterCommand {
    /// Parse an already-trimmed frame
    ///
    /// Control words are exact, case-sensitive matches.
    pub fn parse(text: &str) -> Self {
        match text {
            "start" => WriterCommand::Start,
            "stop" => WriterCommand::Stop,
            "exit" => WriterCommand::Exit,
            other => WriterCommand::Message(other.to_string()),
        }
    }

    /// The text a `Message` would persist, or the control word itself
    pub fn as_text(&self) -> &str {
        match self {
            WriterCommand::Start => "start",
            WriterCommand::Stop => "stop",
            WriterCommand::Exit => "exit",
            WriterCommand::Message(text) => text,
        }
    }
}
