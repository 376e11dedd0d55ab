//! Response definitions
//!
//! Text frames sent back to clients.

/// Acknowledgement for `start`
pub const STARTED: &str = "OK: writer session started\n";

/// Acknowledgement for `stop`, whether or not the lock was held
pub const STOPPED: &str = "OK: writer session stopped\n";

/// Reply to message text sent before `start`
pub const MUST_START_FIRST: &str = "ERROR: You must start writing first\n";

/// A response frame to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    text: String,
}

impl Response {
    /// Writer now holds exclusive access
    pub fn started() -> Self {
        Self::from_text(STARTED)
    }

    /// Writer released exclusive access (or never held it)
    pub fn stopped() -> Self {
        Self::from_text(STOPPED)
    }

    /// Message rejected because the writer has not sent `start`
    pub fn must_start_first() -> Self {
        Self::from_text(MUST_START_FIRST)
    }

    /// Relay a gateway result line as-is
    pub fn relay(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    fn from_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}
