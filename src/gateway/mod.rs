//! Storage Gateway Module
//!
//! The narrow interface sessions use to persist and read messages.
//!
//! ## Contract
//! - `insert` and `fetch_all` block the calling session, never panic and
//!   never return a crate error: failures come back as text for the client.
//! - `fetch_all` returns messages in insertion order.
//! - Gateways do no locking of their own on behalf of the protocol; the
//!   reader-writer lock in [`crate::sync`] decides who may call what.
//!
//! ## Implementations
//! - [`MemoryGateway`]: volatile, for tests and throwaway servers
//! - [`FileGateway`]: append-only log file with CRC-checked records

mod memory;
mod file;

use std::sync::Arc;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::error::Result;

pub use memory::MemoryGateway;
pub use file::{
    append_record, decode_records, encode_record, FileGateway, LogSink, RecoveryResult,
    MAX_RECORD_SIZE, RECORD_HEADER_SIZE,
};

/// Result line for a successful insert
pub const STORED: &str = "OK: message stored\n";

/// Ordered snapshot, or a diagnostic line to send instead
pub type FetchResult = std::result::Result<Vec<Message>, String>;

/// Collaborator performing insert/fetch of messages
pub trait StorageGateway: Send + Sync {
    /// Append a message; returns the line to relay to the writer
    fn insert(&self, text: &str) -> String;

    /// All messages in insertion order
    fn fetch_all(&self) -> FetchResult;
}

/// A stored message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message text as sent by the writer
    pub text: String,

    /// Timestamp (unix millis) when the message was stored
    pub timestamp: u64,
}

impl Message {
    pub fn new(text: impl Into<String>, timestamp: u64) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }

    /// Message stamped with the current time
    pub fn now(text: impl Into<String>) -> Self {
        Self::new(text, now_millis())
    }

    /// `[YYYY-MM-DD HH:MM:SS] text` in local time, newline-terminated
    pub fn render(&self) -> String {
        let stamp = i64::try_from(self.timestamp)
            .ok()
            .and_then(|ms| Local.timestamp_millis_opt(ms).single())
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.timestamp.to_string());
        format!("[{}] {}\n", stamp, self.text)
    }
}

/// Render a snapshot as one response frame
pub fn render_snapshot(messages: &[Message]) -> String {
    messages.iter().map(Message::render).collect()
}

/// Result line for a failed insert
pub fn insert_failed(reason: impl std::fmt::Display) -> String {
    format!("ERROR: insert failed: {}\n", reason)
}

/// Diagnostic line for a failed fetch
pub fn fetch_failed(reason: impl std::fmt::Display) -> String {
    format!("ERROR: fetch failed: {}\n", reason)
}

/// Open the gateway selected by the configuration
pub fn open_gateway(store: &StoreConfig) -> Result<Arc<dyn StorageGateway>> {
    match store {
        StoreConfig::Memory => Ok(Arc::new(MemoryGateway::new())),
        StoreConfig::File(path) => Ok(Arc::new(FileGateway::open(path)?)),
    }
}

pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
