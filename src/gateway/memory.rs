//! In-memory gateway
//!
//! Vec-backed log with RwLock for concurrency.

use parking_lot::RwLock;

use super::{FetchResult, Message, StorageGateway, STORED};

/// Volatile message log
#[derive(Debug, Default)]
pub struct MemoryGateway {
    messages: RwLock<Vec<Message>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway pre-filled with messages (e.g. for tests)
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: RwLock::new(messages),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

impl StorageGateway for MemoryGateway {
    fn insert(&self, text: &str) -> String {
        self.messages.write().push(Message::now(text));
        STORED.to_string()
    }

    fn fetch_all(&self) -> FetchResult {
        Ok(self.messages.read().clone())
    }
}
