//! Error types for rwlog
//!
//! Provides a unified error type for all operations.
//!
//! Protocol violations and storage failures seen by a connected client are
//! reported as response frames, not as `RwLogError`. This type covers the
//! failures that end a session or prevent the server from starting.

use thiserror::Error;

/// Result type alias using RwLogError
pub type Result<T> = std::result::Result<T, RwLogError>;

/// Unified error type for rwlog operations
#[derive(Debug, Error)]
pub enum RwLogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RwLogError {
    /// Whether this error means the peer went away (or timed out) rather
    /// than something actually failing on our side.
    pub fn is_disconnect(&self) -> bool {
        match self {
            RwLogError::Io(e) => is_disconnect_kind(e.kind()),
            _ => false,
        }
    }
}

/// I/O error kinds that end a session as a normal close
pub(crate) fn is_disconnect_kind(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind;

    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            // Read timeout (Windows uses TimedOut instead of WouldBlock)
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
