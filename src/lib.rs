//! # rwlog
//!
//! A shared append-only message log served over TCP under reader-writer
//! coordination:
//! - Any number of readers fetch the log concurrently
//! - A writer holds exclusive access across a whole persistent connection,
//!   from `start` to `stop` (or until it disconnects)
//! - First-reader / last-reader hand-off of the exclusive token
//! - Role negotiation that tolerates the role token glued to a payload
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one thread per connection)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Role Classifier                             │
//! │               ("reader" / "writer")                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Writer    │          │   Reader    │
//!   │  Session    │          │  Session    │
//!   └──────┬──────┘          └──────┬──────┘
//!          │   ReaderWriterLock     │
//!          │ (exclusive / shared)   │
//!          └───────────┬────────────┘
//!                      ▼
//!              ┌───────────────┐
//!              │Storage Gateway│
//!              │ (memory/file) │
//!              └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod sync;
pub mod protocol;
pub mod gateway;
pub mod session;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, RwLogError};
pub use config::{Config, StoreConfig};
pub use gateway::{Message, StorageGateway};
pub use network::{Server, ServerHandle};
pub use sync::ReaderWriterLock;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of rwlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
