//! Synchronization Module
//!
//! Reader-writer coordination shared by every session of a server.
//!
//! ## Concurrency Model: First-Reader / Last-Reader
//!
//! - A single exclusive-access **token** is held either by one writer or by
//!   the whole cohort of active readers, never by both.
//! - The first reader to arrive takes the token for the cohort; the last
//!   reader to leave gives it back.
//! - The reader count is mutated only inside its own mutex, which is nested
//!   outside the token.
//!
//! There is no anti-starvation mechanism: overlapping readers can hold off a
//! writer indefinitely, and a writer holds off every reader for as long as it
//! keeps its guard.

mod rwlock;

pub use rwlock::{ExclusiveGuard, Holder, LockStats, ReaderWriterLock, SharedGuard};
