//! Reader-writer lock
//!
//! Mutex-protected reader counter plus a condvar-guarded token.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

/// Who currently owns the exclusive-access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    /// Nobody; the next acquirer gets it immediately
    Free,

    /// The cohort of active readers
    Readers,

    /// A single writer session
    Writer,
}

/// Acquire/release counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockStats {
    pub shared_acquired: u64,
    pub shared_released: u64,
    pub exclusive_acquired: u64,
    pub exclusive_released: u64,
}

/// Lock giving readers shared access as a batch and writers true exclusivity
///
/// Unlike `parking_lot::RwLock`, the exclusive hold is not tied to a single
/// call stack frame's data: it is a token a writer session keeps across many
/// request/response round-trips. Hand it out through [`acquire_exclusive`]
/// and [`acquire_shared`]; the returned guards release on drop.
///
/// [`acquire_exclusive`]: ReaderWriterLock::acquire_exclusive
/// [`acquire_shared`]: ReaderWriterLock::acquire_shared
pub struct ReaderWriterLock {
    /// Active reader count (inner critical section)
    readers: Mutex<usize>,

    /// Mirror of `readers` readable without blocking behind a waiting reader
    active_readers: AtomicUsize,

    /// Exclusive-access token
    token: Mutex<Holder>,

    /// Signalled whenever the token becomes free
    token_free: Condvar,

    shared_acquired: AtomicU64,
    shared_released: AtomicU64,
    exclusive_acquired: AtomicU64,
    exclusive_released: AtomicU64,
}

impl ReaderWriterLock {
    /// Create a new lock with the token free and no readers
    pub fn new() -> Self {
        Self {
            readers: Mutex::new(0),
            active_readers: AtomicUsize::new(0),
            token: Mutex::new(Holder::Free),
            token_free: Condvar::new(),
            shared_acquired: AtomicU64::new(0),
            shared_released: AtomicU64::new(0),
            exclusive_acquired: AtomicU64::new(0),
            exclusive_released: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Shared Access
    // =========================================================================

    /// Join the reader cohort, blocking while a writer holds the token
    ///
    /// The first reader waits for the token while still inside the counter
    /// section, so later readers queue behind it instead of slipping past a
    /// writer.
    pub fn acquire_shared(&self) -> SharedGuard<'_> {
        let mut readers = self.readers.lock();
        if *readers == 0 {
            self.take_token(Holder::Readers);
        }
        *readers += 1;
        self.active_readers.store(*readers, Ordering::Release);
        drop(readers);

        self.shared_acquired.fetch_add(1, Ordering::Relaxed);
        SharedGuard { lock: self }
    }

    fn release_shared(&self) {
        let mut readers = self.readers.lock();
        debug_assert!(*readers > 0, "release_shared without a matching acquire");
        *readers = readers.saturating_sub(1);
        self.active_readers.store(*readers, Ordering::Release);
        if *readers == 0 {
            self.give_token();
        }
        drop(readers);

        self.shared_released.fetch_add(1, Ordering::Relaxed);
    }

    // =========================================================================
    // Exclusive Access
    // =========================================================================

    /// Take the token for a writer, blocking until it is free
    pub fn acquire_exclusive(&self) -> ExclusiveGuard<'_> {
        self.take_token(Holder::Writer);
        self.exclusive_acquired.fetch_add(1, Ordering::Relaxed);
        ExclusiveGuard { lock: self }
    }

    /// Take the token for a writer only if nobody holds it right now
    pub fn try_acquire_exclusive(&self) -> Option<ExclusiveGuard<'_>> {
        let mut holder = self.token.lock();
        if *holder != Holder::Free {
            return None;
        }
        *holder = Holder::Writer;
        drop(holder);

        self.exclusive_acquired.fetch_add(1, Ordering::Relaxed);
        Some(ExclusiveGuard { lock: self })
    }

    fn release_exclusive(&self) {
        self.give_token();
        self.exclusive_released.fetch_add(1, Ordering::Relaxed);
    }

    // =========================================================================
    // Token
    // =========================================================================

    fn take_token(&self, who: Holder) {
        let mut holder = self.token.lock();
        while *holder != Holder::Free {
            self.token_free.wait(&mut holder);
        }
        *holder = who;
    }

    fn give_token(&self) {
        let mut holder = self.token.lock();
        *holder = Holder::Free;
        drop(holder);
        self.token_free.notify_one();
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Number of readers currently inside the shared section
    pub fn reader_count(&self) -> usize {
        self.active_readers.load(Ordering::Acquire)
    }

    /// Current owner of the token
    pub fn holder(&self) -> Holder {
        *self.token.lock()
    }

    /// Snapshot of acquire/release counters
    pub fn stats(&self) -> LockStats {
        LockStats {
            shared_acquired: self.shared_acquired.load(Ordering::Relaxed),
            shared_released: self.shared_released.load(Ordering::Relaxed),
            exclusive_acquired: self.exclusive_acquired.load(Ordering::Relaxed),
            exclusive_released: self.exclusive_released.load(Ordering::Relaxed),
        }
    }
}

impl Default for ReaderWriterLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReaderWriterLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderWriterLock")
            .field("readers", &self.reader_count())
            .field("holder", &self.holder())
            .finish()
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Membership in the reader cohort; leaving the cohort happens on drop
#[must_use = "dropping the guard immediately releases shared access"]
pub struct SharedGuard<'a> {
    lock: &'a ReaderWriterLock,
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_shared();
    }
}

impl fmt::Debug for SharedGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedGuard").finish_non_exhaustive()
    }
}

/// A writer's hold on the token; released on drop
#[must_use = "dropping the guard immediately releases exclusive access"]
pub struct ExclusiveGuard<'a> {
    lock: &'a ReaderWriterLock,
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_exclusive();
    }
}

impl fmt::Debug for ExclusiveGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveGuard").finish_non_exhaustive()
    }
}
