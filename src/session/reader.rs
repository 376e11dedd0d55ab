//! Reader session
//!
//! Single pass: shared access, snapshot, release, close.

use std::io::{Read, Write};

use crate::error::Result;
use crate::gateway::render_snapshot;
use crate::protocol::write_frame;

use super::SessionContext;

/// Handles one reader connection
pub struct ReaderSession<'a, S> {
    stream: S,
    ctx: &'a SessionContext,
    peer: &'a str,
}

impl<'a, S: Read + Write> ReaderSession<'a, S> {
    pub fn new(stream: S, ctx: &'a SessionContext, peer: &'a str) -> Self {
        Self { stream, ctx, peer }
    }

    /// Send the full log snapshot and return
    ///
    /// The shared guard brackets both the fetch and the send, and is dropped
    /// on every path out of the block.
    pub fn run(mut self) -> Result<()> {
        tracing::info!("Reader connected ({})", self.peer);
        let ctx = self.ctx;

        let sent = {
            let _shared = ctx.lock.acquire_shared();
            tracing::debug!(
                "Reader {} entered shared section ({} active)",
                self.peer,
                ctx.lock.reader_count()
            );

            let frame = match ctx.gateway.fetch_all() {
                Ok(messages) => render_snapshot(&messages),
                Err(diagnostic) => diagnostic,
            };
            write_frame(&mut self.stream, frame.as_bytes())
        };

        tracing::info!("Reader finished and disconnected ({})", self.peer);

        match sent {
            Err(e) if e.is_disconnect() => {
                tracing::debug!("Reader {} left before the snapshot was sent: {}", self.peer, e);
                Ok(())
            }
            other => other,
        }
    }
}
