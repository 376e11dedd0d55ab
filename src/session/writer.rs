//! Writer session
//!
//! Persistent connection holding (or not) the exclusive lock across many
//! commands.
//!
//! ## States
//! ```text
//!              start                     exit / close / error
//! NotStarted ─────────▶ Locked ──────────────────────────────▶ Closed
//!     ▲                   │            (guard dropped => release)
//!     └──────── stop ─────┘
//! ```

use std::io::{Read, Write};

use crate::error::Result;
use crate::protocol::{read_frame, trim_frame, write_frame, Response, WriterCommand};
use crate::sync::{ExclusiveGuard, ReaderWriterLock};

use super::SessionContext;

/// Lock state of a writer connection
///
/// The exclusive hold exists only as the guard inside `Locked`, so leaving
/// that state by any path releases it.
enum WriterState<'l> {
    NotStarted,
    Locked(ExclusiveGuard<'l>),
}

enum Flow {
    Continue,
    Exit,
}

/// Handles one writer connection
pub struct WriterSession<'a, S> {
    stream: S,
    ctx: &'a SessionContext,
    peer: &'a str,
    buf: Vec<u8>,
}

impl<'a, S: Read + Write> WriterSession<'a, S> {
    /// `buf` is the connection's receive buffer, reused for every command
    pub fn new(stream: S, ctx: &'a SessionContext, peer: &'a str, buf: Vec<u8>) -> Self {
        Self {
            stream,
            ctx,
            peer,
            buf,
        }
    }

    /// Serve commands until `exit`, peer close or a transport error
    ///
    /// `inline` is a command that arrived in the same frame as the role token.
    pub fn run(mut self, inline: Option<String>) -> Result<()> {
        tracing::info!("Writer connected ({})", self.peer);

        let ctx = self.ctx;
        let lock: &'a ReaderWriterLock = &ctx.lock;
        let mut state = WriterState::NotStarted;

        let outcome = self.serve(lock, &mut state, inline);

        if let WriterState::Locked(guard) = state {
            drop(guard);
            tracing::info!("Writer lock auto-released ({})", self.peer);
        }
        tracing::info!("Writer disconnected ({})", self.peer);

        match outcome {
            Err(e) if e.is_disconnect() => {
                tracing::debug!("Writer {} connection ended: {}", self.peer, e);
                Ok(())
            }
            other => other,
        }
    }

    fn serve(
        &mut self,
        lock: &'a ReaderWriterLock,
        state: &mut WriterState<'a>,
        inline: Option<String>,
    ) -> Result<()> {
        if let Some(text) = inline {
            if let Flow::Exit = self.dispatch(lock, state, WriterCommand::parse(&text))? {
                return Ok(());
            }
        }

        while let Some(frame) = read_frame(&mut self.stream, &mut self.buf)? {
            let text = String::from_utf8_lossy(&frame);
            let text = trim_frame(&text);
            if text.is_empty() {
                continue;
            }

            tracing::trace!("Received from writer {}: {:?}", self.peer, text);

            if let Flow::Exit = self.dispatch(lock, state, WriterCommand::parse(text))? {
                return Ok(());
            }
        }

        tracing::debug!("Writer {} closed connection", self.peer);
        Ok(())
    }

    /// Apply one command to the state machine and send its single response
    fn dispatch(
        &mut self,
        lock: &'a ReaderWriterLock,
        state: &mut WriterState<'a>,
        command: WriterCommand,
    ) -> Result<Flow> {
        let response = match command {
            WriterCommand::Exit => return Ok(Flow::Exit),

            WriterCommand::Start if matches!(state, WriterState::NotStarted) => {
                let guard = match lock.try_acquire_exclusive() {
                    Some(guard) => guard,
                    None => {
                        tracing::debug!(
                            "Writer {} waiting for exclusive access ({:?} holds it)",
                            self.peer,
                            lock.holder()
                        );
                        lock.acquire_exclusive()
                    }
                };
                *state = WriterState::Locked(guard);
                tracing::info!("Writer STARTED ({})", self.peer);
                Response::started()
            }

            WriterCommand::Stop => {
                if let WriterState::Locked(guard) =
                    std::mem::replace(state, WriterState::NotStarted)
                {
                    drop(guard);
                    tracing::info!("Writer STOPPED ({})", self.peer);
                }
                Response::stopped()
            }

            // `start` while already Locked lands here and is stored as text.
            other => match state {
                WriterState::NotStarted => {
                    tracing::info!("Rejected write from {} (no lock)", self.peer);
                    Response::must_start_first()
                }
                WriterState::Locked(_) => Response::relay(self.ctx.gateway.insert(other.as_text())),
            },
        };

        write_frame(&mut self.stream, response.as_bytes())?;
        Ok(Flow::Continue)
    }
}
