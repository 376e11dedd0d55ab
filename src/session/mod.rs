//! Session Module
//!
//! Runs one connection from role classification to close.
//!
//! ```text
//! first frame ──▶ classify ──┬─▶ Writer ──▶ WriterSession (loop until exit/close)
//!                            ├─▶ Reader ──▶ ReaderSession (one snapshot, close)
//!                            └─▶ Unknown ─▶ close, nothing sent
//! ```
//!
//! Sessions are generic over `Read + Write` so the state machines can be
//! driven by in-memory streams as well as `TcpStream`.

mod writer;
mod reader;

use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::Result;
use crate::gateway::StorageGateway;
use crate::protocol::{classify, read_frame, Classification, Role};
use crate::sync::ReaderWriterLock;

pub use reader::ReaderSession;
pub use writer::WriterSession;

/// Everything a session shares with the rest of the server
#[derive(Clone)]
pub struct SessionContext {
    /// Reader-writer lock shared by all sessions of one server
    pub lock: Arc<ReaderWriterLock>,

    /// Where writers append and readers fetch
    pub gateway: Arc<dyn StorageGateway>,

    /// Size of the per-read receive buffer
    pub recv_buffer_size: usize,
}

impl SessionContext {
    pub fn new(
        lock: Arc<ReaderWriterLock>,
        gateway: Arc<dyn StorageGateway>,
        recv_buffer_size: usize,
    ) -> Self {
        Self {
            lock,
            gateway,
            recv_buffer_size,
        }
    }
}

/// Handle a freshly accepted connection (blocking until it closes)
///
/// Returns the role the connection resolved to. Disconnects are not errors;
/// only unexpected transport failures are returned as `Err`.
pub fn handle_connection<S: Read + Write>(
    mut stream: S,
    ctx: &SessionContext,
    peer: &str,
) -> Result<Role> {
    let mut buf = vec![0u8; ctx.recv_buffer_size.max(1)];

    let first = match read_frame(&mut stream, &mut buf) {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            tracing::debug!("Client {} closed before sending a role", peer);
            return Ok(Role::Unknown);
        }
        Err(e) if e.is_disconnect() => {
            tracing::debug!("Client {} dropped before sending a role: {}", peer, e);
            return Ok(Role::Unknown);
        }
        Err(e) => return Err(e),
    };

    let Classification { role, inline } = classify(&first);

    match role {
        Role::Writer => WriterSession::new(stream, ctx, peer, buf).run(inline)?,
        Role::Reader => ReaderSession::new(stream, ctx, peer).run()?,
        Role::Unknown => {
            tracing::warn!(
                "Unknown role received from {}: {:?}",
                peer,
                String::from_utf8_lossy(&first)
            );
        }
    }

    Ok(role)
}
