//! Protocol Module
//!
//! Defines the text protocol spoken between clients and the server.
//!
//! ## Framing
//!
//! There is no explicit framing. Every `read` on the socket returns up to
//! `recv_buffer_size` bytes, which are taken as one command after trailing
//! `\r`/`\n` are trimmed.
//!
//! ## Session Negotiation
//! ```text
//! client                         server
//!   │ "reader"                     │
//!   │─────────────────────────────▶│  shared access, fetch snapshot
//!   │◀─────────────────────────────│  "[2024-01-01 12:00:00] hello\n..."
//!   │                         close│
//!
//!   │ "writer"                     │
//!   │─────────────────────────────▶│
//!   │ "start"                      │
//!   │─────────────────────────────▶│  exclusive access
//!   │◀─────────────────────────────│  "OK: writer session started\n"
//!   │ "hello"                      │
//!   │─────────────────────────────▶│  insert
//!   │◀─────────────────────────────│  "OK: message stored\n"
//!   │ "stop" / "exit"              │
//!   │─────────────────────────────▶│
//! ```
//!
//! A role token may arrive glued to the first command (`"writerstart"`,
//! `"writer\nstart"`); the classifier splits them apart.

mod role;
mod command;
mod response;
mod codec;

pub use role::{classify, Classification, Role};
pub use command::WriterCommand;
pub use response::{Response, MUST_START_FIRST, STARTED, STOPPED};
pub use codec::{read_frame, trim_frame, write_frame};
