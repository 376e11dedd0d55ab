//! Network Module
//!
//! TCP listener and connection dispatch.
//!
//! ## Architecture
//! - Single acceptor loop polling a non-blocking listener
//! - One OS thread per accepted connection, running a session
//! - Soft cap on live sessions; connections past it are closed at once

mod server;

pub use server::{Server, ServerHandle};
