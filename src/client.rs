//! Client
//!
//! Blocking client for both connection roles.
//!
//! The role token is sent as its own write, but TCP may still deliver it glued
//! to the first command; the server's role classifier copes with that.

use std::io::Read;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use crate::error::{Result, RwLogError};
use crate::protocol::{read_frame, write_frame};

/// Default receive buffer for responses
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Connect as a reader and return the snapshot the server sends
///
/// Reads until the server closes the connection.
pub fn read_snapshot(addr: impl ToSocketAddrs) -> Result<String> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    write_frame(&mut stream, b"reader")?;

    let mut snapshot = Vec::new();
    stream.read_to_end(&mut snapshot)?;
    Ok(String::from_utf8_lossy(&snapshot).into_owned())
}

/// A persistent writer connection
pub struct WriterClient {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl WriterClient {
    /// Connect and announce the writer role
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let mut stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        write_frame(&mut stream, b"writer")?;

        Ok(Self {
            stream,
            buf: vec![0u8; DEFAULT_BUFFER_SIZE],
        })
    }

    /// Acquire exclusive access (blocks while others hold it)
    pub fn start(&mut self) -> Result<String> {
        self.request("start")
    }

    /// Release exclusive access
    pub fn stop(&mut self) -> Result<String> {
        self.request("stop")
    }

    /// Submit message text
    pub fn send(&mut self, text: &str) -> Result<String> {
        self.request(text)
    }

    /// Send one command and wait for its single response frame
    pub fn request(&mut self, command: &str) -> Result<String> {
        write_frame(&mut self.stream, command.as_bytes())?;
        match read_frame(&mut self.stream, &mut self.buf)? {
            Some(frame) => Ok(String::from_utf8_lossy(&frame).into_owned()),
            None => Err(RwLogError::Network(
                "server closed the connection".to_string(),
            )),
        }
    }

    /// End the session; the server replies with nothing
    pub fn exit(mut self) -> Result<()> {
        write_frame(&mut self.stream, b"exit")?;
        // The server may already have closed its side
        let _ = self.stream.shutdown(Shutdown::Both);
        Ok(())
    }
}
