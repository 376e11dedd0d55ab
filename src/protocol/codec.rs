//! Protocol codec
//!
//! Reading and writing raw text frames.
//!
//! A frame is whatever a single `read` returns, up to the receive buffer
//! size. Nothing is reassembled across reads and nothing is split within one.

use std::io::{Read, Write};

use crate::error::Result;

/// Read one frame
///
/// Returns `Ok(None)` when the peer has closed its side.
pub fn read_frame<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<Option<Vec<u8>>> {
    let n = loop {
        match reader.read(buf) {
            Ok(n) => break n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    };

    if n == 0 {
        return Ok(None);
    }
    Ok(Some(buf[..n].to_vec()))
}

/// Write a whole frame and flush it
pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}

/// Strip trailing line terminators
///
/// NUL padding counts as a terminator: C clients send fixed-size role
/// buffers such as `"writer\0\0\0\0"`.
pub fn trim_frame(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n', '\0'])
}
