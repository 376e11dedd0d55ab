//! File gateway
//!
//! Append-only message log on disk.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ Len (4) │ CRC (4) │ bincode(Message)│ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2                                │
//! │ ...                                     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Integers are little-endian; the CRC covers the payload only. A record that
//! is cut short or fails its CRC ends the readable log.
//!
//! Appends are all-or-nothing: a record that fails to write is cut back off
//! the file before the error is reported, so a rejected insert never shows
//! up in a later snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Result, RwLogError};

use super::{fetch_failed, insert_failed, FetchResult, Message, StorageGateway, STORED};

/// Length (4) + CRC (4)
pub const RECORD_HEADER_SIZE: usize = 8;

/// Largest payload accepted when reading back (16 MB)
pub const MAX_RECORD_SIZE: u32 = 16 * 1024 * 1024;

/// Result of scanning the log on open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of intact records found
    pub records_recovered: u64,

    /// Bytes cut from the end (torn or corrupted tail)
    pub bytes_truncated: u64,
}

/// Message log stored in a single append-only file
pub struct FileGateway {
    path: PathBuf,

    /// Appends are serialized here; the protocol lock already admits a
    /// single writer, this only keeps the file handle `Sync`.
    file: Mutex<File>,

    recovery: RecoveryResult,
}

impl FileGateway {
    /// Open or create the log at `path`
    ///
    /// On open:
    /// 1. Create parent directories
    /// 2. Scan all records, stopping at the first bad one
    /// 3. Truncate anything after the last good record
    /// 4. Reopen for appending
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let recovery = Self::recover(&path)?;
        if recovery.bytes_truncated > 0 {
            tracing::warn!(
                "Message log {}: truncated {} trailing bytes after {} records",
                path.display(),
                recovery.bytes_truncated,
                recovery.records_recovered
            );
        } else {
            tracing::debug!(
                "Message log {}: {} records",
                path.display(),
                recovery.records_recovered
            );
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            recovery,
        })
    }

    fn recover(path: &Path) -> Result<RecoveryResult> {
        if !path.exists() {
            return Ok(RecoveryResult::default());
        }

        let bytes = fs::read(path)?;
        let (messages, valid_len) = decode_records(&bytes);
        let bytes_truncated = (bytes.len() - valid_len) as u64;

        if bytes_truncated > 0 {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len as u64)?;
            file.sync_all()?;
        }

        Ok(RecoveryResult {
            records_recovered: messages.len() as u64,
            bytes_truncated,
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// What the scan on open found
    pub fn recovery(&self) -> RecoveryResult {
        self.recovery
    }

    /// Append one message record
    ///
    /// Either the whole record reaches the file or none of it does.
    pub fn append(&self, message: &Message) -> Result<()> {
        let record = encode_record(message)?;
        let mut file = self.file.lock();
        append_record(&mut *file, &record)
    }

    /// Read every intact record from the start of the file
    pub fn read_all(&self) -> Result<Vec<Message>> {
        let bytes = fs::read(&self.path)?;
        let (messages, _) = decode_records(&bytes);
        Ok(messages)
    }
}

impl StorageGateway for FileGateway {
    fn insert(&self, text: &str) -> String {
        match self.append(&Message::now(text)) {
            Ok(()) => STORED.to_string(),
            Err(e) => {
                tracing::warn!("Insert into {} failed: {}", self.path.display(), e);
                insert_failed(e)
            }
        }
    }

    fn fetch_all(&self) -> FetchResult {
        self.read_all().map_err(|e| {
            tracing::warn!("Fetch from {} failed: {}", self.path.display(), e);
            fetch_failed(e)
        })
    }
}

// =============================================================================
// Atomic Append
// =============================================================================

/// Append-only storage a record can be rolled back from
pub trait LogSink: Write {
    /// Current length in bytes
    fn len(&self) -> io::Result<u64>;

    /// Cut the sink back to `len` bytes
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogSink for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write one encoded record to the end of `sink`
///
/// On failure the sink is truncated to its length before the call, so a
/// partial record is never left behind for the next append to complete.
pub fn append_record<S: LogSink + ?Sized>(sink: &mut S, record: &[u8]) -> Result<()> {
    let before = sink.len()?;

    let written = sink.write_all(record).and_then(|()| sink.flush());
    if let Err(e) = written {
        if let Err(rollback) = sink.truncate(before) {
            tracing::error!(
                "Failed to roll back partial record at offset {}: {}",
                before,
                rollback
            );
        }
        return Err(e.into());
    }
    Ok(())
}

// =============================================================================
// Record Encoding/Decoding
// =============================================================================

/// Encode a message as one log record
pub fn encode_record(message: &Message) -> Result<Vec<u8>> {
    let payload =
        bincode::serialize(message).map_err(|e| RwLogError::Serialization(e.to_string()))?;

    if payload.len() > MAX_RECORD_SIZE as usize {
        return Err(RwLogError::Storage(format!(
            "Message too large: {} bytes (max {})",
            payload.len(),
            MAX_RECORD_SIZE
        )));
    }

    let crc = crc32fast::hash(&payload);

    let mut record = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(&crc.to_le_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

/// Decode records from the start of `bytes`
///
/// Returns the intact messages and the byte length they occupy. Decoding
/// stops at the first short, oversized, CRC-failing or undecodable record.
pub fn decode_records(bytes: &[u8]) -> (Vec<Message>, usize) {
    let mut messages = Vec::new();
    let mut offset = 0;

    while bytes.len() - offset >= RECORD_HEADER_SIZE {
        let header = &bytes[offset..offset + RECORD_HEADER_SIZE];
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if len > MAX_RECORD_SIZE {
            break;
        }

        let start = offset + RECORD_HEADER_SIZE;
        let end = start + len as usize;
        if end > bytes.len() {
            break;
        }

        let payload = &bytes[start..end];
        if crc32fast::hash(payload) != crc {
            break;
        }

        match bincode::deserialize::<Message>(payload) {
            Ok(message) => messages.push(message),
            Err(_) => break,
        }
        offset = end;
    }

    (messages, offset)
}
