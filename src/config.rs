//! Configuration for rwlog
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, RwLogError};

/// Main configuration for an rwlog server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Listen backlog passed to `listen(2)`
    pub backlog: i32,

    /// Soft cap on concurrently live sessions; connections past it are dropped
    pub max_clients: usize,

    /// Size of the single receive buffer used for each read
    pub recv_buffer_size: usize,

    /// Idle read timeout (milliseconds, 0 = wait forever)
    pub idle_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = no timeout)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Where messages are kept
    pub store: StoreConfig,
}

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Volatile in-process log (lost on restart)
    Memory,

    /// Append-only log file at the given path
    File(PathBuf),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            backlog: 64,
            max_clients: 64,
            recv_buffer_size: 4096,
            idle_timeout_ms: 0,
            write_timeout_ms: 5000,
            store: StoreConfig::File(PathBuf::from("./rwlog_data/messages.log")),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.recv_buffer_size == 0 {
            return Err(RwLogError::Config(
                "recv_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.max_clients == 0 {
            return Err(RwLogError::Config(
                "max_clients must be greater than zero".to_string(),
            ));
        }
        if self.backlog <= 0 {
            return Err(RwLogError::Config(format!(
                "backlog must be positive, got {}",
                self.backlog
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the listen backlog
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.config.backlog = backlog;
        self
    }

    /// Set the soft cap on concurrent clients
    pub fn max_clients(mut self, count: usize) -> Self {
        self.config.max_clients = count;
        self
    }

    /// Set the receive buffer size (in bytes)
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// Set the idle read timeout (in milliseconds)
    pub fn idle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.idle_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Keep messages in memory only
    pub fn in_memory(mut self) -> Self {
        self.config.store = StoreConfig::Memory;
        self
    }

    /// Keep messages in an append-only file
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store = StoreConfig::File(path.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
