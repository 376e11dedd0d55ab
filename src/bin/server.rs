//! rwlog Server Binary
//!
//! Starts the TCP server for rwlog.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam::channel;
use rwlog::gateway::open_gateway;
use rwlog::{Config, ReaderWriterLock, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// rwlog Server
#[derive(Parser, Debug)]
#[command(name = "rwlog-server")]
#[command(about = "Reader-writer coordinated message log server")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, env = "RWLOG_LISTEN", default_value = "127.0.0.1:8080")]
    listen: String,

    /// Listen backlog
    #[arg(long, env = "RWLOG_BACKLOG", default_value = "64")]
    backlog: i32,

    /// Maximum concurrent clients
    #[arg(short, long, env = "RWLOG_MAX_CLIENTS", default_value = "64")]
    max_clients: usize,

    /// Receive buffer size in bytes
    #[arg(short, long, env = "RWLOG_BUFFER_SIZE", default_value = "4096")]
    buffer_size: usize,

    /// Message log file
    #[arg(short, long, env = "RWLOG_STORE", default_value = "./rwlog_data/messages.log")]
    store: PathBuf,

    /// Keep messages in memory instead of the log file
    #[arg(long)]
    in_memory: bool,

    /// Close connections idle for this long (0 = never)
    #[arg(long, default_value = "0")]
    idle_timeout_ms: u64,

    /// Write timeout for responses (0 = none)
    #[arg(long, default_value = "5000")]
    write_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rwlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("rwlog Server v{}", rwlog::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let builder = Config::builder()
        .listen_addr(&args.listen)
        .backlog(args.backlog)
        .max_clients(args.max_clients)
        .recv_buffer_size(args.buffer_size)
        .idle_timeout_ms(args.idle_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms);
    let config = if args.in_memory {
        tracing::info!("Store: in-memory");
        builder.in_memory().build()
    } else {
        tracing::info!("Store: {}", args.store.display());
        builder.store_path(&args.store).build()
    };

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    // Open gateway
    let gateway = match open_gateway(&config.store) {
        Ok(g) => g,
        Err(e) => {
            tracing::error!("Failed to open message store: {}", e);
            std::process::exit(1);
        }
    };

    let lock = Arc::new(ReaderWriterLock::new());
    let mut server = Server::new(config, lock, gateway);
    if let Err(e) = server.bind() {
        tracing::error!("Failed to bind listener: {}", e);
        std::process::exit(1);
    }
    let handle = server.handle();

    // Ctrl+C only stops accepting; sessions already running finish on their own
    let (stop_tx, stop_rx) = channel::bounded::<()>(1);
    let handler_tx = stop_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = handler_tx.try_send(());
    }) {
        // Default SIGINT disposition still terminates the process
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let server_thread = thread::Builder::new()
        .name("rwlog-accept".to_string())
        .spawn(move || server.run());
    let server_thread = match server_thread {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to start accept thread: {}", e);
            std::process::exit(1);
        }
    };

    if stop_rx.recv().is_ok() {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
    }
    drop(stop_tx);
    handle.shutdown();

    match server_thread.join() {
        Ok(Ok(())) => tracing::info!("Server stopped"),
        Ok(Err(e)) => {
            tracing::error!("Server error: {}", e);
            std::process::exit(1);
        }
        Err(_) => {
            tracing::error!("Accept thread panicked");
            std::process::exit(1);
        }
    }
}
