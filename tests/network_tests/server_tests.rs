//! Server Tests
//!
//! Tests verify (over real loopback TCP):
//! - Reader and writer sessions end to end
//! - Unknown roles are closed without output
//! - Soft client cap
//! - Shutdown stops accepting but leaves live sessions alone
//! - Config validation at bind time

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel;
use rwlog::client::{read_snapshot, WriterClient};
use rwlog::gateway::{MemoryGateway, Message, StorageGateway, STORED};
use rwlog::protocol::{STARTED, STOPPED};
use rwlog::sync::Holder;
use rwlog::{Config, ReaderWriterLock, RwLogError, Server, ServerHandle};

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    handle: ServerHandle,
    lock: Arc<ReaderWriterLock>,
    thread: Option<JoinHandle<rwlog::Result<()>>>,
}

impl TestServer {
    fn start(config: Config, gateway: Arc<dyn StorageGateway>) -> Self {
        let lock = Arc::new(ReaderWriterLock::new());
        let mut server = Server::new(config, Arc::clone(&lock), gateway);
        let addr = server.bind().unwrap();
        let handle = server.handle();
        let thread = thread::spawn(move || server.run());

        Self {
            addr,
            handle,
            lock,
            thread: Some(thread),
        }
    }

    fn with_memory() -> Self {
        Self::start(test_config().build(), Arc::new(MemoryGateway::new()))
    }

    fn stop(&mut self) {
        self.handle.shutdown();
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

fn test_config() -> rwlog::config::ConfigBuilder {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .in_memory()
        .write_timeout_ms(2000)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_writer_then_reader_over_tcp() {
    let server = TestServer::with_memory();

    let mut writer = WriterClient::connect(server.addr).unwrap();
    assert_eq!(writer.start().unwrap(), STARTED);
    assert_eq!(writer.send("hello").unwrap(), STORED);
    assert_eq!(writer.send("world").unwrap(), STORED);
    assert_eq!(writer.stop().unwrap(), STOPPED);
    writer.exit().unwrap();

    let snapshot = read_snapshot(server.addr).unwrap();
    let lines: Vec<&str> = snapshot.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("] hello"));
    assert!(lines[1].ends_with("] world"));
}

#[test]
fn test_glued_role_and_start_over_tcp() {
    let server = TestServer::with_memory();

    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.write_all(b"writerstart").unwrap();

    let mut buf = [0u8; 256];
    let n = stream.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], STARTED.as_bytes());

    stream.write_all(b"exit").unwrap();
    // Server closes without replying to exit
    assert_eq!(stream.read(&mut buf).unwrap_or(0), 0);

    assert!(wait_until(Duration::from_secs(5), || {
        server.lock.holder() == Holder::Free
    }));
}

#[test]
fn test_unknown_role_closes_without_output() {
    let server = TestServer::with_memory();

    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.write_all(b"hello there").unwrap();

    let mut received = Vec::new();
    // EOF (or reset) with nothing sent
    let _ = stream.read_to_end(&mut received);
    assert!(received.is_empty());
}

#[test]
fn test_silent_disconnect_does_not_disturb_server() {
    let server = TestServer::with_memory();

    drop(TcpStream::connect(server.addr).unwrap());

    let mut writer = WriterClient::connect(server.addr).unwrap();
    assert_eq!(writer.start().unwrap(), STARTED);
    writer.exit().unwrap();
}

#[test]
fn test_writer_disconnect_releases_lock() {
    let server = TestServer::with_memory();

    let mut writer = WriterClient::connect(server.addr).unwrap();
    assert_eq!(writer.start().unwrap(), STARTED);
    assert_eq!(server.lock.holder(), Holder::Writer);

    // Drop without stop/exit
    drop(writer);

    assert!(wait_until(Duration::from_secs(5), || {
        server.lock.holder() == Holder::Free
    }));
    let stats = server.lock.stats();
    assert_eq!(stats.exclusive_acquired, 1);
    assert_eq!(stats.exclusive_released, 1);

    // Next writer is not blocked
    let mut next = WriterClient::connect(server.addr).unwrap();
    assert_eq!(next.start().unwrap(), STARTED);
    next.exit().unwrap();
}

#[test]
fn test_reader_blocked_until_writer_stops() {
    let server = TestServer::with_memory();

    let mut writer = WriterClient::connect(server.addr).unwrap();
    assert_eq!(writer.start().unwrap(), STARTED);
    assert_eq!(writer.send("locked message").unwrap(), STORED);

    let (tx, rx) = channel::unbounded();
    let addr = server.addr;
    let reader = thread::spawn(move || {
        let snapshot = read_snapshot(addr).unwrap();
        tx.send(snapshot).unwrap();
    });

    assert!(
        rx.recv_timeout(Duration::from_millis(300)).is_err(),
        "reader answered while writer held the lock"
    );

    assert_eq!(writer.stop().unwrap(), STOPPED);
    let snapshot = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(snapshot.ends_with("] locked message\n"));

    reader.join().unwrap();
    writer.exit().unwrap();
}

// =============================================================================
// Client Cap Tests
// =============================================================================

#[test]
fn test_connections_past_cap_are_dropped() {
    let gateway = Arc::new(MemoryGateway::with_messages(vec![Message::new(
        "seeded",
        1_700_000_000_000,
    )]));
    let server = TestServer::start(test_config().max_clients(1).build(), gateway);

    let mut writer = WriterClient::connect(server.addr).unwrap();
    // Round-trip so the session is definitely live
    assert_eq!(writer.stop().unwrap(), STOPPED);
    assert_eq!(server.handle.active_connections(), 1);

    match read_snapshot(server.addr) {
        Ok(snapshot) => assert!(snapshot.is_empty(), "refused client got {:?}", snapshot),
        Err(RwLogError::Io(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
    }

    writer.exit().unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        server.handle.active_connections() == 0
    }));

    let snapshot = read_snapshot(server.addr).unwrap();
    assert!(snapshot.ends_with("] seeded\n"));
}

#[test]
fn test_active_connections_tracks_sessions() {
    let server = TestServer::with_memory();
    assert_eq!(server.handle.active_connections(), 0);

    let mut first = WriterClient::connect(server.addr).unwrap();
    let mut second = WriterClient::connect(server.addr).unwrap();
    first.stop().unwrap();
    second.stop().unwrap();
    assert_eq!(server.handle.active_connections(), 2);

    first.exit().unwrap();
    second.exit().unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        server.handle.active_connections() == 0
    }));
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_shutdown_stops_accepting() {
    let mut server = TestServer::with_memory();
    let addr = server.addr;

    server.stop();

    assert!(server.handle.is_shutdown());
    assert!(TcpStream::connect(addr).is_err());
}

#[test]
fn test_shutdown_leaves_live_sessions_running() {
    let mut server = TestServer::with_memory();

    let mut writer = WriterClient::connect(server.addr).unwrap();
    assert_eq!(writer.start().unwrap(), STARTED);

    server.stop();

    assert_eq!(writer.send("after shutdown").unwrap(), STORED);
    assert_eq!(writer.stop().unwrap(), STOPPED);
    writer.exit().unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        server.handle.active_connections() == 0
    }));
    assert_eq!(server.lock.holder(), Holder::Free);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_bind_rejects_invalid_config() {
    let lock = Arc::new(ReaderWriterLock::new());

    let config = test_config().recv_buffer_size(0).build();
    let mut server = Server::new(config, Arc::clone(&lock), Arc::new(MemoryGateway::new()));
    assert!(matches!(server.bind(), Err(RwLogError::Config(_))));

    let config = test_config().max_clients(0).build();
    let mut server = Server::new(config, Arc::clone(&lock), Arc::new(MemoryGateway::new()));
    assert!(matches!(server.bind(), Err(RwLogError::Config(_))));

    let config = test_config().backlog(0).build();
    let mut server = Server::new(config, lock, Arc::new(MemoryGateway::new()));
    assert!(matches!(server.bind(), Err(RwLogError::Config(_))));
}

#[test]
fn test_bind_rejects_unparseable_address() {
    let config = test_config().listen_addr("not an address").build();
    let mut server = Server::new(
        config,
        Arc::new(ReaderWriterLock::new()),
        Arc::new(MemoryGateway::new()),
    );
    assert!(matches!(server.bind(), Err(RwLogError::Config(_))));
}

#[test]
fn test_bind_is_idempotent() {
    let mut server = Server::new(
        test_config().build(),
        Arc::new(ReaderWriterLock::new()),
        Arc::new(MemoryGateway::new()),
    );
    let first = server.bind().unwrap();
    let second = server.bind().unwrap();
    assert_eq!(first, second);
    assert_eq!(server.local_addr(), Some(first));
}

#[test]
fn test_idle_timeout_closes_silent_writer() {
    let server = TestServer::start(
        test_config().idle_timeout_ms(200).build(),
        Arc::new(MemoryGateway::new()),
    );

    let mut writer = WriterClient::connect(server.addr).unwrap();
    assert_eq!(writer.start().unwrap(), STARTED);

    // Writer goes quiet while holding the lock
    assert!(wait_until(Duration::from_secs(5), || {
        server.lock.holder() == Holder::Free
    }));
    assert_eq!(server.lock.stats().exclusive_released, 1);
}
