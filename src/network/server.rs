//! TCP Server
//!
//! Accepts connections and spawns one session thread per connection.

use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, RwLogError};
use crate::gateway::StorageGateway;
use crate::session::{handle_connection, SessionContext};
use crate::sync::ReaderWriterLock;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server dispatching reader and writer sessions
pub struct Server {
    config: Config,
    ctx: SessionContext,
    listener: Option<TcpListener>,
    handle: ServerHandle,
    next_conn_id: u64,
}

/// Cloneable handle for stopping a running server and observing its load
#[derive(Debug, Clone, Default)]
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

impl ServerHandle {
    /// Stop accepting new connections; live sessions run to completion
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Sessions currently running
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

impl Server {
    /// Create a new server
    ///
    /// The lock is shared by every session this server spawns.
    pub fn new(
        config: Config,
        lock: Arc<ReaderWriterLock>,
        gateway: Arc<dyn StorageGateway>,
    ) -> Self {
        let ctx = SessionContext::new(lock, gateway, config.recv_buffer_size);
        Self {
            config,
            ctx,
            listener: None,
            handle: ServerHandle::default(),
            next_conn_id: 0,
        }
    }

    /// Bind the listener (idempotent); returns the bound address
    pub fn bind(&mut self) -> Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        self.config.validate()?;
        let listener = create_tcp_listener(&self.config.listen_addr, self.config.backlog)?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Address the listener is bound to, if bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Signal the accept loop to stop
    pub fn shutdown(&self) {
        self.handle.shutdown();
    }

    /// Start the server (blocking until shutdown is signalled)
    ///
    /// The listener is closed when this returns.
    pub fn run(&mut self) -> Result<()> {
        let addr = self.bind()?;
        let listener = self
            .listener
            .take()
            .ok_or_else(|| RwLogError::Network("listener not bound".to_string()))?;

        tracing::info!(
            "Listening on {} (max {} clients, {} byte buffer)",
            addr,
            self.config.max_clients,
            self.config.recv_buffer_size
        );

        while !self.handle.is_shutdown() {
            match listener.accept() {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        drop(listener);
        tracing::info!(
            "Listener on {} closed ({} sessions still running)",
            addr,
            self.handle.active_connections()
        );
        Ok(())
    }

    /// Hand one accepted connection to its own session thread
    fn dispatch(&mut self, stream: TcpStream, peer: SocketAddr) {
        let Some(slot) = ConnectionSlot::claim(&self.handle.active, self.config.max_clients) else {
            tracing::warn!(
                "Refusing {}: {} clients connected (max {})",
                peer,
                self.handle.active_connections(),
                self.config.max_clients
            );
            return;
        };

        if let Err(e) = self.prepare_stream(&stream) {
            tracing::warn!("Dropping {}: failed to configure socket: {}", peer, e);
            return;
        }

        self.next_conn_id += 1;
        let ctx = self.ctx.clone();
        let peer_name = peer.to_string();

        let spawned = thread::Builder::new()
            .name(format!("rwlog-conn-{}", self.next_conn_id))
            .spawn(move || {
                let _slot = slot;
                match handle_connection(stream, &ctx, &peer_name) {
                    Ok(role) => tracing::trace!("Session {} ({:?}) finished", peer_name, role),
                    Err(e) => tracing::warn!("Session {} ended with error: {}", peer_name, e),
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn session for {}: {}", peer, e);
        }
    }

    fn prepare_stream(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nonblocking(false)?;
        // Disable Nagle's algorithm; every frame is a small request or reply
        stream.set_nodelay(true)?;

        if self.config.idle_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(self.config.idle_timeout_ms)))?;
        }
        if self.config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(self.config.write_timeout_ms)))?;
        }
        Ok(())
    }
}

/// One unit of the client cap, returned when the session thread ends
struct ConnectionSlot {
    active: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    fn claim(active: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < max).then_some(current + 1)
            })
            .ok()
            .map(|_| Self {
                active: Arc::clone(active),
            })
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

fn create_tcp_listener(listen_addr: &str, backlog: i32) -> Result<TcpListener> {
    let addr = listen_addr
        .to_socket_addrs()
        .map_err(|e| RwLogError::Config(format!("Invalid listen address {}: {}", listen_addr, e)))?
        .next()
        .ok_or_else(|| {
            RwLogError::Config(format!("Listen address {} resolved to nothing", listen_addr))
        })?;

    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    let listener: TcpListener = socket.into();
    listener.set_nonblocking(true)?;
    Ok(listener)
}
