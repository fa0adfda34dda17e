//! Connection - owns one client link to the IRC server.
//!
//! ```text
//!            ┌──────────────┐   receive queue   ┌──────────────┐
//!  socket ──▶│  read loop   │──────────────────▶│  receive()   │
//!  (read)    └──────────────┘   (bounded)       └──────────────┘
//!
//!            ┌──────────────┐    send queue     ┌──────────────┐
//!  socket ◀──│  write loop  │◀──────────────────│   send()     │
//!  (write)   └──────────────┘    (bounded)      └──────────────┘
//! ```
//!
//! Each loop is its own task and owns its half of the socket. A single
//! cancellation token stops both; the write loop drains what was queued
//! before the token fired. A write failure ends only the write side: the
//! read loop keeps filling the receive queue until the peer goes away.

mod handshake;
mod reader;
mod state;
mod writer;

use std::time::Duration;

use slirc_proto::{ConnectionState, IrcCodec, Message, RegistrationConfig};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, instrument, warn};

use crate::config::Config;
use crate::error::ConnectionError;
use state::StateCell;

/// TCP keepalive probe timing.
const KEEPALIVE_TIME: Duration = Duration::from_secs(10);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Deadlines and queue sizing for a connection.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub connect_timeout: Duration,
    /// Covers the whole registration exchange.
    pub handshake_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Capacity of each of the two queues.
    pub queue_capacity: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(300),
            write_timeout: Duration::from_secs(60),
            queue_capacity: 1024,
        }
    }
}

impl From<&Config> for ConnectionOptions {
    fn from(config: &Config) -> Self {
        Self {
            connect_timeout: config.timeouts.connect(),
            handshake_timeout: config.timeouts.handshake(),
            read_timeout: config.timeouts.read(),
            write_timeout: config.timeouts.write(),
            queue_capacity: config.queues.capacity,
        }
    }
}

/// Cloneable sending side of a [`Connection`].
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    outbound: mpsc::Sender<Message>,
    /// Child of the connection's shutdown token; the write loop also
    /// cancels it when the socket stops accepting writes.
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Queue a message for the write loop.
    ///
    /// Waits while the send queue is full. Fails with
    /// [`ConnectionError::Closed`] once the connection is shutting down or
    /// the write side has failed.
    pub async fn send(&self, msg: Message) -> Result<(), ConnectionError> {
        if self.closed.is_cancelled() {
            return Err(ConnectionError::Closed);
        }
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(ConnectionError::Closed),
            sent = self.outbound.send(msg) => sent.map_err(|_| ConnectionError::Closed),
        }
    }

    /// True once shutdown has begun or writing has failed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.outbound.is_closed()
    }

    /// A handle with no connection behind it; queued messages land in the
    /// returned receiver.
    #[cfg(test)]
    pub(crate) fn detached(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (outbound, rx) = mpsc::channel(capacity);
        let handle = Self {
            outbound,
            closed: CancellationToken::new(),
        };
        (handle, rx)
    }
}

/// A registered connection to the IRC server.
pub struct Connection {
    addr: String,
    handle: ConnectionHandle,
    inbound: Mutex<mpsc::Receiver<Message>>,
    state: StateCell,
    shutdown: CancellationToken,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl Connection {
    /// Dial `addr`, start both loops and complete registration.
    ///
    /// On registration failure the connection is closed before returning.
    #[instrument(skip(registration, options), fields(nick = %registration.nickname))]
    pub async fn open(
        addr: &str,
        registration: RegistrationConfig,
        options: ConnectionOptions,
    ) -> Result<Self, ConnectionError> {
        let stream = match tokio::time::timeout(options.connect_timeout, TcpStream::connect(addr))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(ConnectionError::Connect {
                    addr: addr.to_string(),
                    source,
                });
            }
            Err(_) => {
                return Err(ConnectionError::Connect {
                    addr: addr.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("no answer within {:?}", options.connect_timeout),
                    ),
                });
            }
        };
        info!("Connected to server");

        if let Err(e) = Self::enable_keepalive(&stream) {
            warn!(error = %e, "Failed to enable TCP keepalive");
        }

        let conn = Self::start(stream, addr.to_string(), &options);
        match handshake::register(&conn, registration, options.handshake_timeout).await {
            Ok(()) => Ok(conn),
            Err(e) => {
                warn!(error = %e, "Registration failed");
                conn.state.fail(&e);
                conn.close().await;
                Err(e.into())
            }
        }
    }

    fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
        use socket2::{SockRef, TcpKeepalive};

        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(KEEPALIVE_TIME)
            .with_interval(KEEPALIVE_INTERVAL);
        sock.set_tcp_keepalive(&keepalive)
    }

    /// Split the socket and spawn the read and write loops.
    fn start(stream: TcpStream, addr: String, options: &ConnectionOptions) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (inbound_tx, inbound_rx) = mpsc::channel(options.queue_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(options.queue_capacity);
        let shutdown = CancellationToken::new();
        let write_closed = shutdown.child_token();
        let state = StateCell::new();

        let reader = tokio::spawn(
            reader::run(
                FramedRead::new(read_half, IrcCodec::new()),
                inbound_tx,
                shutdown.clone(),
                state.clone(),
                options.read_timeout,
            )
            .instrument(info_span!("irc_read", addr = %addr)),
        );
        let writer = tokio::spawn(
            writer::run(
                FramedWrite::new(write_half, IrcCodec::new()),
                outbound_rx,
                write_closed.clone(),
                state.clone(),
                options.write_timeout,
            )
            .instrument(info_span!("irc_write", addr = %addr)),
        );

        Self {
            addr,
            handle: ConnectionHandle {
                outbound: outbound_tx,
                closed: write_closed,
            },
            inbound: Mutex::new(inbound_rx),
            state,
            shutdown,
            tasks: Mutex::new(Some((reader, writer))),
        }
    }

    /// Next message from the server.
    ///
    /// `None` once the read loop has ended and the queue is drained, or as
    /// soon as [`close`](Self::close) has been called. A failed write side
    /// does not end receiving.
    pub async fn receive(&self) -> Option<Message> {
        if self.shutdown.is_cancelled() {
            return None;
        }
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            msg = inbound.recv() => msg,
        }
    }

    /// Queue a message for the server. See [`ConnectionHandle::send`].
    pub async fn send(&self, msg: Message) -> Result<(), ConnectionError> {
        self.handle.send(msg).await
    }

    /// A cloneable sender for other tasks.
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Stop both loops and release the socket.
    ///
    /// Messages queued before the call are still written, each under the
    /// write deadline. Idempotent; concurrent callers all return after the
    /// loops have finished.
    pub async fn close(&self) {
        self.shutdown.cancel();

        let mut tasks = self.tasks.lock().await;
        if let Some((reader, writer)) = tasks.take() {
            if let Err(e) = writer.await {
                warn!(error = %e, "Write loop ended abnormally");
            }
            if let Err(e) = reader.await {
                warn!(error = %e, "Read loop ended abnormally");
            }
            if self.state.close() {
                info!(addr = %self.addr, "Connection closed");
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
