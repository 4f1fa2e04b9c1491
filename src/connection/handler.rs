//! Connection Handler Module
//!
//! This module handles individual client connections to SparkKV.
//! Each client gets its own handler task that runs in a loop,
//! reading commands and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Idle ──> ReadingFrame       │
//!    │              │               │
//!    │              ▼               │
//!    │          Dispatching         │
//!    │              │               │
//!    │              ▼               │
//!    │           Writing ──> Idle   │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / framing error / I/O error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Buffer Management
//!
//! We use a BytesMut buffer to accumulate incoming data. TCP is a stream
//! protocol: a read may carry half a request, or several pipelined ones.
//! Every complete request already in the buffer is answered, in order,
//! before the socket is read again.

use crate::commands::CommandHandler;
use crate::protocol::parser::MAX_BULK_SIZE;
use crate::protocol::{Frame, FrameParser, ParseError, RespValue};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, trace, warn};

/// Maximum size for the read buffer: one maximal argument plus headroom for headers
const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the stream so the same loop runs on a `TcpStream` and on
/// in-memory I/O in tests.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Bytes received but not yet decoded
    buffer: BytesMut,

    command_handler: CommandHandler,

    parser: FrameParser,

    /// Largest number of undecoded bytes held before the client is dropped
    max_buffer: usize,

    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The client stream
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: FrameParser::new(),
            max_buffer: MAX_BUFFER_SIZE,
            stats,
        }
    }

    /// Overrides the read buffer limit.
    pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    /// Runs the connection until the client leaves or the connection fails.
    ///
    /// A clean disconnect returns `Ok(())`.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        debug!(client = %self.addr, "Client connected");

        let result = match self.main_loop().await {
            Err(ConnectionError::ClientDisconnected) => Ok(()),
            other => other,
        };

        match &result {
            Ok(()) => debug!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection closed with error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(frame) = self.try_parse_frame().await? {
                trace!(client = %self.addr, command = %frame, "Dispatching");

                let response = self.command_handler.execute(frame);
                self.stats.command_processed();

                self.send_response(&response).await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Decodes the next request from the buffer, if a complete one is there.
    ///
    /// On a framing error the client is told why before the connection is dropped.
    async fn try_parse_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer) {
            Ok(Some((frame, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed command"
                );
                Ok(Some(frame))
            }
            Ok(None) => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete command, need more data"
                );
                Ok(None)
            }
            Err(e) => {
                let reply = RespValue::error(format!("Protocol error: {}", e));
                // Best effort: the connection is closing either way
                let _ = self.send_response(&reply).await;
                Err(ConnectionError::ParseError(e))
            }
        }
    }

    /// Reads more data from the stream into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= self.max_buffer {
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            return if self.buffer.is_empty() {
                Err(ConnectionError::ClientDisconnected)
            } else {
                Err(ConnectionError::UnexpectedEof)
            };
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Writes one reply and flushes it before the next request is handled.
    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Sent response");
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed framing
    #[error("Protocol error: {0}")]
    ParseError(#[from] ParseError),

    /// Client closed the connection between requests
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Stream ended in the middle of a request
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Handles a client connection to completion.
///
/// Errors are logged by the handler and go no further: one connection's
/// failure never touches another connection or the keyspace.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    let _ = handler.run().await;
}
