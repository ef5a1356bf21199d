//! Transport abstraction traits for callwatch.
//!
//! The realtime client only needs to dial a URL and then exchange text
//! frames; these traits keep it independent of the socket implementation.

use async_trait::async_trait;
use callwatch_protocol::{codec, ClientMessage};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a connection, used in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Generate a connection ID from the current time.
    #[must_use]
    pub fn generate() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::{SystemTime, UNIX_EPOCH};

        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("conn_{:x}_{}", timestamp, seq))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Connection attempt timed out.
    #[error("Connection timed out")]
    Timeout,

    /// Failed to establish the connection.
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    Protocol(#[from] callwatch_protocol::ProtocolError),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Something that can open connections to a channel URL.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial `url` and complete the handshake.
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError>;

    /// Get the transport name (e.g., "websocket").
    fn name(&self) -> &'static str;
}

/// An open client connection.
#[async_trait]
pub trait Connection: Send {
    /// Get the connection's unique identifier.
    fn id(&self) -> &ConnectionId;

    /// Receive the next text frame.
    ///
    /// Returns `None` once the connection is closed, by either side.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Send a raw text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Encode and send a client message.
    async fn send(&mut self, message: &ClientMessage) -> Result<(), TransportError> {
        let text = codec::encode(message)?;
        self.send_text(text).await
    }

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}
