//! WebSocket transport implementation.
//!
//! This module provides a WebSocket client using tokio-tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{protocol::WebSocketConfig as WsConfig, Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, trace, warn};

use crate::traits::{Connection, ConnectionId, Connector, TransportError};

/// WebSocket client configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Time allowed for TCP connect plus handshake.
    pub connect_timeout: Duration,
    /// Hard cap on a single inbound message, enforced by the socket.
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_message_size: 16 * 1024 * 1024, // 16 MiB
        }
    }
}

/// Dials WebSocket channel URLs.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    config: WebSocketConfig,
}

impl WebSocketConnector {
    /// Create a new connector.
    #[must_use]
    pub fn new(config: WebSocketConfig) -> Self {
        Self { config }
    }

    /// Get the connector configuration.
    #[must_use]
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        let mut ws_config = WsConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);

        let (stream, response) = timeout(
            self.config.connect_timeout,
            connect_async_with_config(url, Some(ws_config), false),
        )
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let conn = WebSocketConnection::new(stream);
        debug!(
            connection = %conn.id(),
            status = %response.status(),
            "WebSocket handshake completed"
        );
        Ok(Box::new(conn))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// A client-side WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    is_open: bool,
}

impl WebSocketConnection {
    fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self {
            id: ConnectionId::generate(),
            stream,
            is_open: true,
        }
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(connection = %self.id, bytes = text.len(), "Text frame");
                    return Ok(Some(text));
                }
                Some(Ok(Message::Binary(data))) => {
                    // Some proxies re-frame text as binary
                    match String::from_utf8(data) {
                        Ok(text) => return Ok(Some(text)),
                        Err(e) => {
                            warn!(connection = %self.id, error = %e, "Dropping non-UTF-8 binary frame");
                        }
                    }
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // tungstenite queues the pong reply itself
                }
                Some(Ok(Message::Close(frame))) => {
                    match frame {
                        Some(f) => debug!(
                            connection = %self.id,
                            code = u16::from(f.code),
                            reason = %f.reason,
                            "Received close frame"
                        ),
                        None => debug!(connection = %self.id, "Received close frame"),
                    }
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(WsError::ConnectionClosed)) | Some(Err(WsError::AlreadyClosed)) => {
                    debug!(connection = %self.id, "Connection closed");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    error!(connection = %self.id, error = %e, "WebSocket error");
                    self.is_open = false;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!(connection = %self.id, "WebSocket stream ended");
                    self.is_open = false;
                    return Ok(None);
                }
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }

        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.is_open {
            return Ok(());
        }
        self.is_open = false;

        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Other(format!("Failed to close: {}", e))),
        }
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}
