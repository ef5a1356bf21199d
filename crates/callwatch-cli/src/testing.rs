//! In-memory channel server for tests.

use async_trait::async_trait;
use callwatch_core::{ClientConfig, RealtimeClient, ReconnectPolicy};
use callwatch_transport::{Connection, ConnectionId, Connector, TransportError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

struct StubConnection {
    id: ConnectionId,
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Connection for StubConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.inbound.recv().await)
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(text)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inbound.close();
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }
}

/// Server half of an accepted connection.
pub struct ServerEnd {
    tx: mpsc::UnboundedSender<String>,
    pub sent: mpsc::UnboundedReceiver<String>,
}

impl ServerEnd {
    pub fn push(&self, text: &str) {
        let _ = self.tx.send(text.to_string());
    }
}

/// Accepts queued connections in order and refuses the rest.
#[derive(Default)]
pub struct StubConnector {
    queue: Mutex<VecDeque<StubConnection>>,
    urls: Mutex<Vec<String>>,
}

impl StubConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn accept(&self) -> ServerEnd {
        let (tx, inbound) = mpsc::unbounded_channel();
        let (outbound, sent) = mpsc::unbounded_channel();
        self.queue.lock().unwrap().push_back(StubConnection {
            id: ConnectionId::generate(),
            inbound,
            outbound,
        });
        ServerEnd { tx, sent }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        self.urls.lock().unwrap().push(url.to_string());
        match self.queue.lock().unwrap().pop_front() {
            Some(conn) => Ok(Box::new(conn)),
            None => Err(TransportError::ConnectFailed("refused".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// A client dialing through `connector` with a short reconnect policy.
pub fn client(connector: &Arc<StubConnector>) -> RealtimeClient {
    let config = ClientConfig {
        reconnect: ReconnectPolicy::new(2, Duration::from_millis(100)),
        ..ClientConfig::default()
    };
    RealtimeClient::new(config, Arc::clone(connector) as Arc<dyn Connector>)
}
