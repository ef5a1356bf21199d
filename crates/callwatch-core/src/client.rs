//! Realtime channel client.
//!
//! A [`RealtimeClient`] owns at most one session. Each session is a tokio
//! task that dials the channel, decodes inbound frames, dispatches them to
//! the [`EventRegistry`], and on an unexpected close retries according to
//! the [`ReconnectPolicy`]. `disconnect()` stops the task wherever it is,
//! including in the middle of a backoff sleep.

use crate::reconnect::ReconnectPolicy;
use crate::registry::{EventRegistry, Handler};
use crate::state::ChannelState;
use callwatch_protocol::{codec::MAX_FRAME_SIZE, ChannelTarget, ClientMessage, EventCodec, ProtocolError};
use callwatch_transport::{Connection, Connector};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Time allowed for a graceful close handshake on disconnect.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The channel URL could not be built.
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] ProtocolError),

    /// The operation needs an open channel.
    #[error("Channel is not open")]
    NotOpen,

    /// The session task is gone.
    #[error("Session ended")]
    SessionEnded,
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `ws://` or `wss://` origin of the backend.
    pub base_url: String,
    /// Reconnect behaviour after an unexpected close.
    pub reconnect: ReconnectPolicy,
    /// Inbound frames above this size are dropped.
    pub max_frame_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "ws://localhost:8000".to_string(),
            reconnect: ReconnectPolicy::default(),
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

enum Command {
    Send(ClientMessage),
}

/// Handle to the running session task.
struct Session {
    target: ChannelTarget,
    shutdown: Option<oneshot::Sender<()>>,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

/// Client for one realtime channel.
///
/// Construct one per view and drop it (after `disconnect()`) when the view
/// goes away; dropping also aborts a still-running session.
pub struct RealtimeClient {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    registry: Arc<EventRegistry>,
    state: Arc<watch::Sender<ChannelState>>,
    session: Option<Session>,
}

impl RealtimeClient {
    /// Create a client that dials through `connector`.
    #[must_use]
    pub fn new(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        Self {
            config,
            connector,
            registry: Arc::new(EventRegistry::new()),
            state: Arc::new(state),
            session: None,
        }
    }

    /// Create a client backed by the WebSocket transport.
    #[must_use]
    pub fn with_websocket(
        config: ClientConfig,
        transport: callwatch_transport::WebSocketConfig,
    ) -> Self {
        let connector = callwatch_transport::WebSocketConnector::new(transport);
        Self::new(config, Arc::new(connector))
    }

    /// Open a session for `target`.
    ///
    /// An existing session is closed first; registrations are kept.
    /// Connection failures are not reported here: they feed the reconnect
    /// policy and show up in [`state`](Self::state).
    ///
    /// # Errors
    ///
    /// Returns an error if the channel URL cannot be built.
    pub async fn connect(&mut self, target: ChannelTarget, token: &str) -> Result<(), ClientError> {
        let url = target.url(&self.config.base_url, token)?;

        if self.session.is_some() {
            debug!(channel = %target, "Replacing existing session");
            self.close_session().await;
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let task = SessionTask {
            url,
            target: target.clone(),
            connector: Arc::clone(&self.connector),
            registry: Arc::clone(&self.registry),
            state: Arc::clone(&self.state),
            policy: self.config.reconnect,
            codec: EventCodec::new(self.config.max_frame_size),
        };

        self.state.send_replace(ChannelState::Connecting);
        let handle = tokio::spawn(task.run(shutdown_rx, commands_rx));

        self.session = Some(Session {
            target,
            shutdown: Some(shutdown_tx),
            commands: commands_tx,
            task: handle,
        });
        Ok(())
    }

    /// Open a session for a single call.
    ///
    /// # Errors
    ///
    /// Returns an error if the call id is not a valid path segment.
    pub async fn connect_to_call(&mut self, call_id: &str, token: &str) -> Result<(), ClientError> {
        self.connect(ChannelTarget::transcription(call_id), token).await
    }

    /// Close the session, if any, and remove every registration.
    ///
    /// A pending reconnect is cancelled. Safe to call at any time.
    pub async fn disconnect(&mut self) {
        self.close_session().await;
        self.registry.clear();
    }

    /// Register `handler` for messages whose `type` equals `event`.
    pub fn on(&self, event: impl Into<String>, handler: Handler) {
        self.registry.on(event, handler);
    }

    /// Remove the first registration of `handler` for `event`.
    pub fn off(&self, event: &str, handler: &Handler) -> bool {
        self.registry.off(event, handler)
    }

    /// Send a `ping` message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotOpen`] unless the channel is open.
    pub fn send_ping(&self) -> Result<(), ClientError> {
        self.send(ClientMessage::Ping)
    }

    fn send(&self, message: ClientMessage) -> Result<(), ClientError> {
        if !self.state().is_open() {
            return Err(ClientError::NotOpen);
        }
        let session = self.session.as_ref().ok_or(ClientError::NotOpen)?;
        session
            .commands
            .send(Command::Send(message))
            .map_err(|_| ClientError::SessionEnded)
    }

    /// Current liveness state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    /// Target of the current session.
    #[must_use]
    pub fn target(&self) -> Option<&ChannelTarget> {
        self.session.as_ref().map(|s| &s.target)
    }

    /// The subscription registry.
    #[must_use]
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Some(shutdown) = session.shutdown.take() {
                let _ = shutdown.send(());
            }
            if let Err(e) = (&mut session.task).await {
                if e.is_panic() {
                    warn!(channel = %session.target, "Session task panicked");
                }
            }
            debug!(channel = %session.target, "Session closed");
        }
        self.state.send_replace(ChannelState::Disconnected);
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.task.abort();
        }
    }
}

enum PumpExit {
    Shutdown,
    Closed,
}

/// State owned by a running session.
struct SessionTask {
    url: String,
    target: ChannelTarget,
    connector: Arc<dyn Connector>,
    registry: Arc<EventRegistry>,
    state: Arc<watch::Sender<ChannelState>>,
    policy: ReconnectPolicy,
    codec: EventCodec,
}

impl SessionTask {
    async fn run(
        self,
        mut shutdown: oneshot::Receiver<()>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let mut attempts: u32 = 0;

        loop {
            self.set_state(ChannelState::Connecting);

            let connected = tokio::select! {
                biased;
                _ = &mut shutdown => return,
                result = self.connector.connect(&self.url) => result,
            };

            match connected {
                Ok(mut conn) => {
                    attempts = 0;
                    self.set_state(ChannelState::Open);
                    info!(
                        channel = %self.target,
                        connection = %conn.id(),
                        transport = self.connector.name(),
                        "Channel open"
                    );

                    let exit = self
                        .pump(conn.as_mut(), &mut shutdown, &mut commands)
                        .await;

                    if let PumpExit::Shutdown = exit {
                        match tokio::time::timeout(CLOSE_TIMEOUT, conn.close()).await {
                            Ok(Ok(())) => debug!(connection = %conn.id(), "Closed by client"),
                            Ok(Err(e)) => debug!(connection = %conn.id(), error = %e, "Close failed"),
                            Err(_) => debug!(connection = %conn.id(), "Close timed out"),
                        }
                        return;
                    }
                }
                Err(e) => {
                    warn!(channel = %self.target, error = %e, "Connect failed");
                }
            }

            self.set_state(ChannelState::Closed);
            // Messages queued for the lost socket are not replayed.
            while commands.try_recv().is_ok() {}

            attempts += 1;
            let Some(delay) = self.policy.delay_for(attempts) else {
                warn!(
                    channel = %self.target,
                    max_attempts = self.policy.max_attempts,
                    "Reconnect attempts exhausted"
                );
                self.set_state(ChannelState::Exhausted);
                return;
            };

            info!(
                channel = %self.target,
                attempt = attempts,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Scheduling reconnect"
            );

            tokio::select! {
                biased;
                _ = &mut shutdown => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn pump(
        &self,
        conn: &mut dyn Connection,
        shutdown: &mut oneshot::Receiver<()>,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> PumpExit {
        loop {
            tokio::select! {
                biased;

                _ = &mut *shutdown => return PumpExit::Shutdown,

                Some(command) = commands.recv() => match command {
                    Command::Send(message) => {
                        if let Err(e) = conn.send(&message).await {
                            warn!(connection = %conn.id(), error = %e, "Send failed");
                        }
                    }
                },

                frame = conn.recv() => match frame {
                    Ok(Some(text)) => self.deliver(&text),
                    Ok(None) => {
                        info!(channel = %self.target, connection = %conn.id(), "Channel closed");
                        return PumpExit::Closed;
                    }
                    Err(e) => {
                        warn!(channel = %self.target, connection = %conn.id(), error = %e, "Channel failed");
                        return PumpExit::Closed;
                    }
                },
            }
        }
    }

    fn deliver(&self, text: &str) {
        match self.codec.decode(text) {
            Ok(event) => {
                let handlers = self.registry.dispatch(&event);
                trace!(event = %event.event_type(), handlers, "Dispatched");
            }
            Err(e) => {
                warn!(channel = %self.target, error = %e, "Dropping malformed message");
            }
        }
    }

    fn set_state(&self, state: ChannelState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(channel = %self.target, from = %previous, to = %state, "State changed");
        }
    }
}
