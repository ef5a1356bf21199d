//! Call detail controller.
//!
//! Loads a call snapshot, subscribes to the call's realtime channel and
//! keeps a [`CallView`] current until unmounted. Channel handlers run on the
//! client's session task, so they only forward a [`ViewCommand`]; the
//! controller loop applies it and does any async work (refetching).

use anyhow::{Context, Result};
use callwatch_core::{handler, ChannelState, RealtimeClient};
use callwatch_protocol::events::{names, TranscriptionProgress};
use callwatch_protocol::ServerEvent;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::SnapshotSource;
use crate::metrics;
use crate::view::{CallView, Notice, Severity};

enum ViewCommand {
    Progress(TranscriptionProgress),
    Completed,
    Refetch,
    Failed(String),
}

/// Drives the view of a single call.
pub struct CallDetailController<S> {
    call_id: String,
    source: S,
    client: RealtimeClient,
    view: CallView,
    heartbeat: Option<Duration>,
    commands_tx: mpsc::UnboundedSender<ViewCommand>,
    commands_rx: mpsc::UnboundedReceiver<ViewCommand>,
    last_state: ChannelState,
    mounted: bool,
}

impl<S: SnapshotSource> CallDetailController<S> {
    pub fn new(call_id: impl Into<String>, source: S, client: RealtimeClient) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Self {
            call_id: call_id.into(),
            source,
            client,
            view: CallView::new(),
            heartbeat: None,
            commands_tx,
            commands_rx,
            last_state: ChannelState::Disconnected,
            mounted: false,
        }
    }

    /// Ping the server every `interval` while the channel is open.
    #[must_use]
    pub fn with_heartbeat(mut self, interval: Option<Duration>) -> Self {
        self.heartbeat = interval;
        self
    }

    pub fn view(&self) -> &CallView {
        &self.view
    }

    pub fn client(&self) -> &RealtimeClient {
        &self.client
    }

    /// Remove and return pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.view.take_notices()
    }

    /// Load the snapshot and, if a token is available, open the channel.
    ///
    /// Mounting an already mounted controller does nothing; call
    /// [`unmount`](Self::unmount) first to start over.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded; the caller should
    /// leave the view.
    pub async fn mount(&mut self, token: Option<&str>) -> Result<()> {
        if self.mounted {
            debug!(call_id = %self.call_id, "Already mounted");
            return Ok(());
        }

        self.refresh().await?;
        self.mounted = true;

        let Some(token) = token else {
            info!(call_id = %self.call_id, "No access token, live updates disabled");
            return Ok(());
        };

        self.register_handlers();
        self.client
            .connect_to_call(&self.call_id, token)
            .await
            .with_context(|| format!("Failed to open channel for call {}", self.call_id))?;
        Ok(())
    }

    /// Apply channel updates until `shutdown` resolves. `render` is called
    /// after every change to the view.
    ///
    /// # Errors
    ///
    /// Returns an error if a refetch fails.
    pub async fn run<F, R>(&mut self, shutdown: F, mut render: R) -> Result<()>
    where
        F: Future<Output = ()>,
        R: FnMut(&mut CallView),
    {
        tokio::pin!(shutdown);

        let mut state_rx = self.client.watch_state();
        let mut watching = true;
        let initial = *state_rx.borrow_and_update();
        self.observe_state(initial);

        let mut heartbeat = self.heartbeat.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        render(&mut self.view);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    debug!(call_id = %self.call_id, "Shutdown requested");
                    break;
                }

                Some(command) = self.commands_rx.recv() => {
                    self.apply(command).await?;
                    render(&mut self.view);
                }

                changed = state_rx.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                        continue;
                    }
                    let state = *state_rx.borrow_and_update();
                    if self.observe_state(state) {
                        render(&mut self.view);
                    }
                }

                _ = tick(&mut heartbeat) => {
                    if let Err(e) = self.client.send_ping() {
                        debug!(error = %e, "Heartbeat skipped");
                    }
                }
            }
        }

        Ok(())
    }

    /// Close the channel and drop all subscriptions.
    pub async fn unmount(&mut self) {
        self.client.disconnect().await;
        self.mounted = false;
        info!(call_id = %self.call_id, "Unmounted");
    }

    async fn refresh(&mut self) -> Result<()> {
        match self.source.call_detail(&self.call_id).await {
            Ok(call) => {
                self.view.set_call(call);
                Ok(())
            }
            Err(e) => {
                metrics::record_error("snapshot");
                self.view.push_notice(Notice::new(
                    Severity::Error,
                    "Load failed",
                    "Could not load call details",
                ));
                Err(e).with_context(|| format!("Failed to load call {}", self.call_id))
            }
        }
    }

    fn register_handlers(&self) {
        let tx = self.commands_tx.clone();
        self.client.on(
            names::TRANSCRIPTION_PROGRESS,
            handler(move |event| {
                if let ServerEvent::TranscriptionProgress(progress) = event {
                    metrics::record_event(event.event_type());
                    let _ = tx.send(ViewCommand::Progress(progress.clone()));
                }
            }),
        );

        let tx = self.commands_tx.clone();
        self.client.on(
            names::TRANSCRIPTION_COMPLETED,
            handler(move |event| {
                metrics::record_event(event.event_type());
                let _ = tx.send(ViewCommand::Completed);
            }),
        );

        let tx = self.commands_tx.clone();
        self.client.on(
            names::STATUS_UPDATE,
            handler(move |event| {
                metrics::record_event(event.event_type());
                let _ = tx.send(ViewCommand::Refetch);
            }),
        );

        let tx = self.commands_tx.clone();
        self.client.on(
            names::TRANSCRIPTION_ERROR,
            handler(move |event| {
                if let ServerEvent::TranscriptionError(failure) = event {
                    metrics::record_event(event.event_type());
                    let _ = tx.send(ViewCommand::Failed(failure.error.clone()));
                }
            }),
        );
    }

    async fn apply(&mut self, command: ViewCommand) -> Result<()> {
        match command {
            ViewCommand::Progress(progress) => {
                self.view.apply_progress(&progress);
            }
            ViewCommand::Completed => {
                self.view.mark_completed();
                metrics::record_refetch();
                self.refresh().await?;
                self.view.push_notice(Notice::new(
                    Severity::Success,
                    "Transcription ready",
                    "Text recognised successfully",
                ));
            }
            ViewCommand::Refetch => {
                metrics::record_refetch();
                self.refresh().await?;
            }
            ViewCommand::Failed(error) => {
                warn!(call_id = %self.call_id, error = %error, "Transcription failed");
                self.view
                    .push_notice(Notice::new(Severity::Error, "Transcription failed", error));
            }
        }
        Ok(())
    }

    /// Returns `true` if the state differs from the last one seen.
    fn observe_state(&mut self, state: ChannelState) -> bool {
        if state == self.last_state {
            return false;
        }
        self.last_state = state;
        metrics::record_state(state);

        if state == ChannelState::Exhausted {
            warn!(call_id = %self.call_id, "Realtime channel gave up reconnecting");
            self.view.push_notice(Notice::new(
                Severity::Error,
                "Live updates stopped",
                "Lost connection to the server; reload to resume",
            ));
        }
        true
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
