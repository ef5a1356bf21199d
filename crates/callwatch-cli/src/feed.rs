//! User-wide calls feed.
//!
//! Prints one line per `call_created`, `call_updated` and `call_deleted`
//! event until interrupted or the channel gives up.

use anyhow::{Context, Result};
use callwatch_core::{handler, ChannelState, RealtimeClient};
use callwatch_protocol::events::names;
use callwatch_protocol::{ChannelTarget, ServerEvent};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::metrics;

/// One-line description of a feed event.
#[must_use]
pub fn describe(event: &ServerEvent) -> Option<String> {
    match event {
        ServerEvent::CallCreated(created) => {
            let id = created.id().unwrap_or("?");
            Some(format!("+ {} created", id))
        }
        ServerEvent::CallUpdated(updated) => Some(match &updated.status {
            Some(status) => format!("~ {} {}", updated.call_id, status),
            None => format!("~ {} updated", updated.call_id),
        }),
        ServerEvent::CallDeleted(deleted) => Some(format!("- {} deleted", deleted.call_id)),
        _ => None,
    }
}

/// Follow the calls feed, passing each line to `out`.
///
/// Returns when `shutdown` resolves or reconnects are exhausted. The
/// client is disconnected either way.
///
/// # Errors
///
/// Returns an error if the channel URL cannot be built.
pub async fn watch_calls<F, O>(
    client: &mut RealtimeClient,
    token: &str,
    shutdown: F,
    mut out: O,
) -> Result<()>
where
    F: Future<Output = ()>,
    O: FnMut(String),
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    for name in [names::CALL_CREATED, names::CALL_UPDATED, names::CALL_DELETED] {
        let tx = tx.clone();
        client.on(
            name,
            handler(move |event| {
                metrics::record_event(event.event_type());
                if let Some(line) = describe(event) {
                    let _ = tx.send(line);
                }
            }),
        );
    }
    drop(tx);

    client
        .connect(ChannelTarget::Calls, token)
        .await
        .context("Failed to open calls feed")?;
    info!("Following calls feed");

    let mut state = client.watch_state();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            Some(line) = rx.recv() => out(line),
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                metrics::record_state(current);
                if current == ChannelState::Exhausted {
                    warn!("Calls feed gave up reconnecting");
                    out("! live updates stopped".to_string());
                    break;
                }
            }
        }
    }

    client.disconnect().await;
    Ok(())
}
