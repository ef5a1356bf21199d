//! Metrics collection and export for callwatch.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use callwatch_core::ChannelState;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const EVENTS_TOTAL: &str = "callwatch_events_total";
    pub const STATE_TRANSITIONS_TOTAL: &str = "callwatch_state_transitions_total";
    pub const CHANNEL_OPEN: &str = "callwatch_channel_open";
    pub const REFETCHES_TOTAL: &str = "callwatch_refetches_total";
    pub const ERRORS_TOTAL: &str = "callwatch_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::EVENTS_TOTAL,
        "Realtime events handled, by type"
    );
    metrics::describe_counter!(
        names::STATE_TRANSITIONS_TOTAL,
        "Channel state transitions, by target state"
    );
    metrics::describe_gauge!(names::CHANNEL_OPEN, "1 while the channel is open");
    metrics::describe_counter!(names::REFETCHES_TOTAL, "Snapshot refetches");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Errors, by type");

    info!("Metrics initialized");
}

/// Start the Prometheus exporter.
///
/// # Errors
///
/// Returns an error if the listener cannot be installed.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a handled event.
pub fn record_event(event_type: &str) {
    counter!(names::EVENTS_TOTAL, "type" => event_type.to_string()).increment(1);
}

/// Record a channel state change.
pub fn record_state(state: ChannelState) {
    counter!(names::STATE_TRANSITIONS_TOTAL, "state" => state.as_str()).increment(1);
    gauge!(names::CHANNEL_OPEN).set(if state.is_open() { 1.0 } else { 0.0 });
}

/// Record a snapshot refetch.
pub fn record_refetch() {
    counter!(names::REFETCHES_TOTAL).increment(1);
}

/// Record an error.
pub fn record_error(error_type: &str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        // No recorder installed: calls are no-ops.
        record_event("transcription_progress");
        record_state(ChannelState::Open);
        record_refetch();
        record_error("snapshot");
    }
}
