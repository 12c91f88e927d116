//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Fails if a global recorder
/// is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from a recorder handle.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric names, shared by the relay and the socket loop.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter, labels: reason).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connection lifetime in seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Connections evicted during fan-out (counter, labels: reason).
pub const WS_FANOUT_EVICTIONS_TOTAL: &str = "ws_fanout_evictions_total";
/// Chat messages accepted total (counter).
pub const CHAT_MESSAGES_ACCEPTED_TOTAL: &str = "chat_messages_accepted_total";
/// Inbound payloads rejected total (counter, labels: reason).
pub const CHAT_PAYLOADS_REJECTED_TOTAL: &str = "chat_payloads_rejected_total";
/// Messages evicted from history by capacity (counter).
pub const CHAT_HISTORY_EVICTIONS_TOTAL: &str = "chat_history_evictions_total";
/// Recipients per broadcast (histogram).
pub const CHAT_BROADCAST_RECIPIENTS: &str = "chat_broadcast_recipients";
