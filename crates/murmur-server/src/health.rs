//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

use crate::relay::Relay;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Connections currently admitted by the relay.
    pub connections: usize,
    /// Messages currently retained in history.
    pub history_len: usize,
    /// Maximum retained messages.
    pub history_capacity: usize,
}

/// Build a health response from the relay's live counters.
pub fn health_check(start_time: Instant, relay: &Relay) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections: relay.connection_count(),
        history_len: relay.history_len(),
        history_capacity: relay.history_capacity(),
    }
}
