//! Server configuration.

use std::time::Duration;

use murmur_core::constants::{DEFAULT_HISTORY_CAPACITY, DEFAULT_HOST};
use murmur_settings::MurmurSettings;

/// Runtime configuration for [`MurmurServer`](crate::MurmurServer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Messages retained for replay.
    pub history_capacity: usize,
    /// Per-connection outbound queue bound, in frames.
    pub send_queue_capacity: usize,
    /// Ping interval.
    pub heartbeat_interval: Duration,
    /// Silence longer than this closes the connection.
    pub heartbeat_timeout: Duration,
    /// Max inbound `WebSocket` message size in bytes.
    pub max_message_size: usize,
    /// How long graceful shutdown waits for the server task.
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: 0,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            send_queue_capacity: 256,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(90),
            max_message_size: 64 * 1024,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&MurmurSettings> for ServerConfig {
    fn from(settings: &MurmurSettings) -> Self {
        let server = &settings.server;
        Self {
            host: server.host.clone(),
            port: server.port,
            history_capacity: settings.history.capacity,
            send_queue_capacity: server.send_queue_capacity.max(1),
            heartbeat_interval: Duration::from_millis(server.heartbeat_interval_ms.max(1)),
            heartbeat_timeout: Duration::from_millis(server.heartbeat_timeout_ms),
            max_message_size: server.max_message_size,
            shutdown_timeout: Duration::from_millis(server.shutdown_timeout_ms),
        }
    }
}
