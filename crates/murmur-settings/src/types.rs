//! Settings schema.
//!
//! Every field has a compiled default, so any subset of keys may appear in
//! the settings file. Keys are camelCase on disk.

use murmur_core::LogFormat;
use murmur_core::constants::{DEFAULT_HISTORY_CAPACITY, DEFAULT_HOST, DEFAULT_PORT};
use serde::{Deserialize, Serialize};

/// Lower bound for the heartbeat interval.
const MIN_HEARTBEAT_INTERVAL_MS: u64 = 100;

/// Lower bound for the inbound frame size limit.
const MIN_MESSAGE_SIZE: usize = 1024;

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MurmurSettings {
    /// Network and connection handling.
    pub server: ServerSettings,
    /// Message history retention.
    pub history: HistorySettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Server network and connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port. Zero picks an ephemeral port.
    pub port: u16,
    /// Per-connection outbound queue bound, in frames.
    pub send_queue_capacity: usize,
    /// WebSocket ping interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// A connection silent for this long is closed.
    pub heartbeat_timeout_ms: u64,
    /// Maximum inbound frame size in bytes.
    pub max_message_size: usize,
    /// How long graceful shutdown waits for the server task.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            send_queue_capacity: 256,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            max_message_size: 65_536,
            shutdown_timeout_ms: 10_000,
        }
    }
}

/// Message history settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistorySettings {
    /// Number of messages retained and replayed to new clients.
    pub capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl MurmurSettings {
    /// Clamp out-of-range values in place.
    ///
    /// Returns one human-readable note per corrected value; each is also
    /// logged at `warn`.
    pub fn validate(&mut self) -> Vec<String> {
        let mut notes = Vec::new();
        let server = &mut self.server;

        if server.host.trim().is_empty() {
            notes.push(format!("server.host is empty, using {DEFAULT_HOST}"));
            server.host = DEFAULT_HOST.to_string();
        }
        if server.send_queue_capacity == 0 {
            notes.push("server.sendQueueCapacity must be at least 1, using 1".to_string());
            server.send_queue_capacity = 1;
        }
        if server.heartbeat_interval_ms < MIN_HEARTBEAT_INTERVAL_MS {
            notes.push(format!(
                "server.heartbeatIntervalMs {} below minimum, using {MIN_HEARTBEAT_INTERVAL_MS}",
                server.heartbeat_interval_ms
            ));
            server.heartbeat_interval_ms = MIN_HEARTBEAT_INTERVAL_MS;
        }
        if server.heartbeat_timeout_ms < server.heartbeat_interval_ms {
            notes.push(format!(
                "server.heartbeatTimeoutMs {} shorter than interval, using {}",
                server.heartbeat_timeout_ms, server.heartbeat_interval_ms
            ));
            server.heartbeat_timeout_ms = server.heartbeat_interval_ms;
        }
        if server.max_message_size < MIN_MESSAGE_SIZE {
            notes.push(format!(
                "server.maxMessageSize {} below minimum, using {MIN_MESSAGE_SIZE}",
                server.max_message_size
            ));
            server.max_message_size = MIN_MESSAGE_SIZE;
        }
        if self.logging.level.trim().is_empty() {
            notes.push("logging.level is empty, using info".to_string());
            self.logging.level = "info".to_string();
        }

        for note in &notes {
            tracing::warn!(correction = %note, "settings value adjusted");
        }
        notes
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_serialize_camel_case() {
        insta::assert_json_snapshot!(MurmurSettings::default(), @r#"
        {
          "server": {
            "host": "127.0.0.1",
            "port": 8765,
            "sendQueueCapacity": 256,
            "heartbeatIntervalMs": 30000,
            "heartbeatTimeoutMs": 90000,
            "maxMessageSize": 65536,
            "shutdownTimeoutMs": 10000
          },
          "history": {
            "capacity": 100
          },
          "logging": {
            "level": "info",
            "format": "compact"
          }
        }
        "#);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: MurmurSettings =
            serde_json::from_str(r#"{"history":{"capacity":5},"logging":{"format":"json"}}"#).unwrap();
        assert_eq!(settings.history.capacity, 5);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.server, ServerSettings::default());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let settings: MurmurSettings = serde_json::from_str(r#"{"theme":"dark"}"#).unwrap();
        assert_eq!(settings, MurmurSettings::default());
    }

    #[test]
    fn validate_defaults_is_clean() {
        let mut settings = MurmurSettings::default();
        assert!(settings.validate().is_empty());
        assert_eq!(settings, MurmurSettings::default());
    }

    #[test]
    fn validate_clamps_zero_queue() {
        let mut settings = MurmurSettings::default();
        settings.server.send_queue_capacity = 0;
        let notes = settings.validate();
        assert_eq!(notes.len(), 1);
        assert_eq!(settings.server.send_queue_capacity, 1);
    }

    #[test]
    fn validate_raises_timeout_to_interval() {
        let mut settings = MurmurSettings::default();
        settings.server.heartbeat_interval_ms = 5_000;
        settings.server.heartbeat_timeout_ms = 1_000;
        let _ = settings.validate();
        assert_eq!(settings.server.heartbeat_timeout_ms, 5_000);
    }

    #[test]
    fn validate_clamps_tiny_interval_before_timeout() {
        let mut settings = MurmurSettings::default();
        settings.server.heartbeat_interval_ms = 0;
        settings.server.heartbeat_timeout_ms = 0;
        let notes = settings.validate();
        assert_eq!(notes.len(), 2);
        assert_eq!(settings.server.heartbeat_interval_ms, MIN_HEARTBEAT_INTERVAL_MS);
        assert_eq!(settings.server.heartbeat_timeout_ms, MIN_HEARTBEAT_INTERVAL_MS);
    }

    #[test]
    fn validate_restores_empty_strings() {
        let mut settings = MurmurSettings::default();
        settings.server.host = "  ".to_string();
        settings.logging.level = String::new();
        let _ = settings.validate();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn validate_keeps_zero_history_and_port() {
        let mut settings = MurmurSettings::default();
        settings.history.capacity = 0;
        settings.server.port = 0;
        assert!(settings.validate().is_empty());
        assert_eq!(settings.history.capacity, 0);
        assert_eq!(settings.server.port, 0);
    }

    #[test]
    fn validate_clamps_small_frame_limit() {
        let mut settings = MurmurSettings::default();
        settings.server.max_message_size = 10;
        let _ = settings.validate();
        assert_eq!(settings.server.max_message_size, MIN_MESSAGE_SIZE);
    }
}
