//! Server and relay error types.

use murmur_core::{ConnectionId, PayloadError};
use thiserror::Error;

use crate::websocket::connection::DeliveryError;

/// Why the relay did not accept a join or an inbound frame.
///
/// None of these are fatal to the server.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The frame is not a valid chat payload.
    #[error(transparent)]
    Payload(#[from] PayloadError),
    /// The sending connection is not admitted (already evicted or not yet joined).
    #[error("connection {0} is not active")]
    Inactive(ConnectionId),
    /// The history frame could not be queued for a joining connection.
    #[error("failed to queue history for {id}: {reason}")]
    Join {
        /// The joining connection.
        id: ConnectionId,
        /// Queue failure.
        reason: DeliveryError,
    },
    /// An outbound envelope failed to serialize.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

impl RelayError {
    /// Short stable label for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Payload(e) => e.reason(),
            Self::Inactive(_) => "inactive",
            Self::Join { .. } => "join_failed",
            Self::Encode(_) => "encode_failed",
        }
    }
}

/// Errors from starting the HTTP listener.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listen address failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was requested.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Other socket-level I/O failure.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
