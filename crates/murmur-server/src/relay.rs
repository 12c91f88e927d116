//! Broadcast relay: history replay on join, fan-out on receive.
//!
//! The relay is the only writer of the message history. The history, the
//! connection registry and the last assigned timestamp live together behind
//! one lock, which is never held across an `.await`. Fan-out under the lock
//! is a non-blocking `try_send` of one shared frame into each connection's
//! bounded queue; network writes happen in the per-connection writer task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use murmur_core::{ChatPayload, ConnectionId, HistoryBuffer, Message, ServerEvent, message};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::errors::RelayError;
use crate::metrics::{
    CHAT_BROADCAST_RECIPIENTS, CHAT_HISTORY_EVICTIONS_TOTAL, CHAT_MESSAGES_ACCEPTED_TOTAL,
    CHAT_PAYLOADS_REJECTED_TOTAL, WS_FANOUT_EVICTIONS_TOTAL,
};
use crate::websocket::connection::{ClientConnection, DeliveryError};
use crate::websocket::registry::{ConnectionRegistry, FanoutReport};

/// An accepted message and how its broadcast went.
#[derive(Debug)]
pub struct Receipt {
    /// The stored message.
    pub message: Message,
    /// Fan-out result.
    pub fanout: FanoutReport,
}

struct RelayState {
    history: HistoryBuffer,
    registry: ConnectionRegistry,
    last_timestamp: Option<DateTime<Utc>>,
}

impl RelayState {
    /// Next timestamp, never earlier than the previous one.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = message::now();
        let ts = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

/// Shared chat state.
pub struct Relay {
    state: Mutex<RelayState>,
}

impl Relay {
    /// Create a relay retaining up to `history_capacity` messages.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            state: Mutex::new(RelayState {
                history: HistoryBuffer::new(history_capacity),
                registry: ConnectionRegistry::new(),
                last_timestamp: None,
            }),
        }
    }

    /// Admit a new connection after queueing its history replay.
    ///
    /// The `history` envelope (possibly empty) is always the first frame on
    /// the connection's queue, and every later broadcast follows it. Returns
    /// the number of replayed messages.
    pub fn join(&self, connection: Arc<ClientConnection>) -> Result<usize, RelayError> {
        let mut state = self.state.lock();

        let messages = state.history.snapshot();
        let replayed = messages.len();
        let frame = ServerEvent::History { messages }
            .to_json()
            .map_err(RelayError::Encode)?;

        if let Err(reason) = connection.send(Arc::new(frame)) {
            let _ = connection.close();
            return Err(RelayError::Join {
                id: connection.id.clone(),
                reason,
            });
        }
        if !connection.mark_active() {
            return Err(RelayError::Inactive(connection.id.clone()));
        }

        let conn_id = connection.id.clone();
        if let Some(previous) = state.registry.admit(connection) {
            let _ = previous.close();
        }
        let connections = state.registry.len();
        drop(state);

        info!(conn_id = %conn_id, replayed, connections, "client joined");
        Ok(replayed)
    }

    /// Validate, store, and broadcast one inbound text frame.
    ///
    /// Rejected frames are logged and leave the history untouched; no frame
    /// is sent back to the client.
    pub fn receive(&self, conn_id: &ConnectionId, raw: &str) -> Result<Receipt, RelayError> {
        debug!(conn_id = %conn_id, bytes = raw.len(), "frame received");

        let payload = match ChatPayload::parse(raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(conn_id = %conn_id, reason = e.reason(), error = %e, "rejected payload");
                counter!(CHAT_PAYLOADS_REJECTED_TOTAL, "reason" => e.reason()).increment(1);
                return Err(e.into());
            }
        };

        let mut state = self.state.lock();
        if !state.registry.get(conn_id).is_some_and(|c| c.is_active()) {
            drop(state);
            debug!(conn_id = %conn_id, "frame from inactive connection, discarding");
            return Err(RelayError::Inactive(conn_id.clone()));
        }

        let timestamp = state.stamp();
        let message = Message::new(payload.text, payload.sender, timestamp);
        let frame = ServerEvent::Message {
            message: message.clone(),
        }
        .to_json()
        .map_err(RelayError::Encode)?;

        if state.history.push(message.clone()).is_some() {
            counter!(CHAT_HISTORY_EVICTIONS_TOTAL).increment(1);
            debug!(capacity = state.history.capacity(), "trimmed oldest history entry");
        }
        let history_len = state.history.len();

        let frame = Arc::new(frame);
        let fanout = state.registry.for_each(|c| c.send(Arc::clone(&frame)));
        drop(state);

        info!(
            conn_id = %conn_id,
            sender = message.sender(),
            recipients = fanout.delivered,
            history_len,
            "message broadcast"
        );
        counter!(CHAT_MESSAGES_ACCEPTED_TOTAL).increment(1);
        #[allow(clippy::cast_precision_loss)]
        let recipients = fanout.delivered as f64;
        histogram!(CHAT_BROADCAST_RECIPIENTS).record(recipients);
        for eviction in &fanout.evicted {
            match eviction.reason {
                DeliveryError::QueueFull => {
                    warn!(conn_id = %eviction.id, "send queue full, evicting slow client");
                }
                DeliveryError::Closed => {
                    debug!(conn_id = %eviction.id, "send queue closed, evicting");
                }
            }
            counter!(WS_FANOUT_EVICTIONS_TOTAL, "reason" => eviction.reason.reason()).increment(1);
        }

        Ok(Receipt { message, fanout })
    }

    /// Remove a connection from the fan-out set. Idempotent.
    ///
    /// Returns `true` if the connection was admitted.
    pub fn leave(&self, conn_id: &ConnectionId) -> bool {
        let mut state = self.state.lock();
        let removed = state.registry.evict(conn_id).is_some();
        let connections = state.registry.len();
        drop(state);

        if removed {
            info!(conn_id = %conn_id, connections, "client left");
        }
        removed
    }

    /// Evict every connection and fire each close signal.
    ///
    /// Returns the number of connections closed.
    pub fn close_all(&self) -> usize {
        let mut state = self.state.lock();
        let ids = state.registry.ids();
        for id in &ids {
            let _ = state.registry.evict(id);
        }
        drop(state);

        if !ids.is_empty() {
            info!(count = ids.len(), "closed all client connections");
        }
        ids.len()
    }

    /// Current history, oldest-first.
    pub fn history(&self) -> Vec<Message> {
        self.state.lock().history.snapshot()
    }

    /// Number of retained messages.
    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Maximum number of retained messages.
    pub fn history_capacity(&self) -> usize {
        self.state.lock().history.capacity()
    }

    /// Number of admitted connections.
    pub fn connection_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Whether `conn_id` is admitted.
    pub fn is_connected(&self, conn_id: &ConnectionId) -> bool {
        self.state.lock().registry.contains(conn_id)
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(murmur_core::constants::DEFAULT_HISTORY_CAPACITY)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
