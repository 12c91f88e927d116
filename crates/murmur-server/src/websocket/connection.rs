//! Server-side state for one connected client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use murmur_core::ConnectionId;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a connection as seen by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted; history not yet queued.
    Joining,
    /// Admitted to the registry; receives broadcasts and may send.
    Active,
    /// Evicted or disconnected. Terminal.
    Closed,
}

/// Why a frame could not be queued for a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The outbound queue is at capacity (slow consumer).
    #[error("send queue full")]
    QueueFull,
    /// The writer task has gone away.
    #[error("send queue closed")]
    Closed,
}

impl DeliveryError {
    /// Short label for logs and metrics.
    pub fn reason(self) -> &'static str {
        match self {
            Self::QueueFull => "queue_full",
            Self::Closed => "closed",
        }
    }
}

/// A connected `WebSocket` client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Bounded queue drained by the socket writer task.
    tx: mpsc::Sender<Arc<String>>,
    state: Mutex<ConnectionState>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether any frame has arrived since the last heartbeat check.
    is_alive: AtomicBool,
    /// Frames that could not be queued.
    dropped_frames: AtomicU64,
    /// Fired when the connection must close.
    close: CancellationToken,
}

impl ClientConnection {
    /// Create a connection in the `Joining` state.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            state: Mutex::new(ConnectionState::Joining),
            connected_at: Instant::now(),
            is_alive: AtomicBool::new(true),
            dropped_frames: AtomicU64::new(0),
            close: CancellationToken::new(),
        }
    }

    /// Queue a pre-serialized frame without waiting.
    pub fn send(&self, frame: Arc<String>) -> Result<(), DeliveryError> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                Err(match err {
                    TrySendError::Full(_) => DeliveryError::QueueFull,
                    TrySendError::Closed(_) => DeliveryError::Closed,
                })
            }
        }
    }

    /// Frames that could not be queued.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Whether the connection may send and receive chat traffic.
    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    /// `Joining` → `Active`. Returns `false` if the connection is not joining.
    pub fn mark_active(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ConnectionState::Joining {
            *state = ConnectionState::Active;
            true
        } else {
            false
        }
    }

    /// Move to `Closed` and fire the close signal.
    ///
    /// Returns `true` on the first call only.
    pub fn close(&self) -> bool {
        let first = {
            let mut state = self.state.lock();
            let first = *state != ConnectionState::Closed;
            *state = ConnectionState::Closed;
            first
        };
        self.close.cancel();
        first
    }

    /// Token fired by [`close`](Self::close).
    pub fn close_signal(&self) -> CancellationToken {
        self.close.clone()
    }

    /// Record inbound activity.
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
    }

    /// Check and reset the alive flag.
    ///
    /// Returns `true` if the client was heard from since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("dropped_frames", &self.drop_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = ClientConnection::new(ConnectionId::from("conn_1"), tx);
        (conn, rx)
    }

    #[test]
    fn starts_joining_and_alive() {
        let (conn, _rx) = make_connection(4);
        assert_eq!(conn.id.as_str(), "conn_1");
        assert_eq!(conn.state(), ConnectionState::Joining);
        assert!(!conn.is_active());
        assert!(conn.check_alive());
    }

    #[tokio::test]
    async fn send_queues_frame() {
        let (conn, mut rx) = make_connection(4);
        conn.send(Arc::new("hello".into())).unwrap();
        assert_eq!(&*rx.recv().await.unwrap(), "hello");
        assert_eq!(conn.drop_count(), 0);
    }

    #[test]
    fn send_to_full_queue_reports_full() {
        let (conn, _rx) = make_connection(1);
        conn.send(Arc::new("one".into())).unwrap();
        assert_eq!(conn.send(Arc::new("two".into())), Err(DeliveryError::QueueFull));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn send_to_closed_queue_reports_closed() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert_eq!(conn.send(Arc::new("x".into())), Err(DeliveryError::Closed));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn lifecycle_transitions() {
        let (conn, _rx) = make_connection(4);
        assert!(conn.mark_active());
        assert!(conn.is_active());
        assert!(!conn.mark_active());
        assert!(conn.close());
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(!conn.close());
        assert!(!conn.mark_active());
    }

    #[test]
    fn close_fires_signal() {
        let (conn, _rx) = make_connection(4);
        let signal = conn.close_signal();
        assert!(!signal.is_cancelled());
        let _ = conn.close();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn check_alive_resets_flag() {
        let (conn, _rx) = make_connection(4);
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[test]
    fn delivery_reasons_are_snake_case() {
        assert_eq!(DeliveryError::QueueFull.reason(), "queue_full");
        assert_eq!(DeliveryError::Closed.reason(), "closed");
    }

    #[test]
    fn debug_omits_channel() {
        let (conn, _rx) = make_connection(4);
        let text = format!("{conn:?}");
        assert!(text.contains("conn_1"));
        assert!(text.contains("Joining"));
    }
}
