//! Per-connection `WebSocket` loop.
//!
//! Each upgraded socket is split into a writer task, which drains the
//! connection's outbound queue, sends pings and sends the final `Close`, and
//! a reader loop in the calling task, which feeds text frames to the relay
//! and watches heartbeat, eviction and server shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, close_code};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use murmur_core::ConnectionId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::ClientConnection;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::config::ServerConfig;
use crate::errors::RelayError;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::relay::Relay;

/// How long to wait for the writer to flush and close after the reader exits.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a connection loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// The client sent `Close` or the stream ended.
    ClientClosed,
    /// A transport read error.
    TransportError,
    /// No inbound traffic within the heartbeat timeout.
    HeartbeatTimeout,
    /// The relay evicted the connection.
    Evicted,
    /// The server is shutting down.
    Shutdown,
    /// The history replay could not be queued.
    JoinFailed,
}

impl ExitReason {
    /// Short label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::TransportError => "transport_error",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Evicted => "evicted",
            Self::Shutdown => "shutdown",
            Self::JoinFailed => "join_failed",
        }
    }
}

/// Drive one upgraded socket until it closes.
pub async fn run_connection(
    socket: WebSocket,
    relay: Arc<Relay>,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) -> ExitReason {
    let (tx, rx) = mpsc::channel(config.send_queue_capacity.max(1));
    let conn = Arc::new(ClientConnection::new(ConnectionId::new(), tx));
    info!(conn_id = %conn.id, "client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let reason = match relay.join(Arc::clone(&conn)) {
        Ok(_) => {
            let (sink, stream) = socket.split();
            let mut writer = tokio::spawn(write_loop(
                sink,
                rx,
                Arc::clone(&conn),
                config.heartbeat_interval,
                shutdown.clone(),
            ));
            let reason = read_loop(stream, &relay, &conn, &config, &shutdown).await;

            let _ = relay.leave(&conn.id);
            let _ = conn.close();
            if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
                debug!(conn_id = %conn.id, "writer did not finish, aborting");
                writer.abort();
            }
            reason
        }
        Err(e) => {
            warn!(conn_id = %conn.id, error = %e, "failed to join client");
            ExitReason::JoinFailed
        }
    };

    let lifetime = conn.age();
    info!(
        conn_id = %conn.id,
        reason = reason.as_str(),
        lifetime_secs = lifetime.as_secs(),
        dropped_frames = conn.drop_count(),
        remaining = relay.connection_count(),
        "client disconnected"
    );
    counter!(WS_DISCONNECTIONS_TOTAL, "reason" => reason.as_str()).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(lifetime.as_secs_f64());
    reason
}

async fn read_loop(
    mut stream: futures::stream::SplitStream<WebSocket>,
    relay: &Relay,
    conn: &Arc<ClientConnection>,
    config: &ServerConfig,
    shutdown: &CancellationToken,
) -> ExitReason {
    let evicted = conn.close_signal();
    let heartbeat = run_heartbeat(
        Arc::clone(conn),
        config.heartbeat_interval,
        config.heartbeat_timeout,
        evicted.clone(),
    );
    tokio::pin!(heartbeat);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => return ExitReason::Shutdown,
            () = evicted.cancelled() => return ExitReason::Evicted,
            result = &mut heartbeat => {
                return match result {
                    HeartbeatResult::TimedOut => {
                        info!(conn_id = %conn.id, "heartbeat timed out");
                        ExitReason::HeartbeatTimeout
                    }
                    HeartbeatResult::Cancelled => ExitReason::Evicted,
                };
            }
            frame = stream.next() => {
                let Some(frame) = frame else {
                    return ExitReason::ClientClosed;
                };
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!(conn_id = %conn.id, error = %e, "websocket read error");
                        return ExitReason::TransportError;
                    }
                };
                conn.mark_alive();
                match frame {
                    WsMessage::Text(text) => match relay.receive(&conn.id, text.as_str()) {
                        Ok(_) | Err(RelayError::Payload(_) | RelayError::Encode(_)) => {}
                        Err(RelayError::Inactive(_) | RelayError::Join { .. }) => {
                            return ExitReason::Evicted;
                        }
                    },
                    WsMessage::Binary(data) => {
                        debug!(conn_id = %conn.id, bytes = data.len(), "ignoring binary frame");
                    }
                    WsMessage::Ping(_) | WsMessage::Pong(_) => {}
                    WsMessage::Close(_) => return ExitReason::ClientClosed,
                }
            }
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut rx: mpsc::Receiver<Arc<String>>,
    conn: Arc<ClientConnection>,
    ping_every: Duration,
    shutdown: CancellationToken,
) {
    let close = conn.close_signal();
    let mut ping = tokio::time::interval(ping_every);
    let _ = ping.tick().await;

    loop {
        tokio::select! {
            biased;
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if sink.send(text_frame(&frame)).await.is_err() {
                    debug!(conn_id = %conn.id, "websocket write failed");
                    let _ = conn.close();
                    return;
                }
            }
            () = close.cancelled() => {
                // flush whatever was queued before the close
                while let Ok(frame) = rx.try_recv() {
                    if sink.send(text_frame(&frame)).await.is_err() {
                        return;
                    }
                }
                let code = if shutdown.is_cancelled() {
                    close_code::AWAY
                } else {
                    close_code::NORMAL
                };
                let _ = sink
                    .send(WsMessage::Close(Some(CloseFrame {
                        code,
                        reason: "".into(),
                    })))
                    .await;
                return;
            }
            _ = ping.tick() => {
                if sink.send(WsMessage::Ping(Bytes::new())).await.is_err() {
                    let _ = conn.close();
                    return;
                }
                debug!(conn_id = %conn.id, "sent ping");
            }
        }
    }
    let _ = sink.close().await;
}

fn text_frame(frame: &Arc<String>) -> WsMessage {
    WsMessage::Text(frame.as_str().into())
}
