//! `MurmurServer`: Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::relay::Relay;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::socket;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The chat relay.
    pub relay: Arc<Relay>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: ShutdownCoordinator,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, if a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The chat relay server.
pub struct MurmurServer {
    config: Arc<ServerConfig>,
    relay: Arc<Relay>,
    shutdown: ShutdownCoordinator,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl MurmurServer {
    /// Create a new server with an empty history.
    pub fn new(config: ServerConfig) -> Self {
        let relay = Arc::new(Relay::new(config.history_capacity));
        Self {
            config: Arc::new(config),
            relay,
            shutdown: ShutdownCoordinator::new(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from this recorder handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            relay: Arc::clone(&self.relay),
            config: Arc::clone(&self.config),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/", get(ws_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and spawn the serve task.
    ///
    /// Returns the bound address (useful with port `0`) and the task handle.
    /// The task exits once the shutdown token is cancelled and open
    /// connections have drained.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
        });

        info!(
            addr = %local_addr,
            history_capacity = self.relay.history_capacity(),
            "murmur server listening"
        );
        Ok((local_addr, handle))
    }

    /// Cancel the shutdown token, close every client, and wait for `server`.
    ///
    /// Returns `false` if the configured shutdown timeout elapsed first.
    pub async fn shutdown_gracefully(&self, server: JoinHandle<()>) -> bool {
        self.shutdown
            .graceful_shutdown(&self.relay, server, Some(self.config.shutdown_timeout))
            .await
    }

    /// Get the relay.
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET / and GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let AppState {
        relay,
        config,
        shutdown,
        ..
    } = state;
    ws.max_message_size(config.max_message_size)
        .on_upgrade(move |ws| async move {
            let _ = socket::run_connection(ws, relay, config, shutdown.token()).await;
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, &state.relay))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(handle),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn make_server() -> MurmurServer {
        MurmurServer::new(ServerConfig::default())
    }

    async fn get_response(app: Router, uri: &str) -> Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(req).await.unwrap()
    }

    #[test]
    fn server_with_default_config() {
        let server = make_server();
        assert_eq!(server.config().host, "127.0.0.1");
        assert_eq!(server.config().port, 0);
        assert_eq!(server.relay().history_capacity(), 100);
        assert!(!server.shutdown().is_shutting_down());
    }

    #[test]
    fn history_capacity_comes_from_config() {
        let server = MurmurServer::new(ServerConfig {
            history_capacity: 7,
            ..ServerConfig::default()
        });
        assert_eq!(server.relay().history_capacity(), 7);
    }

    #[tokio::test]
    async fn health_endpoint_reports_relay() {
        let resp = get_response(make_server().router(), "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["history_len"], 0);
        assert_eq!(parsed["history_capacity"], 100);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_404() {
        let resp = get_response(make_server().router(), "/metrics").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_with_recorder_is_text() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let server = make_server().with_metrics(handle);
        let resp = get_response(server.router(), "/metrics").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn plain_get_on_ws_routes_is_rejected() {
        for uri in ["/", "/ws"] {
            let resp = get_response(make_server().router(), uri).await;
            assert!(
                resp.status().is_client_error(),
                "{uri} without upgrade headers returned {}",
                resp.status()
            );
        }
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let resp = get_response(make_server().router(), "/nonexistent").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.shutdown_gracefully(handle).await);
        assert!(server.shutdown().is_shutting_down());
    }

    #[tokio::test]
    async fn listen_reports_bind_failure() {
        let first = make_server();
        let (addr, handle) = first.listen().await.unwrap();

        let second = MurmurServer::new(ServerConfig {
            port: addr.port(),
            ..ServerConfig::default()
        });
        let err = second.listen().await.unwrap_err();
        assert_matches!(err, ServerError::Bind { .. });

        assert!(first.shutdown_gracefully(handle).await);
    }
}
