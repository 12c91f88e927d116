//! Graceful shutdown coordination via `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::relay::Relay;

/// Default wait for the serve task before aborting it.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the server-wide shutdown token.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the relay and wait for the serve task.
    ///
    /// Cancels the token (socket loops send `Close` and exit), evicts every
    /// remaining connection, then waits up to `timeout` for `server`. On
    /// timeout the task is aborted and `false` is returned.
    pub async fn graceful_shutdown(
        &self,
        relay: &Relay,
        mut server: JoinHandle<()>,
        timeout: Option<Duration>,
    ) -> bool {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);

        self.shutdown();
        let closed = relay.close_all();
        info!(
            closed,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "waiting for server to stop"
        );

        if tokio::time::timeout(timeout, &mut server).await.is_ok() {
            info!("server stopped");
            true
        } else {
            warn!("shutdown timed out after {timeout:?}, aborting server task");
            server.abort();
            false
        }
    }
}
