//! # murmur-server
//!
//! Axum HTTP + `WebSocket` chat relay.
//!
//! - `WebSocket` gateway on `/` and `/ws`: per-connection reader/writer tasks,
//!   heartbeat, bounded outbound queues
//! - [`relay::Relay`]: the single owner of the message history and the
//!   connection registry; replays history on join and fans out each accepted
//!   message to every connection
//! - `/health` and `/metrics` (Prometheus) endpoints
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod relay;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::{RelayError, ServerError};
pub use relay::Relay;
pub use server::MurmurServer;
