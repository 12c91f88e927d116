//! # murmur-core
//!
//! Foundation types for the murmur chat relay.
//!
//! This crate provides the shared vocabulary that the server and any Rust
//! client depend on:
//!
//! - **IDs**: [`ids::ConnectionId`] newtype for registry membership
//! - **Messages**: [`message::Message`], the immutable server-stamped chat record
//! - **Wire protocol**: [`protocol::ChatPayload`] (client → server) and
//!   [`protocol::ServerEvent`] (server → client) envelopes
//! - **History**: [`history::HistoryBuffer`], the capacity-bounded ring of messages
//! - **Client mirror**: [`mirror::ClientMirror`], the newest-first view a UI renders
//! - **Errors**: [`errors::PayloadError`] for rejected inbound payloads
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `murmur-server` and `murmur`.

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod history;
pub mod ids;
pub mod logging;
pub mod message;
pub mod mirror;
pub mod protocol;

pub use errors::PayloadError;
pub use history::HistoryBuffer;
pub use ids::ConnectionId;
pub use logging::LogFormat;
pub use message::Message;
pub use mirror::ClientMirror;
pub use protocol::{ChatPayload, ServerEvent};
