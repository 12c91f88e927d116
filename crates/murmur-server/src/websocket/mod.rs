//! WebSocket connection state, registry, heartbeat, and the per-socket loop.

pub mod connection;
pub mod heartbeat;
pub mod registry;
pub mod socket;
