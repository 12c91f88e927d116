//! The live set of connections that receive broadcasts.
//!
//! Not internally synchronized: the [`Relay`](crate::Relay) owns the registry
//! behind the same lock as the history buffer so that history append and
//! recipient selection are atomic with respect to join and leave.

use std::collections::HashMap;
use std::sync::Arc;

use murmur_core::ConnectionId;

use super::connection::{ClientConnection, DeliveryError};

/// A connection removed during fan-out, and why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eviction {
    /// The evicted connection.
    pub id: ConnectionId,
    /// The delivery failure that caused it.
    pub reason: DeliveryError,
}

/// Outcome of one [`ConnectionRegistry::for_each`] pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Connections the visitor succeeded on.
    pub delivered: usize,
    /// Connections the visitor failed on; already evicted.
    pub evicted: Vec<Eviction>,
}

impl FanoutReport {
    /// Connections visited in total.
    pub fn attempted(&self) -> usize {
        self.delivered + self.evicted.len()
    }
}

/// Open connections indexed by ID.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Arc<ClientConnection>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the fan-out set.
    ///
    /// Re-admitting an ID replaces the previous entry and returns it.
    pub fn admit(&mut self, connection: Arc<ClientConnection>) -> Option<Arc<ClientConnection>> {
        self.connections.insert(connection.id.clone(), connection)
    }

    /// Remove a connection and fire its close signal.
    ///
    /// Idempotent: returns `None` if the ID is not present.
    pub fn evict(&mut self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        let connection = self.connections.remove(id)?;
        let _ = connection.close();
        Some(connection)
    }

    /// Run `visitor` on every admitted connection.
    ///
    /// A failing visit does not stop the pass; each failed connection is
    /// evicted once the pass completes.
    pub fn for_each<F>(&mut self, mut visitor: F) -> FanoutReport
    where
        F: FnMut(&ClientConnection) -> Result<(), DeliveryError>,
    {
        let mut report = FanoutReport::default();
        for connection in self.connections.values() {
            match visitor(connection) {
                Ok(()) => report.delivered += 1,
                Err(reason) => report.evicted.push(Eviction {
                    id: connection.id.clone(),
                    reason,
                }),
            }
        }
        for eviction in &report.evicted {
            let _ = self.evict(&eviction.id);
        }
        report
    }

    /// Look up a connection.
    pub fn get(&self, id: &ConnectionId) -> Option<&Arc<ClientConnection>> {
        self.connections.get(id)
    }

    /// Whether `id` is admitted.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// IDs of all admitted connections, in no particular order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().cloned().collect()
    }

    /// Number of admitted connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is admitted.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
