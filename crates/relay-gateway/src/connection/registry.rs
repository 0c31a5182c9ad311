//! Connection registry
//!
//! Maps live connections to their session and role once authenticated and
//! enforces per-session role capacity on admission.

use super::Connection;
use crate::protocol::Role;
use crate::session::{AdmitError, Client, SessionStore};
use dashmap::DashMap;
use std::sync::Arc;

/// Per-role capacity limits for a session
#[derive(Debug, Clone, Copy)]
pub struct CapacityLimits {
    pub max_producers: usize,
    pub max_consumers: usize,
}

impl CapacityLimits {
    fn for_role(&self, role: Role) -> usize {
        match role {
            Role::Producer => self.max_producers,
            Role::Consumer => self.max_consumers,
        }
    }
}

/// Registry of all live connections
///
/// Uses `DashMap` for concurrent access from connection tasks and the health
/// sweep.
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<Connection>>,
    store: Arc<SessionStore>,
    limits: CapacityLimits,
}

impl ConnectionRegistry {
    /// Create a new registry over the given session store
    #[must_use]
    pub fn new(store: Arc<SessionStore>, max_producers: usize, max_consumers: usize) -> Self {
        Self {
            connections: DashMap::new(),
            store,
            limits: CapacityLimits {
                max_producers,
                max_consumers,
            },
        }
    }

    /// Track a freshly accepted connection (not yet joined)
    pub fn track(&self, connection: Arc<Connection>) {
        tracing::debug!(connection_id = %connection.id(), "Connection tracked");
        self.connections
            .insert(connection.id().to_string(), connection);
    }

    /// Admit a tracked connection into a session under a role
    ///
    /// Capacity is enforced atomically against the session's client list; a
    /// violating join is rejected, never queued.
    pub fn admit(
        &self,
        connection: &Arc<Connection>,
        session_id: &str,
        role: Role,
    ) -> Result<(), AdmitError> {
        let client = Client::new(Arc::clone(connection), role);
        self.store
            .admit_client(session_id, client, self.limits.for_role(role))?;

        connection.mark_joined(session_id, role);

        tracing::info!(
            connection_id = %connection.id(),
            session_id = %session_id,
            role = %role,
            "Connection admitted"
        );

        Ok(())
    }

    /// Remove a connection, detaching it from its session
    ///
    /// Idempotent; double removal is a no-op.
    pub fn remove(&self, connection_id: &str) {
        if let Some((_, connection)) = self.connections.remove(connection_id) {
            if let Some(session_id) = connection.session_id() {
                self.store.remove_client(&session_id, connection_id);
            }
            connection.set_state(super::ConnectionState::Disconnected);
            tracing::debug!(connection_id = %connection_id, "Connection removed");
        }
    }

    /// Get a connection by id
    pub fn get(&self, connection_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(connection_id).map(|r| Arc::clone(&r))
    }

    /// Snapshot all tracked connections
    pub fn all(&self) -> Vec<Arc<Connection>> {
        self.connections.iter().map(|r| Arc::clone(&r)).collect()
    }

    /// Number of tracked connections
    pub fn count(&self) -> usize {
        self.connections.len()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.len())
            .field("limits", &self.limits)
            .finish()
    }
}
