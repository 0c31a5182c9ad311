//! Broadcaster
//!
//! Fans an envelope out to the members of a session, skipping the
//! originator. Each delivery goes into the peer's own bounded outbound
//! queue, so one slow peer cannot stall the rest of the fan-out.

use crate::protocol::{Envelope, EnvelopeType, Priority, Role};
use crate::session::SessionStore;
use std::sync::Arc;

/// Fans envelopes out to session members
pub struct Broadcaster {
    store: Arc<SessionStore>,
}

impl Broadcaster {
    /// Create a broadcaster over the given session store
    #[must_use]
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Deliver an envelope to every open, role-matching connection in the
    /// session except the excluded one. Returns the number of peers whose
    /// transport accepted the write.
    ///
    /// Per-peer failures are logged and skipped; they never abort the
    /// remaining fan-out.
    pub fn broadcast(
        &self,
        session_id: &str,
        envelope: &Envelope,
        exclude_connection_id: Option<&str>,
        role_filter: Option<Role>,
    ) -> usize {
        let priority = Priority::of(envelope);
        let mut sent = 0;

        for client in self.store.clients_of(session_id, role_filter) {
            if exclude_connection_id == Some(client.id.as_str()) {
                continue;
            }
            if !client.connection.is_open() {
                continue;
            }

            match client.connection.try_send(envelope.clone()) {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        connection_id = %client.id,
                        error = %e,
                        "Delivery to peer failed, skipping"
                    );
                }
            }
        }

        tracing::trace!(
            session_id = %session_id,
            kind = %envelope.kind,
            priority = %priority,
            sent = sent,
            "Envelope fanned out"
        );

        sent
    }

    /// Route an `event` envelope: always to consumer clients only, regardless
    /// of the sender's role, re-timestamped by the relay if the sender
    /// omitted a timestamp.
    pub fn route_event(
        &self,
        session_id: &str,
        envelope: Envelope,
        exclude_connection_id: Option<&str>,
    ) -> usize {
        debug_assert_eq!(envelope.kind, EnvelopeType::Event);
        self.broadcast(
            session_id,
            &envelope.timestamped(),
            exclude_connection_id,
            Some(Role::Consumer),
        )
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster").finish()
    }
}
