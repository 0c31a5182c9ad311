//! Application message forwarding
//!
//! Routes `event` and `data` envelopes from a joined connection to the rest
//! of its session via the broadcaster. Payloads stay opaque.

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, Envelope};
use crate::server::RelayState;
use std::sync::Arc;

/// Handles event and data envelopes
pub struct ForwardHandler;

impl ForwardHandler {
    /// Route an `event` envelope: consumers only, sender excluded
    pub fn handle_event(
        state: &RelayState,
        connection: &Arc<Connection>,
        envelope: Envelope,
    ) -> HandlerResult<Option<CloseCode>> {
        let session_id = connection.session_id().ok_or(HandlerError::NotJoined)?;

        let sent = state
            .broadcaster()
            .route_event(&session_id, envelope, Some(connection.id()));

        tracing::debug!(
            connection_id = %connection.id(),
            session_id = %session_id,
            sent = sent,
            "Event routed to consumers"
        );

        Ok(None)
    }

    /// Fan a `data` envelope out to the whole session, sender excluded
    pub fn handle_data(
        state: &RelayState,
        connection: &Arc<Connection>,
        envelope: Envelope,
    ) -> HandlerResult<Option<CloseCode>> {
        let session_id = connection.session_id().ok_or(HandlerError::NotJoined)?;

        let sent = state.broadcaster().broadcast(
            &session_id,
            &envelope.timestamped(),
            Some(connection.id()),
            None,
        );

        tracing::debug!(
            connection_id = %connection.id(),
            session_id = %session_id,
            sent = sent,
            "Data fanned out"
        );

        Ok(None)
    }
}
