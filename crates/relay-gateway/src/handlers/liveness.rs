//! Liveness handlers
//!
//! Any inbound ping or pong counts as a liveness signal and clears the
//! pending-probe flag for the connection.

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, Envelope};
use std::sync::Arc;

/// Handles ping and pong envelopes
pub struct LivenessHandler;

impl LivenessHandler {
    /// Handle a ping from the client: record liveness and answer with a pong
    pub async fn handle_ping(connection: &Arc<Connection>) -> HandlerResult<Option<CloseCode>> {
        connection.record_liveness();

        connection
            .send(Envelope::pong())
            .await
            .map_err(|e| HandlerError::Internal(format!("Failed to send pong: {e}")))?;

        tracing::trace!(connection_id = %connection.id(), "Ping answered");
        Ok(None)
    }

    /// Handle a pong from the client
    pub fn handle_pong(connection: &Arc<Connection>) -> HandlerResult<Option<CloseCode>> {
        connection.record_liveness();
        tracing::trace!(connection_id = %connection.id(), "Pong received");
        Ok(None)
    }
}
