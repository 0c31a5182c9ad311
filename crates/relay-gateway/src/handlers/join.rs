//! Join handler
//!
//! Authenticates a connection into a session under a role. Validation order:
//! session existence/expiry, token, role, capacity. Any failure is fatal for
//! the connection; the relay never retries on the client's behalf.

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, Envelope, JoinPayload, Role};
use crate::server::RelayState;
use crate::session::{AdmitError, SessionValidation};
use std::sync::Arc;

/// Handles join requests
pub struct JoinHandler;

impl JoinHandler {
    /// Handle a join request
    pub async fn handle(
        state: &RelayState,
        connection: &Arc<Connection>,
        payload: JoinPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        if connection.is_joined() {
            tracing::warn!(
                connection_id = %connection.id(),
                "Join received on an already-joined connection"
            );
            return Err(HandlerError::AlreadyJoined);
        }

        match state.sessions().validate(&payload.session_id) {
            SessionValidation::Valid => {}
            SessionValidation::NotFound => {
                return Err(HandlerError::AuthenticationFailed(
                    "unknown session".to_string(),
                ));
            }
            SessionValidation::Expired => {
                return Err(HandlerError::AuthenticationFailed(
                    "session expired".to_string(),
                ));
            }
        }

        if !state.sessions().check_token(&payload.session_id, &payload.token) {
            tracing::debug!(
                connection_id = %connection.id(),
                session_id = %payload.session_id,
                "Token mismatch on join"
            );
            return Err(HandlerError::AuthenticationFailed("invalid token".to_string()));
        }

        let role = Role::parse(&payload.role).ok_or_else(|| {
            HandlerError::AuthenticationFailed(format!("unknown role: {}", payload.role))
        })?;

        state
            .registry()
            .admit(connection, &payload.session_id, role)
            .map_err(|e| match e {
                AdmitError::RoleAtCapacity => HandlerError::AuthenticationFailed(format!(
                    "session at capacity for role {role}"
                )),
                AdmitError::SessionNotFound => {
                    HandlerError::AuthenticationFailed("unknown session".to_string())
                }
            })?;

        connection
            .send(Envelope::join_ack(&payload.session_id, connection.id()))
            .await
            .map_err(|e| HandlerError::Internal(format!("Failed to send joinAck: {e}")))?;

        tracing::info!(
            connection_id = %connection.id(),
            session_id = %payload.session_id,
            role = %role,
            "Client joined"
        );

        Ok(None)
    }
}
