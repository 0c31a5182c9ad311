//! Message handlers
//!
//! Dispatches inbound envelopes from a connection to the appropriate handler
//! based on their type and the connection's protocol state.

mod error;
mod forward;
mod join;
mod liveness;

pub use error::{HandlerError, HandlerResult};
pub use forward::ForwardHandler;
pub use join::JoinHandler;
pub use liveness::LivenessHandler;

use crate::connection::Connection;
use crate::protocol::{CloseCode, Envelope, EnvelopeType};
use crate::server::RelayState;
use std::sync::Arc;

/// Dispatch inbound envelopes to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one inbound envelope
    ///
    /// Returns `Ok(Some(code))` when the connection must be closed with a
    /// code, `Ok(None)` to continue, `Err` for handler failures that map to
    /// close codes via [`HandlerError::to_close_code`].
    pub async fn dispatch(
        state: &RelayState,
        connection: &Arc<Connection>,
        envelope: Envelope,
    ) -> HandlerResult<Option<CloseCode>> {
        if !envelope.kind.is_client_type() {
            tracing::warn!(
                connection_id = %connection.id(),
                kind = %envelope.kind,
                "Received server-only message type from client"
            );
            return Ok(Some(CloseCode::ProtocolViolation));
        }

        // Everything except a join attempt requires a completed join
        if !connection.is_joined() && envelope.kind != EnvelopeType::Join {
            tracing::warn!(
                connection_id = %connection.id(),
                kind = %envelope.kind,
                "Message received before join"
            );
            return Err(HandlerError::NotJoined);
        }

        if envelope.kind.requires_payload() && envelope.payload.is_none() {
            return Err(HandlerError::InvalidPayload(format!(
                "{} requires a payload",
                envelope.kind
            )));
        }

        match envelope.kind {
            EnvelopeType::Join => {
                let payload = envelope
                    .payload
                    .as_ref()
                    .and_then(|d| serde_json::from_value(d.clone()).ok())
                    .ok_or_else(|| {
                        HandlerError::InvalidPayload("Invalid join payload".to_string())
                    })?;

                JoinHandler::handle(state, connection, payload).await
            }
            EnvelopeType::Ping => LivenessHandler::handle_ping(connection).await,
            EnvelopeType::Pong => Ok(LivenessHandler::handle_pong(connection)?),
            EnvelopeType::Event => ForwardHandler::handle_event(state, connection, envelope),
            EnvelopeType::Data => ForwardHandler::handle_data(state, connection, envelope),
            EnvelopeType::Error => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    payload = ?envelope.payload,
                    "Error envelope received from client"
                );
                Ok(None)
            }
            // Filtered out by the is_client_type check above
            EnvelopeType::JoinAck => Ok(Some(CloseCode::ProtocolViolation)),
        }
    }
}
