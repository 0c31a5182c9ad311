//! Envelope message format
//!
//! Defines the structure of all messages exchanged over the WebSocket
//! connection. The relay inspects only the envelope header; `payload` is
//! opaque JSON.

use super::{CloseCode, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current protocol version, sent on every relay-constructed envelope
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Envelope message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnvelopeType {
    /// Client requests admission to a session (client only)
    Join,
    /// Relay acknowledges a successful join (server only)
    JoinAck,
    /// Liveness probe
    Ping,
    /// Liveness response
    Pong,
    /// Application event, always routed to consumers
    Event,
    /// Application data, fanned out within the session
    Data,
    /// Error description
    Error,
}

impl EnvelopeType {
    /// Get the wire name of this message type
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::JoinAck => "joinAck",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Event => "event",
            Self::Data => "data",
            Self::Error => "error",
        }
    }

    /// Check if this message type can be sent by a client
    #[must_use]
    pub const fn is_client_type(self) -> bool {
        !matches!(self, Self::JoinAck)
    }

    /// Check if this message type must carry a payload
    #[must_use]
    pub const fn requires_payload(self) -> bool {
        matches!(self, Self::Join | Self::Event | Self::Data | Self::Error)
    }
}

impl std::fmt::Display for EnvelopeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Envelope message format
///
/// All messages sent over the WebSocket connection follow this format.
/// Envelopes are immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Message type
    #[serde(rename = "type")]
    pub kind: EnvelopeType,

    /// Session this envelope belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Role of the original sender
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_role: Option<Role>,

    /// Epoch milliseconds at construction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Protocol version (semver string)
    pub protocol_version: String,

    /// Opaque application payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Envelope {
    /// Create an envelope of the given type with the relay's version and timestamp
    #[must_use]
    pub fn new(kind: EnvelopeType, session_id: Option<String>, payload: Option<Value>) -> Self {
        Self {
            kind,
            session_id,
            source_role: None,
            timestamp: Some(now_ms()),
            protocol_version: PROTOCOL_VERSION.to_string(),
            payload,
        }
    }

    /// Create a ping envelope
    #[must_use]
    pub fn ping() -> Self {
        Self::new(EnvelopeType::Ping, None, None)
    }

    /// Create a pong envelope
    #[must_use]
    pub fn pong() -> Self {
        Self::new(EnvelopeType::Pong, None, None)
    }

    /// Create a join acknowledgement envelope
    #[must_use]
    pub fn join_ack(session_id: &str, connection_id: &str) -> Self {
        let payload = serde_json::json!({
            "status": "connected",
            "connectionId": connection_id,
        });
        Self::new(EnvelopeType::JoinAck, Some(session_id.to_string()), Some(payload))
    }

    /// Create an error envelope describing a close reason
    #[must_use]
    pub fn error(code: CloseCode, message: &str) -> Self {
        let payload = serde_json::json!({
            "code": code.as_u16(),
            "message": message,
        });
        Self::new(EnvelopeType::Error, None, Some(payload))
    }

    /// Return this envelope with a timestamp stamped by the relay if the
    /// original sender omitted one; otherwise unchanged.
    #[must_use]
    pub fn timestamped(mut self) -> Self {
        if self.timestamp.is_none() {
            self.timestamp = Some(now_ms());
        }
        self
    }

    /// Serialized size of the payload in bytes, 0 when absent
    #[must_use]
    pub fn payload_size(&self) -> usize {
        self.payload
            .as_ref()
            .and_then(|p| serde_json::to_vec(p).ok())
            .map_or(0, |v| v.len())
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Envelope({}", self.kind)?;
        if let Some(session_id) = &self.session_id {
            write!(f, ", session={session_id}")?;
        }
        if let Some(role) = self.source_role {
            write!(f, ", from={role}")?;
        }
        write!(f, ")")
    }
}

/// Current time as epoch milliseconds
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
