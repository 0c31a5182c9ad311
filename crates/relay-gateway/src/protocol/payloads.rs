//! Typed payload definitions
//!
//! Payload structures carried inside envelopes that the relay itself
//! constructs or consumes. Application payloads stay opaque.

use serde::{Deserialize, Serialize};

/// Payload of a `join` envelope
///
/// Sent by the client to request admission into a session.
///
/// The role stays a raw string here: join validation checks it explicitly
/// after session and token, so an unknown role yields an authentication
/// failure rather than a decode error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    /// Session to join
    pub session_id: String,

    /// Session secret issued alongside the id
    pub token: String,

    /// Role to join under ("producer" or "consumer")
    pub role: String,
}

/// Payload of a `joinAck` envelope
///
/// Sent by the relay on successful admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinAckPayload {
    /// Always "connected"
    pub status: String,

    /// Connection id assigned by the relay
    pub connection_id: String,
}

/// Payload of an `error` envelope sent before closing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Close code that will follow
    pub code: u16,

    /// Human-readable reason
    pub message: String,
}
