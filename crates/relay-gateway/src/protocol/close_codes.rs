//! WebSocket close codes
//!
//! Defines relay-specific close codes sent when terminating a connection.

use serde::{Deserialize, Serialize};

/// Relay WebSocket close codes
///
/// These codes are sent when closing a WebSocket connection to indicate the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// Malformed frame, unknown message type, or message before join
    ProtocolViolation = 4001,
    /// No join attempt within the deadline
    JoinTimeout = 4002,
    /// Bad token, unknown session, unknown role, or session at capacity
    AuthenticationFailed = 4003,
    /// Single message exceeded the size ceiling
    MessageTooLarge = 4004,
    /// Too many messages within one rate window
    RateLimitExceeded = 4005,
    /// The session's fixed lifetime elapsed
    SessionExpired = 4006,
    /// Connection failed liveness probes
    StaleConnection = 4007,
    /// Relay is shutting down
    Shutdown = 4008,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::ProtocolViolation),
            4002 => Some(Self::JoinTimeout),
            4003 => Some(Self::AuthenticationFailed),
            4004 => Some(Self::MessageTooLarge),
            4005 => Some(Self::RateLimitExceeded),
            4006 => Some(Self::SessionExpired),
            4007 => Some(Self::StaleConnection),
            4008 => Some(Self::Shutdown),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::ProtocolViolation => "Protocol violation",
            Self::JoinTimeout => "No join received within the deadline",
            Self::AuthenticationFailed => "Authentication failed",
            Self::MessageTooLarge => "Message too large",
            Self::RateLimitExceeded => "Rate limit exceeded",
            Self::SessionExpired => "Session expired",
            Self::StaleConnection => "Stale connection",
            Self::Shutdown => "Relay shutting down",
        }
    }

    /// Get the name of this close code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UnknownError",
            Self::ProtocolViolation => "ProtocolViolation",
            Self::JoinTimeout => "JoinTimeout",
            Self::AuthenticationFailed => "AuthenticationFailed",
            Self::MessageTooLarge => "MessageTooLarge",
            Self::RateLimitExceeded => "RateLimitExceeded",
            Self::SessionExpired => "SessionExpired",
            Self::StaleConnection => "StaleConnection",
            Self::Shutdown => "Shutdown",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_from_u16() {
        assert_eq!(CloseCode::from_u16(4000), Some(CloseCode::UnknownError));
        assert_eq!(CloseCode::from_u16(4003), Some(CloseCode::AuthenticationFailed));
        assert_eq!(CloseCode::from_u16(4008), Some(CloseCode::Shutdown));
        assert_eq!(CloseCode::from_u16(1000), None);
        assert_eq!(CloseCode::from_u16(4009), None);
    }

    #[test]
    fn test_close_code_as_u16() {
        assert_eq!(CloseCode::ProtocolViolation.as_u16(), 4001);
        assert_eq!(CloseCode::JoinTimeout.as_u16(), 4002);
        assert_eq!(CloseCode::MessageTooLarge.as_u16(), 4004);
        assert_eq!(CloseCode::StaleConnection.as_u16(), 4007);
    }

    #[test]
    fn test_close_code_display() {
        let display = format!("{}", CloseCode::RateLimitExceeded);
        assert!(display.contains("4005"));
        assert!(display.contains("Rate limit"));
    }
}
