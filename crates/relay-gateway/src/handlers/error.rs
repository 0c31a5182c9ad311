//! Handler error types

use crate::protocol::CloseCode;
use thiserror::Error;

/// Handler error type
///
/// Every variant is fatal for the connection it occurred on and maps to a
/// specific close code; none of them affect other connections or the relay
/// process.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Malformed or missing payload
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Message received before a successful join
    #[error("Not joined")]
    NotJoined,

    /// Join received on an already-joined connection
    #[error("Already joined")]
    AlreadyJoined,

    /// Bad token, unknown session, unknown role, or capacity
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Convert to the close code sent to the client
    pub fn to_close_code(&self) -> CloseCode {
        match self {
            Self::InvalidPayload(_) | Self::NotJoined | Self::AlreadyJoined => {
                CloseCode::ProtocolViolation
            }
            Self::AuthenticationFailed(_) => CloseCode::AuthenticationFailed,
            Self::Internal(_) => CloseCode::UnknownError,
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_mapping() {
        assert_eq!(
            HandlerError::InvalidPayload("x".into()).to_close_code(),
            CloseCode::ProtocolViolation
        );
        assert_eq!(HandlerError::NotJoined.to_close_code(), CloseCode::ProtocolViolation);
        assert_eq!(
            HandlerError::AuthenticationFailed("bad token".into()).to_close_code(),
            CloseCode::AuthenticationFailed
        );
        assert_eq!(
            HandlerError::Internal("x".into()).to_close_code(),
            CloseCode::UnknownError
        );
    }
}
