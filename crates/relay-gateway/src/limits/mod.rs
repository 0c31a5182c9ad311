//! Resource-exhaustion defenses
//!
//! Origin/join-deadline guarding and per-connection rate limiting.

mod handshake;
mod rate;

pub use handshake::HandshakeGuard;
pub use rate::RateLimiter;
