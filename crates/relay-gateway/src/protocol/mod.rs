//! Relay wire protocol
//!
//! Defines the JSON envelope exchanged over the WebSocket connection,
//! message types, close codes, and fan-out priorities.

mod close_codes;
mod envelope;
mod payloads;
mod priority;
mod role;

pub use close_codes::CloseCode;
pub use envelope::{Envelope, EnvelopeType, PROTOCOL_VERSION};
pub use payloads::{ErrorPayload, JoinAckPayload, JoinPayload};
pub use priority::Priority;
pub use role::Role;
