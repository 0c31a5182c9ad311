//! Fan-out priorities
//!
//! Classifies outbound envelopes for observability and sender-side ordering
//! intent. Priority never reorders an already-established transport stream.

use super::{Envelope, EnvelopeType};

/// Payload size at which a `data` envelope counts as a full-payload update
/// rather than an incremental one. The payload is opaque, so size is the
/// only available signal.
const FULL_PAYLOAD_THRESHOLD: usize = 64 * 1024;

/// Outbound envelope priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Control messages and application events
    High,
    /// Incremental application data
    Medium,
    /// Full-payload application data
    Low,
}

impl Priority {
    /// Classify an outbound envelope
    #[must_use]
    pub fn of(envelope: &Envelope) -> Self {
        match envelope.kind {
            EnvelopeType::Join
            | EnvelopeType::JoinAck
            | EnvelopeType::Ping
            | EnvelopeType::Pong
            | EnvelopeType::Event
            | EnvelopeType::Error => Self::High,
            EnvelopeType::Data => {
                if envelope.payload_size() >= FULL_PAYLOAD_THRESHOLD {
                    Self::Low
                } else {
                    Self::Medium
                }
            }
        }
    }

    /// Get the name of this priority
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
