//! Fan-out of envelopes to session members

mod broadcaster;

pub use broadcaster::Broadcaster;
