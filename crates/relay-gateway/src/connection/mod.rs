//! Connection management
//!
//! Owned per-connection state and the registry of live connections.

mod connection;
mod registry;

pub use connection::{Connection, ConnectionState, OutboundFrame};
pub use registry::ConnectionRegistry;
