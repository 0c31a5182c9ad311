//! # relay-gateway
//!
//! Session-scoped WebSocket relay brokering messages between producer and
//! consumer clients over token-authenticated, short-lived sessions.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod health;
pub mod limits;
pub mod protocol;
pub mod server;
pub mod session;

pub use server::{create_app, run, RelayState};
