//! Integration test utilities for the relay
//!
//! This crate provides helpers for running an in-process relay server and
//! driving it with real WebSocket clients.

pub mod helpers;

pub use helpers::*;
