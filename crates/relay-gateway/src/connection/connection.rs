//! Individual WebSocket connection
//!
//! Represents a single WebSocket connection and its owned state. All mutable
//! per-connection fields live here, keyed by connection id in the registry,
//! never on the transport object itself.

use crate::protocol::{CloseCode, Envelope, Role};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connection established, waiting for a join
    Joining,
    /// Successfully joined a session
    Connected,
    /// Close requested, writer draining
    Disconnecting,
    /// Connection is closed
    Disconnected,
}

/// Frame queued for the per-connection writer task
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    /// Serialize and send an envelope
    Envelope(Envelope),
    /// Send a final error envelope plus a close frame, then stop
    Close(CloseCode),
}

/// A single WebSocket connection
pub struct Connection {
    /// Unique connection id, assigned at accept
    id: String,

    /// Session joined under (None until join succeeds)
    session_id: RwLock<Option<String>>,

    /// Role joined under (fixed once set)
    role: RwLock<Option<Role>>,

    /// Current connection state
    state: RwLock<ConnectionState>,

    /// Channel to the writer task
    sender: mpsc::Sender<OutboundFrame>,

    /// Last liveness signal (pong or inbound ping)
    last_liveness: RwLock<Instant>,

    /// Whether a ping is outstanding without a response
    ping_pending: AtomicBool,

    /// Connection creation time
    connected_at: Instant,
}

impl Connection {
    /// Create a new connection in the joining state
    pub fn new(id: String, sender: mpsc::Sender<OutboundFrame>) -> Arc<Self> {
        Arc::new(Self {
            id,
            session_id: RwLock::new(None),
            role: RwLock::new(None),
            state: RwLock::new(ConnectionState::Joining),
            sender,
            last_liveness: RwLock::new(Instant::now()),
            ping_pending: AtomicBool::new(false),
            connected_at: Instant::now(),
        })
    }

    /// Get the connection id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the session this connection joined (if any)
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    /// Get the role this connection joined under (if any)
    pub fn role(&self) -> Option<Role> {
        *self.role.read()
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Set the connection state
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    /// Mark the connection as joined into a session under a role
    pub fn mark_joined(&self, session_id: &str, role: Role) {
        *self.session_id.write() = Some(session_id.to_string());
        *self.role.write() = Some(role);
        *self.state.write() = ConnectionState::Connected;
    }

    /// Check if the connection has completed a join
    pub fn is_joined(&self) -> bool {
        self.session_id.read().is_some()
    }

    /// Check if the connection can still be written to
    pub fn is_open(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Joining | ConnectionState::Connected
        ) && !self.sender.is_closed()
    }

    /// Record a liveness signal and clear any outstanding ping
    pub fn record_liveness(&self) {
        *self.last_liveness.write() = Instant::now();
        self.ping_pending.store(false, Ordering::SeqCst);
    }

    /// Time since the last liveness signal, measured at `now`
    pub fn liveness_age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_liveness.read())
    }

    /// Check if a ping is outstanding
    pub fn is_ping_pending(&self) -> bool {
        self.ping_pending.load(Ordering::SeqCst)
    }

    /// Mark a ping as outstanding
    pub fn mark_ping_pending(&self) {
        self.ping_pending.store(true, Ordering::SeqCst);
    }

    /// Queue an envelope for delivery
    pub async fn send(&self, envelope: Envelope) -> Result<(), SendError> {
        self.sender
            .send(OutboundFrame::Envelope(envelope))
            .await
            .map_err(|_| SendError::Closed)
    }

    /// Queue an envelope without waiting; fails when the writer is gone or
    /// the queue is full (a slow peer must never stall the caller)
    pub fn try_send(&self, envelope: Envelope) -> Result<(), SendError> {
        self.sender
            .try_send(OutboundFrame::Envelope(envelope))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SendError::Backpressure,
                mpsc::error::TrySendError::Closed(_) => SendError::Closed,
            })
    }

    /// Request the writer to close the connection with the given code.
    /// Fire-and-forget: a full or closed queue means the writer is already
    /// on its way down.
    pub fn close(&self, code: CloseCode) {
        {
            let mut state = self.state.write();
            if matches!(
                *state,
                ConnectionState::Disconnecting | ConnectionState::Disconnected
            ) {
                return;
            }
            *state = ConnectionState::Disconnecting;
        }
        let _ = self.sender.try_send(OutboundFrame::Close(code));
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Error queueing an outbound frame
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SendError {
    #[error("connection writer closed")]
    Closed,
    #[error("outbound queue full")]
    Backpressure,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("session_id", &*self.session_id.read())
            .field("role", &*self.role.read())
            .field("state", &*self.state.read())
            .finish()
    }
}
