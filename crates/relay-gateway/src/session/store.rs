//! Session store
//!
//! Owns the table of sessions using DashMap for thread-safe access from
//! connection tasks and background sweeps. Sessions have a fixed,
//! non-renewable lifetime; an expired session is deleted and never
//! resurrected under the same id.

use crate::connection::Connection;
use crate::protocol::{CloseCode, Role};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;

/// A client attached to a session
#[derive(Debug, Clone)]
pub struct Client {
    /// Connection id, doubles as the client id
    pub id: String,
    /// Role the client joined under
    pub role: Role,
    /// Handle to the live connection
    pub connection: Arc<Connection>,
    /// When the client joined
    pub connected_at: DateTime<Utc>,
}

impl Client {
    /// Create a client record for a joined connection
    #[must_use]
    pub fn new(connection: Arc<Connection>, role: Role) -> Self {
        Self {
            id: connection.id().to_string(),
            role,
            connection,
            connected_at: Utc::now(),
        }
    }
}

/// Credentials issued for a freshly minted session
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    pub id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of validating a session id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionValidation {
    /// Session exists and has not expired
    Valid,
    /// No session under this id
    NotFound,
    /// Session lifetime elapsed; the entry has been deleted
    Expired,
}

/// Why a join could not be admitted into a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmitError {
    #[error("session not found")]
    SessionNotFound,
    #[error("session at capacity for this role")]
    RoleAtCapacity,
}

struct SessionEntry {
    token: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    clients: Vec<Client>,
}

/// Owns the table of sessions
///
/// Shared between connection tasks and the expiry sweeper; all mutation goes
/// through per-entry locks so client-list updates cannot interleave.
pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    ttl: ChronoDuration,
}

impl SessionStore {
    /// Create a store issuing sessions with the given fixed lifetime
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::hours(8)),
        }
    }

    /// Create a store wrapped in Arc
    #[must_use]
    pub fn new_shared(ttl: Duration) -> Arc<Self> {
        Arc::new(Self::new(ttl))
    }

    /// Mint a new session with cryptographically random id and token
    pub fn create(&self) -> SessionCredentials {
        let id = generate_secret();
        let token = generate_secret();
        let created_at = Utc::now();
        let expires_at = created_at + self.ttl;

        self.sessions.insert(
            id.clone(),
            SessionEntry {
                token: token.clone(),
                created_at,
                expires_at,
                clients: Vec::new(),
            },
        );

        tracing::info!(session_id = %id, expires_at = %expires_at, "Session created");

        SessionCredentials { id, token, expires_at }
    }

    /// Validate a session id against the current time
    pub fn validate(&self, session_id: &str) -> SessionValidation {
        self.validate_at(session_id, Utc::now())
    }

    /// Validate a session id at an explicit instant
    ///
    /// An expired entry is deleted on the spot, so `Expired` is returned at
    /// most once per session and `NotFound` thereafter.
    pub fn validate_at(&self, session_id: &str, now: DateTime<Utc>) -> SessionValidation {
        let expired = match self.sessions.get(session_id) {
            None => return SessionValidation::NotFound,
            Some(entry) => now >= entry.expires_at,
        };

        if expired {
            if let Some((_, entry)) = self.sessions.remove(session_id) {
                for client in &entry.clients {
                    client.connection.close(CloseCode::SessionExpired);
                }
            }
            tracing::debug!(session_id = %session_id, "Session expired on validate");
            return SessionValidation::Expired;
        }

        SessionValidation::Valid
    }

    /// Compare a presented token against the session's secret in constant time
    pub fn check_token(&self, session_id: &str, token: &str) -> bool {
        self.sessions
            .get(session_id)
            .map(|entry| entry.token.as_bytes().ct_eq(token.as_bytes()).into())
            .unwrap_or(false)
    }

    /// Attach a client, enforcing the per-role capacity atomically
    pub fn admit_client(
        &self,
        session_id: &str,
        client: Client,
        max_for_role: usize,
    ) -> Result<(), AdmitError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(AdmitError::SessionNotFound)?;

        let in_role = entry.clients.iter().filter(|c| c.role == client.role).count();
        if in_role >= max_for_role {
            return Err(AdmitError::RoleAtCapacity);
        }

        entry.clients.push(client);
        Ok(())
    }

    /// Attach a client without a capacity check
    ///
    /// No-op returning false if the session is absent.
    pub fn add_client(&self, session_id: &str, client: Client) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut entry) => {
                entry.clients.push(client);
                true
            }
            None => false,
        }
    }

    /// Detach a client. Idempotent; returns false if the session is absent
    /// or the client was not attached.
    pub fn remove_client(&self, session_id: &str, client_id: &str) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut entry) => {
                let before = entry.clients.len();
                entry.clients.retain(|c| c.id != client_id);
                entry.clients.len() < before
            }
            None => false,
        }
    }

    /// Snapshot the clients of a session, optionally filtered by role
    pub fn clients_of(&self, session_id: &str, role_filter: Option<Role>) -> Vec<Client> {
        self.sessions
            .get(session_id)
            .map(|entry| {
                entry
                    .clients
                    .iter()
                    .filter(|c| role_filter.is_none_or(|r| c.role == r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of clients attached to a session
    pub fn client_count(&self, session_id: &str) -> usize {
        self.sessions
            .get(session_id)
            .map_or(0, |entry| entry.clients.len())
    }

    /// Number of sessions currently held
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// When the session was created, if it exists
    pub fn created_at(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.sessions.get(session_id).map(|entry| entry.created_at)
    }

    /// Delete expired sessions, closing their connections
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    /// Delete sessions expired as of `now`
    ///
    /// Attached connections get a fire-and-forget session-expired close;
    /// a failure to close one connection never halts the sweep.
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| now >= entry.expires_at)
            .map(|entry| entry.key().clone())
            .collect();

        let mut swept = 0;
        for session_id in expired {
            if let Some((_, entry)) = self.sessions.remove(&session_id) {
                for client in &entry.clients {
                    client.connection.close(CloseCode::SessionExpired);
                }
                tracing::info!(
                    session_id = %session_id,
                    clients = entry.clients.len(),
                    "Expired session swept"
                );
                swept += 1;
            }
        }

        swept
    }

    /// Spawn the periodic expiry sweeper
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let swept = store.sweep_expired();
                if swept > 0 {
                    tracing::debug!(swept = swept, "Expiry sweep completed");
                }
            }
        })
    }

    /// Drop every session, closing attached connections with the given code
    pub fn clear(&self, code: CloseCode) {
        for entry in self.sessions.iter() {
            for client in &entry.clients {
                client.connection.close(code);
            }
        }
        self.sessions.clear();
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

/// 128 bits from the OS RNG, base64-url encoded
fn generate_secret() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
