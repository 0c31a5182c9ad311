//! Relay state
//!
//! Shared application state wiring every component together. All services
//! are explicit constructor-injected objects; nothing is a module-level
//! singleton.

use crate::broadcast::Broadcaster;
use crate::connection::ConnectionRegistry;
use crate::health::HealthMonitor;
use crate::limits::{HandshakeGuard, RateLimiter};
use crate::protocol::CloseCode;
use crate::session::SessionStore;
use parking_lot::Mutex;
use relay_common::RelayConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Relay application state
///
/// Holds all shared dependencies for the relay server.
#[derive(Clone)]
pub struct RelayState {
    sessions: Arc<SessionStore>,
    registry: Arc<ConnectionRegistry>,
    broadcaster: Arc<Broadcaster>,
    rate_limiter: Arc<RateLimiter>,
    handshake: Arc<HandshakeGuard>,
    config: Arc<RelayConfig>,
    /// Background sweep tasks, stopped first on shutdown
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl RelayState {
    /// Build the full component graph from configuration
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        let sessions = SessionStore::new_shared(config.session.ttl());
        let registry = Arc::new(ConnectionRegistry::new(
            Arc::clone(&sessions),
            config.session.max_producers,
            config.session.max_consumers,
        ));
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&sessions)));
        let rate_limiter = Arc::new(RateLimiter::new(
            config.limits.rate_max_per_window,
            config.limits.rate_window(),
        ));
        let handshake = Arc::new(HandshakeGuard::new(
            config.limits.allowed_origins.clone(),
            config.limits.join_timeout(),
        ));

        Self {
            sessions,
            registry,
            broadcaster,
            rate_limiter,
            handshake,
            config: Arc::new(config),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the session store
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Get the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the broadcaster
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Get the rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Get the handshake guard
    pub fn handshake(&self) -> &HandshakeGuard {
        &self.handshake
    }

    /// Get the relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Start the expiry and health sweeps
    pub fn start_background_tasks(&self) {
        let sweeper = self
            .sessions
            .spawn_sweeper(self.config.session.sweep_interval());

        let monitor = Arc::new(HealthMonitor::new(
            Arc::clone(&self.registry),
            self.config.limits.ping_interval(),
            self.config.limits.pong_timeout(),
        ));
        let health = monitor.spawn();

        let mut tasks = self.tasks.lock();
        tasks.push(sweeper);
        tasks.push(health);

        tracing::info!("Background sweeps started");
    }

    /// Shut the relay down: stop timers, close all connections, release
    /// the session table.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }

        for connection in self.registry.all() {
            connection.close(CloseCode::Shutdown);
        }

        self.sessions.clear(CloseCode::Shutdown);

        tracing::info!("Relay shut down");
    }
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("sessions", &self.sessions)
            .field("registry", &self.registry)
            .finish()
    }
}
