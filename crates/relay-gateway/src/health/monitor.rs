//! Health monitor
//!
//! Periodically probes every live connection with a ping envelope and
//! terminates ones that fail to respond within tolerance.

use crate::connection::ConnectionRegistry;
use crate::protocol::{CloseCode, Envelope};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Probes connections and evicts non-responders
pub struct HealthMonitor {
    registry: Arc<ConnectionRegistry>,
    ping_interval: Duration,
    pong_timeout: Duration,
}

impl HealthMonitor {
    /// Create a monitor over the given registry
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        ping_interval: Duration,
        pong_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            ping_interval,
            pong_timeout,
        }
    }

    /// Run one sweep at an explicit instant; returns the number of
    /// connections terminated.
    ///
    /// A connection that never answered the previous sweep's ping is
    /// terminated immediately. A connection whose last liveness signal is
    /// older than the interval plus the pong grace is closed as stale even
    /// if its pending flag was cleared since. Everything else gets a fresh
    /// ping and a pending flag.
    pub fn sweep_once(&self, now: Instant) -> usize {
        let stale_bound = self.ping_interval + self.pong_timeout;
        let mut terminated = 0;

        for connection in self.registry.all() {
            if !connection.is_open() {
                continue;
            }

            if connection.is_ping_pending() {
                tracing::warn!(
                    connection_id = %connection.id(),
                    "Connection missed previous ping, terminating"
                );
                connection.close(CloseCode::StaleConnection);
                terminated += 1;
                continue;
            }

            if connection.liveness_age(now) > stale_bound {
                tracing::warn!(
                    connection_id = %connection.id(),
                    age_ms = connection.liveness_age(now).as_millis() as u64,
                    "Connection stale, closing"
                );
                connection.close(CloseCode::StaleConnection);
                terminated += 1;
                continue;
            }

            connection.mark_ping_pending();
            if connection.try_send(Envelope::ping()).is_err() {
                tracing::debug!(
                    connection_id = %connection.id(),
                    "Ping could not be queued"
                );
            }
        }

        terminated
    }

    /// Close connections whose last liveness signal is older than the stale
    /// bound; returns the number closed.
    ///
    /// Runs on its own faster cadence than the ping sweep, so a connection
    /// that goes silent mid-interval is evicted within the pong grace rather
    /// than surviving until the next sweep.
    pub fn expire_stale(&self, now: Instant) -> usize {
        let stale_bound = self.ping_interval + self.pong_timeout;
        let mut closed = 0;

        for connection in self.registry.all() {
            if !connection.is_open() {
                continue;
            }

            if connection.liveness_age(now) > stale_bound {
                tracing::warn!(
                    connection_id = %connection.id(),
                    age_ms = connection.liveness_age(now).as_millis() as u64,
                    "Connection stale, closing"
                );
                connection.close(CloseCode::StaleConnection);
                closed += 1;
            }
        }

        closed
    }

    /// Spawn the periodic ping sweep and the staleness check
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ping_tick = tokio::time::interval(self.ping_interval);
            let mut stale_tick = tokio::time::interval(self.pong_timeout);
            ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            stale_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First ticks fire immediately; skip them so connections get a
            // full interval before their first probe.
            ping_tick.tick().await;
            stale_tick.tick().await;
            loop {
                tokio::select! {
                    _ = ping_tick.tick() => {
                        let terminated = self.sweep_once(Instant::now());
                        if terminated > 0 {
                            tracing::info!(
                                terminated = terminated,
                                "Health sweep evicted connections"
                            );
                        }
                    }
                    _ = stale_tick.tick() => {
                        let closed = self.expire_stale(Instant::now());
                        if closed > 0 {
                            tracing::info!(closed = closed, "Stale connections evicted");
                        }
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("ping_interval", &self.ping_interval)
            .field("pong_timeout", &self.pong_timeout)
            .finish()
    }
}
