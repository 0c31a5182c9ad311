//! Handshake guard
//!
//! Validates connection origin before upgrade and owns the join deadline a
//! connection must meet before it may participate.

use std::time::Duration;

/// Guards the pre-join phase of a connection
#[derive(Debug, Clone)]
pub struct HandshakeGuard {
    /// Extra allowed origin patterns beyond the built-in development set
    allowed_origins: Vec<String>,
    /// Deadline for the first join attempt
    join_timeout: Duration,
}

impl HandshakeGuard {
    /// Create a guard with extra origin patterns and a join deadline
    #[must_use]
    pub fn new(allowed_origins: Vec<String>, join_timeout: Duration) -> Self {
        Self {
            allowed_origins,
            join_timeout,
        }
    }

    /// Deadline for the first join attempt
    #[must_use]
    pub fn join_timeout(&self) -> Duration {
        self.join_timeout
    }

    /// Check a declared origin against the allow-list
    ///
    /// Non-browser clients send no `Origin` header and are allowed; a present
    /// origin must be loopback, a private-network host, or match a configured
    /// pattern.
    #[must_use]
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin else {
            return true;
        };

        if self.allowed_origins.iter().any(|p| p == origin) {
            return true;
        }

        match origin_host(origin) {
            Some(host) => is_loopback_host(host) || is_private_host(host),
            None => false,
        }
    }
}

/// Extract the host portion of an origin like `http://10.0.0.5:3000`
fn origin_host(origin: &str) -> Option<&str> {
    let rest = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    if rest.is_empty() {
        return None;
    }

    // IPv6 literals keep their brackets
    if let Some(stripped) = rest.strip_prefix('[') {
        return stripped.split(']').next();
    }

    rest.split(':').next().filter(|h| !h.is_empty())
}

fn is_loopback_host(host: &str) -> bool {
    host == "localhost" || host == "::1" || host.starts_with("127.")
}

fn is_private_host(host: &str) -> bool {
    let octets: Vec<u8> = host
        .split('.')
        .map_while(|part| part.parse().ok())
        .collect();
    if octets.len() != 4 {
        return false;
    }

    match octets[0] {
        10 => true,
        192 => octets[1] == 168,
        172 => (16..=31).contains(&octets[1]),
        _ => false,
    }
}
