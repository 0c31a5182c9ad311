//! Application configuration structs
//!
//! Loads configuration from environment variables.

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub limits: LimitsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Session lifetime and capacity configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Fixed session lifetime in seconds (non-renewable)
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
    /// Interval between expiry sweeps, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Maximum producer clients per session
    #[serde(default = "default_max_producers")]
    pub max_producers: usize,
    /// Maximum consumer clients per session
    #[serde(default = "default_max_consumers")]
    pub max_consumers: usize,
}

impl SessionConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Per-connection protocol limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Deadline for the first join attempt, in milliseconds
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
    /// Interval between liveness ping sweeps, in milliseconds
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// Grace past the ping interval before a connection counts as stale, in milliseconds
    #[serde(default = "default_pong_timeout_ms")]
    pub pong_timeout_ms: u64,
    /// Rate limit window in milliseconds
    #[serde(default = "default_rate_window_ms")]
    pub rate_window_ms: u64,
    /// Maximum messages accepted per rate window
    #[serde(default = "default_rate_max_per_window")]
    pub rate_max_per_window: u32,
    /// Maximum size of a single inbound message, in bytes
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Additional allowed origin patterns (loopback and private ranges are built in)
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl LimitsConfig {
    #[must_use]
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    #[must_use]
    pub fn pong_timeout(&self) -> Duration {
        Duration::from_millis(self.pong_timeout_ms)
    }

    #[must_use]
    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }
}

// Default value functions
fn default_app_name() -> String {
    "relay".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9030
}

fn default_session_ttl() -> u64 {
    8 * 60 * 60 // 8 hours
}

fn default_sweep_interval() -> u64 {
    300 // 5 minutes
}

fn default_max_producers() -> usize {
    10
}

fn default_max_consumers() -> usize {
    5
}

fn default_join_timeout_ms() -> u64 {
    30_000
}

fn default_ping_interval_ms() -> u64 {
    30_000
}

fn default_pong_timeout_ms() -> u64 {
    10_000
}

fn default_rate_window_ms() -> u64 {
    1_000
}

fn default_rate_max_per_window() -> u32 {
    100
}

fn default_max_message_bytes() -> usize {
    10 * 1024 * 1024 // 10 MiB
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: default_env(),
            },
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            session: SessionConfig {
                ttl_secs: default_session_ttl(),
                sweep_interval_secs: default_sweep_interval(),
                max_producers: default_max_producers(),
                max_consumers: default_max_consumers(),
            },
            limits: LimitsConfig {
                join_timeout_ms: default_join_timeout_ms(),
                ping_interval_ms: default_ping_interval_ms(),
                pong_timeout_ms: default_pong_timeout_ms(),
                rate_window_ms: default_rate_window_ms(),
                rate_max_per_window: default_rate_max_per_window(),
                max_message_bytes: default_max_message_bytes(),
                allowed_origins: Vec::new(),
            },
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional; unset variables fall back to defaults.
    ///
    /// # Errors
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(name) = env::var("APP_NAME") {
            config.app.name = name;
        }
        if let Ok(s) = env::var("APP_ENV") {
            config.app.env = match s.to_lowercase().as_str() {
                "production" => Environment::Production,
                "staging" => Environment::Staging,
                "development" => Environment::Development,
                other => {
                    return Err(ConfigError::InvalidValue("APP_ENV", other.to_string()));
                }
            };
        }

        if let Ok(host) = env::var("RELAY_HOST") {
            config.server.host = host;
        }
        config.server.port = parse_var("RELAY_PORT", config.server.port)?;

        config.session.ttl_secs = parse_var("SESSION_TTL_SECS", config.session.ttl_secs)?;
        config.session.sweep_interval_secs =
            parse_var("SESSION_SWEEP_INTERVAL_SECS", config.session.sweep_interval_secs)?;
        config.session.max_producers = parse_var("MAX_PRODUCERS", config.session.max_producers)?;
        config.session.max_consumers = parse_var("MAX_CONSUMERS", config.session.max_consumers)?;

        config.limits.join_timeout_ms = parse_var("JOIN_TIMEOUT_MS", config.limits.join_timeout_ms)?;
        config.limits.ping_interval_ms =
            parse_var("PING_INTERVAL_MS", config.limits.ping_interval_ms)?;
        config.limits.pong_timeout_ms = parse_var("PONG_TIMEOUT_MS", config.limits.pong_timeout_ms)?;
        config.limits.rate_window_ms = parse_var("RATE_WINDOW_MS", config.limits.rate_window_ms)?;
        config.limits.rate_max_per_window =
            parse_var("RATE_MAX_PER_WINDOW", config.limits.rate_max_per_window)?;
        config.limits.max_message_bytes =
            parse_var("MAX_MESSAGE_BYTES", config.limits.max_message_bytes)?;

        if let Ok(origins) = env::var("ALLOWED_ORIGINS") {
            config.limits.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_server_address() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
        };
        assert_eq!(config.address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_default_values() {
        let config = RelayConfig::default();
        assert_eq!(config.app.name, "relay");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.session.ttl_secs, 28_800);
        assert_eq!(config.session.sweep_interval_secs, 300);
        assert_eq!(config.session.max_producers, 10);
        assert_eq!(config.session.max_consumers, 5);
        assert_eq!(config.limits.join_timeout_ms, 30_000);
        assert_eq!(config.limits.ping_interval_ms, 30_000);
        assert_eq!(config.limits.pong_timeout_ms, 10_000);
        assert_eq!(config.limits.rate_window_ms, 1_000);
        assert_eq!(config.limits.rate_max_per_window, 100);
        assert_eq!(config.limits.max_message_bytes, 10 * 1024 * 1024);
        assert!(config.limits.allowed_origins.is_empty());
    }

    #[test]
    fn test_duration_helpers() {
        let config = RelayConfig::default();
        assert_eq!(config.session.ttl(), Duration::from_secs(28_800));
        assert_eq!(config.limits.join_timeout(), Duration::from_secs(30));
        assert_eq!(config.limits.rate_window(), Duration::from_millis(1_000));
    }
}
