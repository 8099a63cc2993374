//! Hub configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Missing or unparsable values fall
//! back to the defaults documented on each field.

use std::net::SocketAddr;
use std::time::Duration;

use crate::hub::HubSettings;
use crate::ws::{ConnectionSettings, OriginAllowList};

/// Top-level server configuration.
///
/// Loaded once at startup via [`HubConfig::from_env`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Socket address to bind the HTTP server to. Default `0.0.0.0:8080`.
    pub listen_addr: SocketAddr,

    /// Per-connection mailbox capacity. Default 256.
    pub mailbox_capacity: usize,

    /// Dispatcher control channel capacity. Default 1024.
    pub control_channel_capacity: usize,

    /// Seconds of outbound silence before a heartbeat ping. Default 30.
    pub heartbeat_interval_secs: u64,

    /// Seconds of inbound silence before a connection is dropped. Default 60.
    pub pong_wait_secs: u64,

    /// Seconds a single socket write may take. Default 10.
    pub write_timeout_secs: u64,

    /// Milliseconds the read side may linger after the write side closed.
    /// Default 1000.
    pub close_grace_ms: u64,

    /// Comma-separated browser origins allowed to connect.
    /// Default `http://localhost:3000`.
    pub cors_origins: String,

    /// Seconds between simulated metrics samples. Default 5.
    pub metrics_interval_secs: u64,

    /// Seconds to wait for the dispatcher during shutdown. Default 5.
    pub shutdown_timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            mailbox_capacity: 256,
            control_channel_capacity: 1024,
            heartbeat_interval_secs: 30,
            pong_wait_secs: 60,
            write_timeout_secs: 10,
            close_grace_ms: 1000,
            cors_origins: "http://localhost:3000".to_string(),
            metrics_interval_secs: 5,
            shutdown_timeout_secs: 5,
        }
    }
}

impl HubConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr,
        };

        Ok(Self {
            listen_addr,
            mailbox_capacity: parse_env("MAILBOX_CAPACITY", defaults.mailbox_capacity).max(1),
            control_channel_capacity: parse_env(
                "CONTROL_CHANNEL_CAPACITY",
                defaults.control_channel_capacity,
            )
            .max(1),
            heartbeat_interval_secs: parse_env(
                "HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval_secs,
            )
            .max(1),
            pong_wait_secs: parse_env("PONG_WAIT_SECS", defaults.pong_wait_secs).max(1),
            write_timeout_secs: parse_env("WRITE_TIMEOUT_SECS", defaults.write_timeout_secs)
                .max(1),
            close_grace_ms: parse_env("CLOSE_GRACE_MS", defaults.close_grace_ms),
            cors_origins: std::env::var("CORS_ORIGINS").unwrap_or(defaults.cors_origins),
            metrics_interval_secs: parse_env(
                "METRICS_INTERVAL_SECS",
                defaults.metrics_interval_secs,
            )
            .max(1),
            shutdown_timeout_secs: parse_env(
                "SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout_secs,
            ),
        })
    }

    /// Dispatcher and mailbox sizing.
    #[must_use]
    pub fn hub_settings(&self) -> HubSettings {
        HubSettings {
            mailbox_capacity: self.mailbox_capacity,
            control_capacity: self.control_channel_capacity,
        }
    }

    /// Per-connection transport timing.
    #[must_use]
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs.max(1)),
            pong_wait: Duration::from_secs(self.pong_wait_secs.max(1)),
            write_timeout: Duration::from_secs(self.write_timeout_secs.max(1)),
            close_grace: Duration::from_millis(self.close_grace_ms),
        }
    }

    /// Parsed origin allow-list.
    #[must_use]
    pub fn allowed_origins(&self) -> OriginAllowList {
        OriginAllowList::from_csv(&self.cors_origins)
    }

    /// Metrics simulator tick.
    #[must_use]
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs.max(1))
    }

    /// Upper bound on graceful shutdown.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
