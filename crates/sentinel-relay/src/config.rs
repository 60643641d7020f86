//! Relay configuration loaded from environment variables.
//!
//! Every setting has a default so the relay starts with zero configuration
//! next to a locally running backend.

use std::net::SocketAddr;

use sentinel_shared::constants::{DEFAULT_BACKEND_ADDR, DEFAULT_SURFACE_ADDR};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Moderation backend address (`host:port`).
    /// Env: `BACKEND_ADDR`
    /// Default: `127.0.0.1:5000`
    pub backend_addr: String,

    /// Local address page agents connect to.
    /// Env: `SURFACE_ADDR`
    /// Default: `127.0.0.1:5055`
    pub surface_addr: SocketAddr,

    /// Open the backend link at startup instead of waiting for the first
    /// reconnect request.
    /// Env: `CONNECT_ON_START` (true/false)
    /// Default: `true`
    pub connect_on_start: bool,

    /// Alerts buffered per surface before new ones are dropped.
    /// Env: `ALERT_QUEUE`
    /// Default: `16`
    pub alert_queue: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            backend_addr: DEFAULT_BACKEND_ADDR.to_string(),
            surface_addr: DEFAULT_SURFACE_ADDR
                .parse()
                .unwrap_or_else(|_| ([127, 0, 0, 1], 5055).into()),
            connect_on_start: true,
            alert_queue: 16,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BACKEND_ADDR") {
            if !addr.trim().is_empty() {
                config.backend_addr = addr.trim().to_string();
            }
        }

        if let Ok(addr) = std::env::var("SURFACE_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.surface_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid SURFACE_ADDR, using default");
            }
        }

        if let Ok(val) = std::env::var("CONNECT_ON_START") {
            config.connect_on_start = val != "false" && val != "0";
        }

        if let Ok(val) = std::env::var("ALERT_QUEUE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.alert_queue = n,
                _ => tracing::warn!(value = %val, "Invalid ALERT_QUEUE, using default"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.backend_addr, "127.0.0.1:5000");
        assert_eq!(config.surface_addr, ([127, 0, 0, 1], 5055).into());
        assert!(config.connect_on_start);
        assert_eq!(config.alert_queue, 16);
    }
}
