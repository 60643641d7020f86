//! Chat client configuration loaded from environment variables.

use std::time::Duration;

use sentinel_shared::constants::{DEFAULT_BACKEND_ADDR, TYPING_DEADLINE_MS};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Moderation backend address (`host:port`).
    /// Env: `BACKEND_ADDR`
    /// Default: `127.0.0.1:5000`
    pub backend_addr: String,

    /// Quiet period after the last keystroke before the typing flag drops.
    /// Env: `TYPING_DEADLINE_MS`
    /// Default: `1000`
    pub typing_deadline: Duration,

    /// Updates buffered for the UI before new ones are dropped. A UI that
    /// falls behind can always resync from a snapshot.
    /// Env: `UPDATE_QUEUE`
    /// Default: `256`
    pub update_queue: usize,

    /// Display name to log in with. Asked for interactively when unset.
    /// Env: `SENTINEL_USER`
    pub user: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_addr: DEFAULT_BACKEND_ADDR.to_string(),
            typing_deadline: Duration::from_millis(TYPING_DEADLINE_MS),
            update_queue: 256,
            user: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BACKEND_ADDR") {
            if !addr.trim().is_empty() {
                config.backend_addr = addr.trim().to_string();
            }
        }

        if let Ok(val) = std::env::var("TYPING_DEADLINE_MS") {
            match val.parse::<u64>() {
                Ok(ms) if ms > 0 => config.typing_deadline = Duration::from_millis(ms),
                _ => tracing::warn!(value = %val, "Invalid TYPING_DEADLINE_MS, using default"),
            }
        }

        if let Ok(val) = std::env::var("UPDATE_QUEUE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.update_queue = n,
                _ => tracing::warn!(value = %val, "Invalid UPDATE_QUEUE, using default"),
            }
        }

        if let Ok(user) = std::env::var("SENTINEL_USER") {
            let user = user.trim();
            if !user.is_empty() {
                config.user = Some(user.to_string());
            }
        }

        config
    }
}
