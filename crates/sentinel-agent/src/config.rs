//! Page agent configuration loaded from environment variables.

use std::time::Duration;

use sentinel_shared::constants::{
    DEFAULT_SURFACE_ADDR, IDENTITY_ATTR, MESSAGE_CLASS, NOTICE_DWELL_SECS,
};

use crate::extract::CandidateSelector;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Relay socket address.
    /// Env: `RELAY_ADDR`
    /// Default: `127.0.0.1:5055`
    pub relay_addr: String,

    /// How long alert notices stay on the page.
    /// Env: `NOTICE_DWELL_SECS`
    /// Default: `5`
    pub notice_dwell: Duration,

    /// Env: `IDENTITY_ATTR` / `MESSAGE_CLASS`
    /// Default: `data-author-id` / `message-text`
    pub selector: CandidateSelector,

    /// Whether the page starts out focused.
    /// Env: `START_FOCUSED` (true/false)
    /// Default: `true`
    pub start_focused: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            relay_addr: DEFAULT_SURFACE_ADDR.to_string(),
            notice_dwell: Duration::from_secs(NOTICE_DWELL_SECS),
            selector: CandidateSelector {
                identity_attr: IDENTITY_ATTR.to_string(),
                message_class: MESSAGE_CLASS.to_string(),
            },
            start_focused: true,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("RELAY_ADDR") {
            config.relay_addr = addr;
        }

        if let Ok(val) = std::env::var("NOTICE_DWELL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.notice_dwell = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid NOTICE_DWELL_SECS, using default"),
            }
        }

        if let Ok(attr) = std::env::var("IDENTITY_ATTR") {
            if !attr.trim().is_empty() {
                config.selector.identity_attr = attr.trim().to_string();
            }
        }

        if let Ok(class) = std::env::var("MESSAGE_CLASS") {
            if !class.trim().is_empty() {
                config.selector.message_class = class.trim().to_string();
            }
        }

        if let Ok(val) = std::env::var("START_FOCUSED") {
            config.start_focused = val != "false" && val != "0";
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.relay_addr, "127.0.0.1:5055");
        assert_eq!(config.notice_dwell, Duration::from_secs(5));
        assert_eq!(config.selector, CandidateSelector::default());
    }
}
