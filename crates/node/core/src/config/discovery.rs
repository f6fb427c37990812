use std::time::Duration;

use rumor_discovery::DialConfig;
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Discovery configuration (TOML-serializable).
///
/// Converted into [`rumor_discovery::DiscoveryConfig`] and [`DialConfig`] at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Whether to run the discovery loop
    pub enabled: bool,

    pub interval_ms: u64,

    pub exchange_timeout_ms: u64,

    pub connect_timeout_ms: u64,

    /// Peers scanned or dialed concurrently
    pub max_concurrent: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: DEFAULT_DISCOVERY_INTERVAL_MS,
            exchange_timeout_ms: DEFAULT_EXCHANGE_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl DiscoveryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn dial_config(&self) -> DialConfig {
        DialConfig {
            connect_timeout: self.connect_timeout(),
            request_timeout: self.exchange_timeout(),
        }
    }
}

impl From<&DiscoveryConfig> for rumor_discovery::DiscoveryConfig {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            interval: config.interval(),
            exchange_timeout: config.exchange_timeout(),
            connect_timeout: config.connect_timeout(),
            max_concurrent: config.max_concurrent,
        }
    }
}
