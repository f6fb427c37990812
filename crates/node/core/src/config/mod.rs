//! Node configuration handling.
//!
//! Configuration is split into submodules:
//! - `peer` - `[local]` and `[[bootstrap]]` peer entries
//! - `discovery` - discovery loop settings
//! - `server` - gRPC server settings

mod discovery;
mod peer;
mod server;

pub use discovery::DiscoveryConfig;
pub use peer::PeerEntry;
pub use server::ServerConfig;

use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::args::NodeArgs;

/// Configuration of a rumor node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// The node itself, as declared to other peers.
    #[serde(default)]
    pub local: PeerEntry,

    /// Peers known at startup.
    #[serde(default)]
    pub bootstrap: Vec<PeerEntry>,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl NodeConfig {
    /// Load the configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .wrap_err_with(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the configuration to the given path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Apply command line arguments to override the configuration.
    pub fn apply_args(&mut self, args: &NodeArgs) {
        if let Some(addr) = &args.addr {
            self.local.addr = addr.clone();
        }
        if !args.bootstrap.is_empty() {
            self.bootstrap = args.bootstrap.iter().map(PeerEntry::new).collect();
        }
        if args.no_discovery {
            self.discovery.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const SAMPLE: &str = r#"
[local]
addr = "127.0.0.1:9000"
name = "node-a"
cluster = "blue"

[local.attributes]
zone = "eu-west"

[[bootstrap]]
addr = "127.0.0.1:9001"
cluster = "blue"

[[bootstrap]]
addr = "http://127.0.0.1:9002"

[discovery]
interval_ms = 250
max_concurrent = 4

[server]
shutdown_grace_ms = 1000
reflection = false
"#;

    #[test]
    fn test_parse_sample() {
        let config = NodeConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.local.addr, "127.0.0.1:9000");
        let local = config.local.to_peer();
        assert_eq!(local.attribute("name"), Some("node-a"));
        assert_eq!(local.attribute("cluster"), Some("blue"));
        assert_eq!(local.attribute("zone"), Some("eu-west"));

        assert_eq!(config.bootstrap.len(), 2);
        assert_eq!(config.bootstrap[1].addr, "http://127.0.0.1:9002");

        assert!(config.discovery.enabled);
        assert_eq!(config.discovery.interval(), Duration::from_millis(250));
        assert_eq!(config.discovery.exchange_timeout_ms, 5_000);
        assert_eq!(config.discovery.max_concurrent, 4);

        assert_eq!(config.server.shutdown_grace(), Duration::from_secs(1));
        assert!(!config.server.reflection);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = NodeConfig::from_toml("").unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(config.local.addr, crate::constants::DEFAULT_LISTEN_ADDR);
        assert!(config.bootstrap.is_empty());
        assert!(config.server.reflection);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(NodeConfig::from_toml("[discovery]\nintervall_ms = 5\n").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("rumor.toml");

        let config = NodeConfig::from_toml(SAMPLE).unwrap();
        config.save(&path).unwrap();

        assert_eq!(NodeConfig::load(&path).unwrap(), config);
        assert!(NodeConfig::load(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_apply_args() {
        let mut config = NodeConfig::from_toml(SAMPLE).unwrap();
        config.apply_args(&NodeArgs {
            addr: Some("127.0.0.1:7000".to_string()),
            bootstrap: vec!["127.0.0.1:7001".to_string()],
            no_discovery: true,
            ..Default::default()
        });

        assert_eq!(config.local.addr, "127.0.0.1:7000");
        assert_eq!(config.local.cluster.as_deref(), Some("blue"));
        assert_eq!(config.bootstrap, vec![PeerEntry::new("127.0.0.1:7001")]);
        assert!(!config.discovery.enabled);
    }
}
