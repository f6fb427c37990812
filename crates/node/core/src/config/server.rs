use std::time::Duration;

use rumor_rpc_server::GrpcServerConfig;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SHUTDOWN_GRACE_MS;

/// gRPC server configuration (TOML-serializable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Time in-flight calls get to finish on shutdown
    pub shutdown_grace_ms: u64,

    /// Serve gRPC reflection
    pub reflection: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            reflection: true,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl From<&ServerConfig> for GrpcServerConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            shutdown_grace: config.shutdown_grace(),
            reflection: config.reflection,
        }
    }
}
