//! Default values for node configuration.

/// Default listen address of a node.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9000";

/// Default delay between discovery cycles.
pub const DEFAULT_DISCOVERY_INTERVAL_MS: u64 = 1_000;

/// Default bound on one Exchange call, readiness wait included.
pub const DEFAULT_EXCHANGE_TIMEOUT_MS: u64 = 5_000;

/// Default bound on one connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default number of peers scanned or dialed concurrently.
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

/// Default drain period for in-flight calls on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;

/// Attribute key carrying a peer's display name.
pub const NAME_ATTRIBUTE: &str = "name";

/// Attribute key carrying a peer's cluster.
pub const CLUSTER_ATTRIBUTE: &str = "cluster";
