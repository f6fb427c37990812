//! Discovery metrics

use metrics::{Counter, Gauge};

/// Discovery engine metrics
#[derive(Clone, Debug)]
pub struct DiscoveryMetrics {
    /// Completed scan/refresh cycles
    pub(crate) cycles_total: Counter,
    /// Exchange calls that failed or timed out
    pub(crate) exchange_failures_total: Counter,
    /// Peers learned through exchange and merged into the store
    pub(crate) peers_added_total: Counter,
    /// Outbound dials started
    pub(crate) dials_total: Counter,
    /// Peers in the store at the end of the last cycle
    pub(crate) peers_known: Gauge,
}

impl Default for DiscoveryMetrics {
    fn default() -> Self {
        Self {
            cycles_total: metrics::counter!("discovery.cycles_total"),
            exchange_failures_total: metrics::counter!("discovery.exchange.failures_total"),
            peers_added_total: metrics::counter!("discovery.peers.added_total"),
            dials_total: metrics::counter!("discovery.dials_total"),
            peers_known: metrics::gauge!("discovery.peers.known"),
        }
    }
}
