//! Periodic scan and refresh over the known membership.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use rumor_net_peers::{NetConnection, Peer, PeerStore, PeerStoreError, normalize_addr};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::client::{self, ExchangeError};
use crate::connection::PeerConnection;
use crate::manager::ConnectionManager;
use crate::metrics::DiscoveryMetrics;

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Delay between the start of two cycles. The first cycle runs immediately.
    pub interval: Duration,
    /// Bound on readiness plus the call for one Exchange.
    pub exchange_timeout: Duration,
    /// Bound on one reconnection attempt during refresh.
    pub connect_timeout: Duration,
    /// Peers scanned or dialed at the same time.
    pub max_concurrent: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            exchange_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            max_concurrent: 16,
        }
    }
}

/// Outcome of one discovery cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Peers that answered Exchange.
    pub responders: usize,
    /// Exchanges that failed.
    pub failures: usize,
    /// Distinct candidates learned, self excluded.
    pub discovered: usize,
    /// Candidates that were new to the store.
    pub added: usize,
    /// Refresh attempts that reached `Ready`.
    pub connected: usize,
    /// Refresh attempts that did not.
    pub unreachable: usize,
}

/// Gossip engine: pulls membership from every known peer and keeps
/// connections to them alive.
#[derive(Debug)]
pub struct Discovery {
    local: Peer,
    store: Arc<PeerStore<PeerConnection>>,
    connections: Arc<ConnectionManager>,
    config: DiscoveryConfig,
    metrics: DiscoveryMetrics,
}

impl Discovery {
    /// `local` is the peer this node declares to others.
    pub fn new(
        local: Peer,
        connections: Arc<ConnectionManager>,
        config: DiscoveryConfig,
    ) -> Result<Self, PeerStoreError> {
        let addr = normalize_addr(local.addr())?;
        let (_, attributes) = local.into_parts();

        Ok(Self {
            local: Peer::new(addr, attributes),
            store: connections.store().clone(),
            connections,
            config,
            metrics: DiscoveryMetrics::default(),
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Run cycles on the configured interval until `cancel` fires.
    ///
    /// Cancellation is observed between cycles; a running cycle completes.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval = ?self.config.interval, "discovery started");

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = ticker.tick() => {
                    let report = self.cycle().await;
                    debug!(?report, "discovery cycle complete");
                }
            }
        }

        info!("discovery stopped");
    }

    /// One scan, merge and refresh pass.
    pub async fn cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let responses = self.scan(&mut report).await;
        let candidates = collect_candidates(responses, self.local.addr());
        report.discovered = candidates.len();

        match self.store.add_peers(candidates, true) {
            Ok(added) => {
                for peer in &added {
                    info!(peer = %peer.addr(), "added peer");
                }
                report.added = added.len();
                self.metrics.peers_added_total.increment(added.len() as u64);
            }
            Err(err) => warn!(%err, "failed to merge discovered peers"),
        }

        self.refresh(&mut report).await;

        self.metrics.cycles_total.increment(1);
        self.metrics.peers_known.set(self.store.len() as f64);
        report
    }

    fn remote_peers(&self) -> impl Iterator<Item = Peer> + '_ {
        self.store
            .get_all_peers()
            .into_iter()
            .filter(move |peer| peer.addr() != self.local.addr())
    }

    /// Exchange with every known peer. Responses keep the store's iteration order.
    async fn scan(&self, report: &mut CycleReport) -> Vec<Vec<Peer>> {
        let results: Vec<_> = stream::iter(self.remote_peers())
            .map(|peer| async move {
                let result = self.exchange_with(peer.addr()).await;
                (peer, result)
            })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let mut responses = Vec::with_capacity(results.len());
        for (peer, result) in results {
            match result {
                Ok(peers) => {
                    report.responders += 1;
                    responses.push(peers);
                }
                Err(err) => {
                    report.failures += 1;
                    self.metrics.exchange_failures_total.increment(1);
                    debug!(peer = %peer.addr(), %err, "exchange failed");
                }
            }
        }
        responses
    }

    async fn exchange_with(&self, addr: &str) -> Result<Vec<Peer>, ExchangeError> {
        let conn = self.connections.connect(addr)?;
        client::exchange(&conn, &self.local, self.config.exchange_timeout).await
    }

    /// Reconnect every peer whose connection is not `Ready` and wait for all attempts.
    async fn refresh(&self, report: &mut CycleReport) {
        let stale: Vec<Peer> = self
            .remote_peers()
            .filter(|peer| !peer.state().is_ready())
            .collect();
        if stale.is_empty() {
            return;
        }
        trace!(count = stale.len(), "refreshing connections");

        let outcomes: Vec<bool> = stream::iter(stale)
            .map(|peer| async move { self.reconnect(peer.addr()).await })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        report.connected = outcomes.iter().filter(|connected| **connected).count();
        report.unreachable = outcomes.len() - report.connected;
    }

    async fn reconnect(&self, addr: &str) -> bool {
        let conn = match self.connections.connect(addr) {
            Ok(conn) => conn,
            Err(err) => {
                debug!(peer = %addr, %err, "failed to dial peer");
                return false;
            }
        };

        match conn.ready(self.config.connect_timeout).await {
            Some(_) => {
                info!(peer = %addr, "connected");
                true
            }
            None => {
                debug!(peer = %addr, state = %conn.state(), "peer unreachable");
                false
            }
        }
    }
}

/// Flatten exchange responses into merge candidates.
///
/// Candidates are deduplicated by normalized address with the first occurrence
/// winning; the local address and malformed addresses are dropped.
pub fn collect_candidates(
    responses: impl IntoIterator<Item = Vec<Peer>>,
    local_addr: &str,
) -> Vec<Peer> {
    let mut seen = HashSet::new();

    responses
        .into_iter()
        .flatten()
        .filter_map(|peer| {
            let addr = normalize_addr(peer.addr()).ok()?;
            (addr != local_addr && seen.insert(addr)).then_some(peer)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rumor_net_peers::Attributes;

    use super::*;

    fn peer(addr: &str, cluster: &str) -> Peer {
        Peer::new(addr, Attributes::new()).with_attribute("cluster", cluster)
    }

    #[test]
    fn test_collect_candidates_first_seen_wins() {
        let candidates = collect_candidates(
            vec![
                vec![peer("127.0.0.1:9001", "x"), peer("127.0.0.1:9002", "x")],
                vec![peer("http://127.0.0.1:9001", "y"), peer("127.0.0.1:9003", "y")],
            ],
            "127.0.0.1:9000",
        );

        let addrs: Vec<_> = candidates.iter().map(Peer::addr).collect();
        assert_eq!(addrs, ["127.0.0.1:9001", "127.0.0.1:9002", "127.0.0.1:9003"]);
        assert_eq!(candidates[0].attribute("cluster"), Some("x"));
    }

    #[test]
    fn test_collect_candidates_excludes_self_and_invalid() {
        let candidates = collect_candidates(
            vec![vec![
                peer("127.0.0.1:9000", "x"),
                peer("http://127.0.0.1:9000/", "x"),
                peer("", "x"),
                peer("127.0.0.1:9001", "x"),
            ]],
            "127.0.0.1:9000",
        );

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].addr(), "127.0.0.1:9001");
    }

    #[tokio::test]
    async fn test_cycle_counts_unreachable_peers() {
        let store = Arc::new(PeerStore::new());
        store
            .add_peer(Peer::new("127.0.0.1:1", Attributes::new()))
            .unwrap();
        store
            .add_peer(Peer::new("127.0.0.1:9000", Attributes::new()))
            .unwrap();

        let connections = Arc::new(
            ConnectionManager::new("127.0.0.1:9000", store.clone(), Default::default()).unwrap(),
        );
        let config = DiscoveryConfig {
            exchange_timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let discovery = Discovery::new(
            Peer::new("127.0.0.1:9000", Attributes::new()),
            connections,
            config,
        )
        .unwrap();

        let report = discovery.cycle().await;

        assert_eq!(report.responders, 0);
        assert_eq!(report.failures, 1);
        assert_eq!(report.added, 0);
        assert_eq!(report.unreachable, 1);
        assert_eq!(store.len(), 2);
    }
}
