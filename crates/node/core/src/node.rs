//! Node lifecycle.

use std::sync::Arc;

use parking_lot::Mutex;
use rumor_discovery::{ConnectionManager, Discovery, PeerConnection};
use rumor_net_peers::{
    Attributes, ConnectionState, Peer, PeerStore, PeerStoreError, normalize_addr,
};
use rumor_rpc_proto::descriptor;
use rumor_rpc_proto::discovery_server::DiscoveryServer;
use rumor_rpc_server::{ExchangeService, GrpcRegistry, GrpcServer};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::NodeError;
use crate::config::NodeConfig;
use crate::constants::CLUSTER_ATTRIBUTE;

/// A participant of the overlay: peer store, Exchange server and discovery loop.
#[derive(Debug)]
pub struct Node {
    config: NodeConfig,
    local: Peer,
    store: Arc<PeerStore<PeerConnection>>,
    connections: Arc<ConnectionManager>,
    discovery: Arc<Discovery>,
    server: GrpcServer,
    shutdown: CancellationToken,
    discovery_task: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    /// Build a node from its configuration and seed the store with the bootstrap peers.
    ///
    /// Bootstrap entries that are malformed or point at the node itself are skipped.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let declared = config.local.to_peer();
        let addr = normalize_addr(declared.addr())?;
        let (_, attributes) = declared.into_parts();
        let local = Peer::new(addr.clone(), attributes);

        let store = Arc::new(PeerStore::new());
        for entry in &config.bootstrap {
            let peer = entry.to_peer();
            match normalize_addr(peer.addr()) {
                Ok(bootstrap) if bootstrap == addr => {
                    debug!(peer = %bootstrap, "skipping bootstrap entry for the local address");
                }
                Ok(_) => match store.add_peer(peer) {
                    Ok(()) | Err(PeerStoreError::AlreadyExists(_)) => {}
                    Err(err) => warn!(%err, "skipping bootstrap peer"),
                },
                Err(err) => warn!(%err, "skipping bootstrap peer"),
            }
        }

        let connections = Arc::new(ConnectionManager::new(
            &addr,
            store.clone(),
            config.discovery.dial_config(),
        )?);
        let discovery = Arc::new(Discovery::new(
            local.clone(),
            connections.clone(),
            (&config.discovery).into(),
        )?);
        let server = GrpcServer::new((&config.server).into());

        Ok(Self {
            config,
            local,
            store,
            connections,
            discovery,
            server,
            shutdown: CancellationToken::new(),
            discovery_task: Mutex::new(None),
        })
    }

    /// Bind the configured address and serve until `cancel` fires, then stop.
    pub async fn start(&self, cancel: CancellationToken) -> Result<(), NodeError> {
        let listener = TcpListener::bind(self.local.addr())
            .await
            .map_err(|source| NodeError::Bind {
                addr: self.local.addr().to_string(),
                source,
            })?;
        self.serve(listener, cancel).await
    }

    /// Serve on a pre-bound listener until `cancel` fires or [`Node::stop`] is called.
    pub async fn serve(&self, listener: TcpListener, cancel: CancellationToken) -> Result<(), NodeError> {
        self.spawn(listener)?;

        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = self.shutdown.cancelled() => {}
        }

        self.stop().await
    }

    /// Start the Exchange server on `listener` and, if enabled, the discovery loop.
    /// Returns once both run in the background.
    pub fn spawn(&self, listener: TcpListener) -> Result<(), NodeError> {
        let exchange = ExchangeService::new(self.local.addr(), self.store.clone())?;

        let mut registry = GrpcRegistry::new();
        registry.add_service(DiscoveryServer::new(exchange));
        registry.add_descriptor(descriptor::FILE_DESCRIPTOR_SET);
        self.server.spawn(listener, registry)?;

        if self.config.discovery.enabled {
            let discovery = self.discovery.clone();
            let cancel = self.shutdown.child_token();
            *self.discovery_task.lock() = Some(tokio::spawn(async move {
                discovery.run(cancel).await;
            }));
        }

        info!(addr = %self.local.addr(), peers = self.store.len(), "node started");
        Ok(())
    }

    /// Stop discovery, close outbound connections and drain the server.
    ///
    /// A discovery cycle already running is not awaited. It finishes in the
    /// background and can no longer dial. Idempotent. Returns `ShutdownTimedOut`
    /// when in-flight calls outlive the grace period.
    pub async fn stop(&self) -> Result<(), NodeError> {
        self.shutdown.cancel();

        if let Some(task) = self.discovery_task.lock().take() {
            if !task.is_finished() {
                debug!("leaving the running discovery cycle to finish");
            }
        }

        if let Err(err) = self.connections.close() {
            warn!(%err, "failed to close some connections");
        }

        self.server.stop().await?;
        info!(addr = %self.local.addr(), "node stopped");
        Ok(())
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// The local peer with its normalized address.
    pub fn local(&self) -> &Peer {
        &self.local
    }

    pub fn peers(&self) -> &Arc<PeerStore<PeerConnection>> {
        &self.store
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn discovery(&self) -> &Arc<Discovery> {
        &self.discovery
    }

    /// Known peers sharing the local node's cluster. Empty when the node has none.
    pub fn cluster_peers(&self) -> Vec<Peer> {
        let Some(cluster) = self.local.attribute(CLUSTER_ATTRIBUTE) else {
            return Vec::new();
        };
        let filter = Attributes::from([(CLUSTER_ATTRIBUTE.to_string(), cluster.to_string())]);
        self.store.get_peers_with_attributes(&filter)
    }

    pub fn peer_state(&self, addr: &str) -> Result<ConnectionState, PeerStoreError> {
        self.connections.state(addr)
    }
}
