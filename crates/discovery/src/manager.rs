//! Connection lifecycle on top of the peer store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rumor_net_peers::{
    ConnectionState, NetConnection, PeerStore, PeerStoreError, normalize_addr,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::connection::{DialConfig, PeerConnection};
use crate::metrics::DiscoveryMetrics;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("refusing to connect to own address {0}")]
    ConnectSelf(String),
    #[error("connection manager is closed")]
    Closed,
    #[error(transparent)]
    Store(#[from] PeerStoreError),
    #[error("cannot create connection to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },
}

/// Opens, reuses and closes outbound connections to known peers.
///
/// Handles are owned by the [`PeerStore`]; the manager only decides when to
/// dial and when to close.
#[derive(Debug)]
pub struct ConnectionManager {
    local: String,
    store: Arc<PeerStore<PeerConnection>>,
    dial: DialConfig,
    closed: AtomicBool,
    metrics: DiscoveryMetrics,
}

impl ConnectionManager {
    pub fn new(
        local_addr: &str,
        store: Arc<PeerStore<PeerConnection>>,
        dial: DialConfig,
    ) -> Result<Self, PeerStoreError> {
        Ok(Self {
            local: normalize_addr(local_addr)?,
            store,
            dial,
            closed: AtomicBool::new(false),
            metrics: DiscoveryMetrics::default(),
        })
    }

    /// Normalized address of the local node.
    pub fn local_addr(&self) -> &str {
        &self.local
    }

    pub fn store(&self) -> &Arc<PeerStore<PeerConnection>> {
        &self.store
    }

    /// Return a connection to a known peer.
    ///
    /// A `Ready` handle is reused. Anything else is replaced by a fresh
    /// non-blocking dial, recorded in the store before the handshake finishes.
    /// Fails with [`ConnectError::Closed`] once [`ConnectionManager::close`] ran.
    pub fn connect(&self, addr: &str) -> Result<PeerConnection, ConnectError> {
        let addr = normalize_addr(addr)?;
        if addr == self.local {
            return Err(ConnectError::ConnectSelf(addr));
        }

        self.store.connect_with(&addr, |addr| {
            // Checked under the store lock so no dial lands after the close sweep.
            if self.closed.load(Ordering::SeqCst) {
                return Err(ConnectError::Closed);
            }
            debug!(peer = %addr, "dialing peer");
            self.metrics.dials_total.increment(1);
            PeerConnection::dial(addr, &self.dial).map_err(|source| ConnectError::Connection {
                addr: addr.to_string(),
                source,
            })
        })
    }

    /// Close and forget the peer's connection. No-op when already disconnected.
    pub fn disconnect(&self, addr: &str) -> Result<(), ConnectError> {
        if let Some(conn) = self.store.take_peer_connection(addr)? {
            debug!(peer = %conn.addr(), id = conn.id(), "closing connection");
            conn.close();
        }
        Ok(())
    }

    /// Disconnect every peer. All peers are attempted; the first failure is returned.
    pub fn disconnect_all(&self) -> Result<(), ConnectError> {
        let mut first_err = None;

        for peer in self.store.get_all_peers() {
            match self.disconnect(peer.addr()) {
                Ok(()) => {}
                // Removed concurrently, nothing left to close.
                Err(ConnectError::Store(PeerStoreError::NotFound(_))) => {}
                Err(err) => {
                    warn!(peer = %peer.addr(), %err, "failed to disconnect peer");
                    first_err.get_or_insert(err);
                }
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    /// Refuse further dials and disconnect every peer.
    ///
    /// A discovery cycle still running afterwards can no longer open connections.
    pub fn close(&self) -> Result<(), ConnectError> {
        self.closed.store(true, Ordering::SeqCst);
        self.disconnect_all()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn state(&self, addr: &str) -> Result<ConnectionState, PeerStoreError> {
        self.store.get_peer(addr).map(|peer| peer.state())
    }
}
