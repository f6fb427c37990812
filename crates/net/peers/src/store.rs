//! Concurrent membership table: peer metadata and connection handles keyed by normalized address.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, trace};

use crate::address::normalize_addr;
use crate::peer::{Attributes, Peer, matches_attributes};
use crate::state::ConnectionState;
use crate::traits::NetConnection;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerStoreError {
    #[error("invalid peer address: {0:?}")]
    InvalidAddress(String),
    #[error("peer not found: {0}")]
    NotFound(String),
    #[error("peer already exists: {0}")]
    AlreadyExists(String),
}

impl PeerStoreError {
    /// Errors a merge treats as "not added" rather than as a failure.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::InvalidAddress(_) | Self::AlreadyExists(_))
    }
}

/// Both maps live behind one lock so metadata and handle never disagree mid-operation.
#[derive(Debug)]
struct Tables<C> {
    peers: HashMap<String, Attributes>,
    conns: HashMap<String, C>,
}

impl<C: NetConnection> Tables<C> {
    fn snapshot(&self, addr: &str, attributes: &Attributes) -> Peer {
        let state = self
            .conns
            .get(addr)
            .map(NetConnection::state)
            .unwrap_or(ConnectionState::NoConnection);
        Peer::new(addr, attributes.clone()).with_state(state)
    }

    fn insert(&mut self, peer: Peer) -> Result<Peer, PeerStoreError> {
        let addr = normalize_addr(peer.addr())?;
        let (_, attributes) = peer.into_parts();

        match self.peers.entry(addr) {
            Entry::Occupied(entry) => Err(PeerStoreError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                let peer = Peer::new(entry.key().clone(), attributes.clone());
                entry.insert(attributes);
                Ok(peer)
            }
        }
    }

    fn require(&self, addr: &str) -> Result<(), PeerStoreError> {
        if self.peers.contains_key(addr) {
            Ok(())
        } else {
            Err(PeerStoreError::NotFound(addr.to_string()))
        }
    }
}

/// Membership table shared by the discovery loop and the exchange handler.
///
/// Every operation holds the lock only for its own duration, and every read
/// returns owned copies. Handles are kept apart from metadata so a connection can
/// be attached or detached without rebuilding the peer.
#[derive(Debug)]
pub struct PeerStore<C: NetConnection> {
    tables: RwLock<Tables<C>>,
}

impl<C: NetConnection> Default for PeerStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: NetConnection> PeerStore<C> {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                peers: HashMap::new(),
                conns: HashMap::new(),
            }),
        }
    }

    pub fn exists(&self, addr: &str) -> Result<bool, PeerStoreError> {
        let addr = normalize_addr(addr)?;
        Ok(self.tables.read().peers.contains_key(&addr))
    }

    /// Insert a peer if its address is unknown. Never overwrites.
    pub fn add_peer(&self, peer: Peer) -> Result<(), PeerStoreError> {
        let peer = self.tables.write().insert(peer)?;
        debug!(peer = %peer.addr(), "peer added to store");
        Ok(())
    }

    /// Insert many peers, returning those actually added.
    ///
    /// With `skip_errors`, unknown-address and duplicate failures are skipped;
    /// otherwise the first failure aborts the batch (earlier inserts are kept).
    pub fn add_peers(
        &self,
        peers: impl IntoIterator<Item = Peer>,
        skip_errors: bool,
    ) -> Result<Vec<Peer>, PeerStoreError> {
        let mut added = Vec::new();
        let mut tables = self.tables.write();

        for peer in peers {
            match tables.insert(peer) {
                Ok(peer) => added.push(peer),
                Err(err) if skip_errors && err.is_skippable() => {
                    trace!(%err, "skipping peer");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(added)
    }

    /// Replace the attributes of a known peer.
    pub fn update_peer(&self, peer: Peer) -> Result<(), PeerStoreError> {
        let addr = normalize_addr(peer.addr())?;
        let (_, attributes) = peer.into_parts();

        match self.tables.write().peers.get_mut(&addr) {
            Some(current) => {
                *current = attributes;
                Ok(())
            }
            None => Err(PeerStoreError::NotFound(addr)),
        }
    }

    /// Forget a peer. Any attached handle is detached and returned unclosed.
    pub fn remove_peer(&self, peer: &Peer) -> Result<Option<C>, PeerStoreError> {
        let addr = normalize_addr(peer.addr())?;
        let mut tables = self.tables.write();

        if tables.peers.remove(&addr).is_some() {
            debug!(peer = %addr, "peer removed from store");
        }
        Ok(tables.conns.remove(&addr))
    }

    pub fn get_peer(&self, addr: &str) -> Result<Peer, PeerStoreError> {
        let addr = normalize_addr(addr)?;
        let tables = self.tables.read();

        tables
            .peers
            .get(&addr)
            .map(|attributes| tables.snapshot(&addr, attributes))
            .ok_or(PeerStoreError::NotFound(addr))
    }

    pub fn get_all_peers(&self) -> Vec<Peer> {
        let tables = self.tables.read();
        tables
            .peers
            .iter()
            .map(|(addr, attributes)| tables.snapshot(addr, attributes))
            .collect()
    }

    pub fn get_peers_with_attributes(&self, filter: &Attributes) -> Vec<Peer> {
        let tables = self.tables.read();
        tables
            .peers
            .iter()
            .filter(|(_, attributes)| matches_attributes(attributes, filter))
            .map(|(addr, attributes)| tables.snapshot(addr, attributes))
            .collect()
    }

    pub fn get_peer_connection(&self, addr: &str) -> Result<Option<C>, PeerStoreError> {
        let addr = normalize_addr(addr)?;
        let tables = self.tables.read();
        tables.require(&addr)?;
        Ok(tables.conns.get(&addr).cloned())
    }

    /// Attach a handle, returning the displaced one. The displaced handle is not closed.
    pub fn set_peer_connection(&self, addr: &str, conn: C) -> Result<Option<C>, PeerStoreError> {
        let addr = normalize_addr(addr)?;
        let mut tables = self.tables.write();
        tables.require(&addr)?;
        Ok(tables.conns.insert(addr, conn))
    }

    /// Detach the handle for `addr`, leaving the peer in `NoConnection`.
    pub fn take_peer_connection(&self, addr: &str) -> Result<Option<C>, PeerStoreError> {
        let addr = normalize_addr(addr)?;
        let mut tables = self.tables.write();
        tables.require(&addr)?;
        Ok(tables.conns.remove(&addr))
    }

    /// Return the peer's handle if it is `Ready`, otherwise close the stale handle,
    /// dial a new one and attach it.
    ///
    /// The whole sequence runs under the write lock, so concurrent callers never both
    /// dial the same peer. `dial` receives the normalized address and must not block.
    pub fn connect_with<F, E>(&self, addr: &str, dial: F) -> Result<C, E>
    where
        F: FnOnce(&str) -> Result<C, E>,
        E: From<PeerStoreError>,
    {
        let addr = normalize_addr(addr)?;
        let mut tables = self.tables.write();
        tables.require(&addr)?;

        if let Some(conn) = tables.conns.get(&addr) {
            if conn.is_ready() {
                return Ok(conn.clone());
            }
        }
        if let Some(stale) = tables.conns.remove(&addr) {
            trace!(peer = %addr, state = %stale.state(), "closing stale connection");
            stale.close();
        }

        let conn = dial(&addr)?;
        tables.conns.insert(addr, conn.clone());
        Ok(conn)
    }

    pub fn len(&self) -> usize {
        self.tables.read().peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().peers.is_empty()
    }
}
