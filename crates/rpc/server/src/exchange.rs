//! Server side of the Exchange RPC.

use std::sync::Arc;

use rumor_net_peers::{NetConnection, Peer, PeerStore, PeerStoreError, normalize_addr};
use rumor_rpc_proto::discovery_server::Discovery;
use rumor_rpc_proto::{ExchangeRequest, ExchangeResponse, PeerRecord, metadata};
use tonic::{Request, Response, Status};
use tracing::{debug, info, trace};

/// Answers Exchange calls: registers the caller, then returns every known peer.
#[derive(Debug)]
pub struct ExchangeService<C: NetConnection> {
    /// Normalized listen address of the local node.
    local: String,
    store: Arc<PeerStore<C>>,
}

impl<C: NetConnection> ExchangeService<C> {
    pub fn new(local_addr: &str, store: Arc<PeerStore<C>>) -> Result<Self, PeerStoreError> {
        Ok(Self {
            local: normalize_addr(local_addr)?,
            store,
        })
    }

    /// Record the caller. Failures never fail the request.
    fn register(&self, caller: Peer) {
        match normalize_addr(caller.addr()) {
            Ok(addr) if addr == self.local => {
                trace!("ignoring exchange declared from the local address");
                return;
            }
            Ok(_) => {}
            Err(err) => {
                debug!(%err, "ignoring caller with invalid address");
                return;
            }
        }

        let addr = caller.addr().to_string();
        match self.store.add_peer(caller.clone()) {
            Ok(()) => info!(peer = %addr, "added peer"),
            Err(PeerStoreError::AlreadyExists(_)) => {
                if let Err(err) = self.store.update_peer(caller) {
                    // Removed between the two calls.
                    debug!(peer = %addr, %err, "failed to update caller");
                }
            }
            Err(err) => debug!(peer = %addr, %err, "failed to register caller"),
        }
    }
}

#[tonic::async_trait]
impl<C: NetConnection> Discovery for ExchangeService<C> {
    async fn exchange(
        &self,
        request: Request<ExchangeRequest>,
    ) -> Result<Response<ExchangeResponse>, Status> {
        let caller = metadata::caller(request.metadata())
            .ok_or_else(|| Status::invalid_argument("missing caller address metadata"))?;
        trace!(caller = caller.addr(), "exchange request");

        self.register(caller);

        let peers = self
            .store
            .get_all_peers()
            .iter()
            .map(PeerRecord::from)
            .collect();
        Ok(Response::new(ExchangeResponse { peers }))
    }
}

#[cfg(test)]
mod tests {
    use rumor_net_peers::{Attributes, ConnectionState};
    use rumor_rpc_proto::metadata::insert_caller;
    use tonic::Code;

    use super::*;

    #[derive(Debug, Clone)]
    struct ReadyConn;

    impl NetConnection for ReadyConn {
        fn state(&self) -> ConnectionState {
            ConnectionState::Ready
        }

        fn close(&self) {}
    }

    fn service() -> (ExchangeService<ReadyConn>, Arc<PeerStore<ReadyConn>>) {
        let store = Arc::new(PeerStore::new());
        let service = ExchangeService::new("127.0.0.1:9000", store.clone()).unwrap();
        (service, store)
    }

    fn request_from(peer: &Peer) -> Request<ExchangeRequest> {
        let mut request = Request::new(ExchangeRequest {});
        insert_caller(request.metadata_mut(), peer);
        request
    }

    #[tokio::test]
    async fn test_registers_caller_and_returns_snapshot() {
        let (service, store) = service();
        store
            .add_peer(Peer::new("127.0.0.1:9002", Attributes::new()))
            .unwrap();
        store
            .set_peer_connection("127.0.0.1:9002", ReadyConn)
            .unwrap();

        let caller = Peer::new("127.0.0.1:9001", Attributes::new()).with_attribute("cluster", "x");
        let response = service.exchange(request_from(&caller)).await.unwrap().into_inner();

        assert_eq!(response.peers.len(), 2);
        let known = response
            .peers
            .iter()
            .find(|p| p.address == "127.0.0.1:9002")
            .unwrap();
        assert_eq!(known.state, "READY");
        let registered = store.get_peer("127.0.0.1:9001").unwrap();
        assert_eq!(registered.attribute("cluster"), Some("x"));
    }

    #[tokio::test]
    async fn test_known_caller_attributes_are_replaced() {
        let (service, store) = service();
        store
            .add_peer(Peer::new("127.0.0.1:9001", Attributes::new()).with_attribute("cluster", "x"))
            .unwrap();

        let caller = Peer::new("127.0.0.1:9001", Attributes::new()).with_attribute("zone", "eu");
        service.exchange(request_from(&caller)).await.unwrap();

        let stored = store.get_peer("127.0.0.1:9001").unwrap();
        assert_eq!(stored.attribute("zone"), Some("eu"));
        assert_eq!(stored.attribute("cluster"), None);
    }

    #[tokio::test]
    async fn test_missing_address_is_rejected() {
        let (service, _) = service();
        let status = service
            .exchange(Request::new(ExchangeRequest {}))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_self_and_invalid_callers_are_answered_but_not_stored() {
        let (service, store) = service();

        let own = Peer::new("http://127.0.0.1:9000", Attributes::new());
        let response = service.exchange(request_from(&own)).await.unwrap().into_inner();
        assert!(response.peers.is_empty());

        let invalid = Peer::new("not a valid address", Attributes::new());
        let response = service.exchange(request_from(&invalid)).await.unwrap().into_inner();
        assert!(response.peers.is_empty());

        assert!(store.is_empty());
    }
}
