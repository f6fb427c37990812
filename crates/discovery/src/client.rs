//! Client side of the Exchange RPC.

use std::time::Duration;

use rumor_net_peers::{ConnectionState, NetConnection, Peer};
use rumor_rpc_proto::discovery_client::DiscoveryClient;
use rumor_rpc_proto::{ExchangeRequest, metadata};
use thiserror::Error;
use tonic::{Code, Request, Status};
use tracing::trace;

use crate::connection::PeerConnection;
use crate::manager::ConnectError;

/// A failed exchange with one peer. Contributes nothing to the cycle.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error("peer {addr} not ready within {timeout:?} (state {state})")]
    NotReady {
        addr: String,
        timeout: Duration,
        state: ConnectionState,
    },
    #[error("exchange with {addr} failed: {status}")]
    Rpc { addr: String, status: Status },
}

/// Ask the peer behind `conn` for its known peers, declaring `local` as the caller.
///
/// Waits up to `timeout` for the connection to become ready, and bounds the
/// call itself by the same timeout.
pub async fn exchange(
    conn: &PeerConnection,
    local: &Peer,
    timeout: Duration,
) -> Result<Vec<Peer>, ExchangeError> {
    let channel = conn
        .ready(timeout)
        .await
        .ok_or_else(|| ExchangeError::NotReady {
            addr: conn.addr().to_string(),
            timeout,
            state: conn.state(),
        })?;

    let mut request = Request::new(ExchangeRequest {});
    request.set_timeout(timeout);
    metadata::insert_caller(request.metadata_mut(), local);

    let response = DiscoveryClient::new(channel)
        .exchange(request)
        .await
        .map_err(|status| {
            if status.code() == Code::Unavailable {
                conn.mark_failed();
            }
            ExchangeError::Rpc {
                addr: conn.addr().to_string(),
                status,
            }
        })?;

    let peers: Vec<Peer> = response.into_inner().peers.into_iter().map(Peer::from).collect();
    trace!(peer = conn.addr(), count = peers.len(), "exchange complete");
    Ok(peers)
}
