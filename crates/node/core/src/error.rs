use rumor_net_peers::PeerStoreError;
use rumor_rpc_server::ServerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("invalid node configuration: {0}")]
    Config(#[from] PeerStoreError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Server(#[from] ServerError),
}
