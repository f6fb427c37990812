//! Peer model and the concurrent membership table shared by discovery and the exchange handler.

pub mod address;
pub mod peer;
pub mod state;
pub mod store;
pub mod traits;

pub use address::normalize_addr;
pub use peer::{Attributes, Peer, matches_attributes};
pub use state::ConnectionState;
pub use store::{PeerStore, PeerStoreError};
pub use traits::NetConnection;
