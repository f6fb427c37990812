//! Gossip peer discovery.
//!
//! Every cycle the [`Discovery`] engine asks each known peer for its membership
//! through the Exchange RPC, merges what it learns into the shared
//! [`PeerStore`](rumor_net_peers::PeerStore), then redials peers whose
//! connection is not ready. Outbound connections are [`PeerConnection`]
//! handles managed by the [`ConnectionManager`].

mod client;
mod connection;
mod engine;
mod manager;
mod metrics;

pub use client::{ExchangeError, exchange};
pub use connection::{DialConfig, PeerConnection};
pub use engine::{CycleReport, Discovery, DiscoveryConfig, collect_candidates};
pub use manager::{ConnectError, ConnectionManager};
pub use crate::metrics::DiscoveryMetrics;
