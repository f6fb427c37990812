//! Wire types for the rumor discovery protocol.
//!
//! The prost/tonic output for `rumor.discovery.v1` is checked in under
//! `src/rumor.discovery.v1.rs`; enable the `codegen` feature to regenerate it.
//! Alongside the generated code this crate carries the reflection descriptor,
//! the request metadata convention used to declare the caller and conversions
//! between [`PeerRecord`] and [`rumor_net_peers::Peer`].

#[allow(unreachable_pub, clippy::all)]
mod generated {
    include!("rumor.discovery.v1.rs");
}

mod convert;
pub mod descriptor;
pub mod metadata;

pub use generated::{
    Attribute, ExchangeRequest, ExchangeResponse, PeerRecord, discovery_client,
    discovery_server,
};

/// Protobuf package of the discovery protocol.
pub const PACKAGE: &str = "rumor.discovery.v1";
