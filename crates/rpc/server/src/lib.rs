//! gRPC server for rumor nodes.
//!
//! This crate provides:
//!
//! - [`GrpcRegistry`]: composition of the services a node exposes
//! - [`GrpcServer`]: serving on a bound listener with a bounded graceful drain
//! - [`ExchangeService`]: the server role of the discovery Exchange RPC
//!
//! # Usage
//!
//! ```ignore
//! use rumor_rpc_server::{ExchangeService, GrpcRegistry, GrpcServer, GrpcServerConfig};
//!
//! let mut registry = GrpcRegistry::new();
//! registry.add_service(DiscoveryServer::new(ExchangeService::new(addr, store)?));
//! registry.add_descriptor(rumor_rpc_proto::descriptor::FILE_DESCRIPTOR_SET);
//!
//! let server = GrpcServer::new(GrpcServerConfig::default());
//! server.spawn(listener, registry)?;
//! // ...
//! server.stop().await?;
//! ```

mod error;
mod exchange;
mod registry;
mod server;
mod stream;

pub use error::ServerError;
pub use exchange::ExchangeService;
pub use registry::GrpcRegistry;
pub use server::{DEFAULT_SHUTDOWN_GRACE, GrpcServer, GrpcServerConfig};
pub use stream::SeverableStream;
