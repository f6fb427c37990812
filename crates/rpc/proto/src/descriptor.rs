//! Encoded file descriptor set for gRPC reflection, so `grpcurl` can list and
//! call the service.
//!
//! Written by `tonic-build` next to the generated code; regenerate both with
//! the `codegen` feature.

/// Descriptor set of `rumor/discovery/v1/discovery.proto`.
pub const FILE_DESCRIPTOR_SET: &[u8] = include_bytes!("discovery_descriptor.bin");
