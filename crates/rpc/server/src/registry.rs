//! gRPC service registry.
//!
//! The [`GrpcRegistry`] collects the services a node exposes together with the
//! descriptors needed to serve reflection, then composes them into tonic routes.

use tonic::service::Routes;

use crate::error::ServerError;

/// Registry for gRPC services exposed by a node.
///
/// # Example
///
/// ```ignore
/// use rumor_rpc_server::GrpcRegistry;
///
/// let mut registry = GrpcRegistry::new();
/// registry.add_service(DiscoveryServer::new(exchange));
/// registry.add_descriptor(rumor_rpc_proto::descriptor::FILE_DESCRIPTOR_SET);
///
/// server.spawn(listener, registry)?;
/// ```
#[derive(Default)]
pub struct GrpcRegistry {
    routes: Option<Routes>,
    descriptors: Vec<&'static [u8]>,
}

impl GrpcRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a gRPC service. Services are composed into a single router.
    pub fn add_service<S>(&mut self, service: S)
    where
        S: tonic::codegen::Service<
                http::Request<tonic::body::BoxBody>,
                Response = http::Response<tonic::body::BoxBody>,
                Error = std::convert::Infallible,
            > + tonic::server::NamedService
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        self.routes = Some(match self.routes.take() {
            Some(routes) => routes.add_service(service),
            None => Routes::new(service),
        });
    }

    /// Add an encoded descriptor set served through reflection.
    pub fn add_descriptor(&mut self, descriptor: &'static [u8]) {
        self.descriptors.push(descriptor);
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_none()
    }

    pub fn descriptors(&self) -> &[&'static [u8]] {
        &self.descriptors
    }

    /// Consume the registry and return the composed routes.
    ///
    /// With `reflection` enabled and at least one descriptor registered, the v1
    /// reflection service is mounted alongside the registered services.
    pub fn into_routes(mut self, reflection: bool) -> Result<Routes, ServerError> {
        if self.routes.is_none() {
            return Err(ServerError::NoServices);
        }

        if reflection && !self.descriptors.is_empty() {
            let mut builder = tonic_reflection::server::Builder::configure();
            for descriptor in &self.descriptors {
                builder = builder.register_encoded_file_descriptor_set(descriptor);
            }
            self.add_service(builder.build_v1()?);
        }

        self.routes.ok_or(ServerError::NoServices)
    }
}

impl std::fmt::Debug for GrpcRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcRegistry")
            .field("has_routes", &self.routes.is_some())
            .field("descriptor_count", &self.descriptors.len())
            .finish()
    }
}
