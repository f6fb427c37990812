use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("gRPC server is already running")]
    AlreadyRunning,
    #[error("no gRPC services registered")]
    NoServices,
    #[error("failed to build reflection service: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),
    #[error("graceful shutdown did not complete within {0:?}")]
    ShutdownTimedOut(Duration),
    #[error("gRPC server error: {0}")]
    Serve(#[from] tonic::transport::Error),
    #[error("gRPC server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
