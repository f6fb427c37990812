//! gRPC server lifecycle: spawn on a bound listener, drain on stop.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::{info, warn};

use crate::error::ServerError;
use crate::registry::GrpcRegistry;
use crate::stream::SeverableStream;

/// Default time in-flight calls get to finish once shutdown starts.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct GrpcServerConfig {
    /// How long `stop` waits for in-flight calls before aborting the server.
    pub shutdown_grace: Duration,
    /// Mount the reflection service for registered descriptors.
    pub reflection: bool,
}

impl Default for GrpcServerConfig {
    fn default() -> Self {
        Self {
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            reflection: true,
        }
    }
}

/// A spawned server and the token that severs its accepted connections.
#[derive(Debug)]
struct Running {
    task: JoinHandle<Result<(), tonic::transport::Error>>,
    sever: CancellationToken,
}

/// gRPC server serving a [`GrpcRegistry`] on a pre-bound listener.
#[derive(Debug)]
pub struct GrpcServer {
    config: GrpcServerConfig,
    shutdown_tx: watch::Sender<bool>,
    running: Mutex<Option<Running>>,
}

impl Default for GrpcServer {
    fn default() -> Self {
        Self::new(GrpcServerConfig::default())
    }
}

impl GrpcServer {
    pub fn new(config: GrpcServerConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            shutdown_tx,
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &GrpcServerConfig {
        &self.config
    }

    /// Start serving on `listener` in a background task.
    pub fn spawn(&self, listener: TcpListener, registry: GrpcRegistry) -> Result<(), ServerError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let routes = registry.into_routes(self.config.reflection)?;
        let addr = listener.local_addr().ok();
        let sever = CancellationToken::new();
        let incoming = {
            let sever = sever.clone();
            TcpListenerStream::new(listener)
                .map(move |conn| conn.map(|stream| SeverableStream::new(stream, sever.clone())))
        };

        self.shutdown_tx.send_replace(false);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(?addr, "starting gRPC server");
        let task = tokio::spawn(async move {
            Server::builder()
                .add_routes(routes)
                .serve_with_incoming_shutdown(incoming, async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await
        });
        *running = Some(Running { task, sever });

        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Stop accepting calls and wait for in-flight ones to drain.
    ///
    /// When the drain exceeds the grace period every accepted connection is
    /// severed, failing the calls still in flight, the server task is aborted
    /// and [`ServerError::ShutdownTimedOut`] is returned. The listener is closed
    /// on return. Stopping a server that is not running is a no-op.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let Some(Running { mut task, sever }) = self.running.lock().take() else {
            return Ok(());
        };

        info!("stopping gRPC server");
        self.shutdown_tx.send_replace(true);

        let grace = self.config.shutdown_grace;
        match tokio::time::timeout(grace, &mut task).await {
            Ok(result) => {
                result??;
                info!("gRPC server stopped");
                Ok(())
            }
            Err(_) => {
                warn!(?grace, "graceful shutdown timed out, forcing stop");
                sever.cancel();
                task.abort();
                // Wait for the aborted task so the listener is gone on return.
                let _ = task.await;
                Err(ServerError::ShutdownTimedOut(grace))
            }
        }
    }
}
