//! Graceful shutdown of the gRPC server on a loopback listener.

use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use rumor_rpc_proto::discovery_client::DiscoveryClient;
use rumor_rpc_proto::discovery_server::{Discovery, DiscoveryServer};
use rumor_rpc_proto::{ExchangeRequest, ExchangeResponse};
use rumor_rpc_server::{GrpcRegistry, GrpcServer, GrpcServerConfig, ServerError};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tonic::{Request, Response, Status};

/// Handler that signals entry and then takes `delay` to answer.
struct Delayed {
    entered: Arc<Notify>,
    delay: Duration,
}

#[tonic::async_trait]
impl Discovery for Delayed {
    async fn exchange(
        &self,
        _request: Request<ExchangeRequest>,
    ) -> Result<Response<ExchangeResponse>, Status> {
        self.entered.notify_one();
        tokio::time::sleep(self.delay).await;
        Ok(Response::new(ExchangeResponse { peers: Vec::new() }))
    }
}

async fn start(delay: Duration, grace: Duration) -> (GrpcServer, String, Arc<Notify>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let entered = Arc::new(Notify::new());

    let mut registry = GrpcRegistry::new();
    registry.add_service(DiscoveryServer::new(Delayed {
        entered: entered.clone(),
        delay,
    }));
    registry.add_descriptor(rumor_rpc_proto::descriptor::FILE_DESCRIPTOR_SET);

    let server = GrpcServer::new(GrpcServerConfig {
        shutdown_grace: grace,
        reflection: true,
    });
    server.spawn(listener, registry).unwrap();

    (server, addr, entered)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_drains_idle_server() {
    let (server, addr, _) = start(Duration::ZERO, Duration::from_secs(5)).await;

    let mut client = DiscoveryClient::connect(format!("http://{addr}")).await.unwrap();
    let response = client.exchange(ExchangeRequest {}).await.unwrap();
    assert!(response.into_inner().peers.is_empty());
    drop(client);

    let started = Instant::now();
    server.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!server.is_running());

    // Second stop is a no-op.
    server.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_times_out_with_stalled_call() {
    let grace = Duration::from_millis(300);
    let (server, addr, entered) = start(Duration::from_secs(60), grace).await;

    let target = format!("http://{addr}");
    let call = tokio::spawn(async move {
        let mut client = DiscoveryClient::connect(target).await.unwrap();
        client.exchange(ExchangeRequest {}).await
    });
    entered.notified().await;

    let started = Instant::now();
    let result = server.stop().await;
    let elapsed = started.elapsed();

    assert_matches!(result, Err(ServerError::ShutdownTimedOut(d)) if d == grace);
    assert!(elapsed >= grace);
    assert!(elapsed < Duration::from_secs(5));

    // The listener is closed once stop returns.
    assert!(TcpStream::connect(&addr).await.is_err());

    // The stalled call is cut off instead of answering after the stop.
    let outcome = tokio::time::timeout(Duration::from_secs(5), call)
        .await
        .expect("in-flight call still running after forced stop")
        .unwrap();
    assert!(outcome.is_err());
}

#[tokio::test]
async fn test_spawn_twice_is_rejected() {
    let (server, _, _) = start(Duration::ZERO, Duration::from_secs(1)).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut registry = GrpcRegistry::new();
    registry.add_service(DiscoveryServer::new(Delayed {
        entered: Arc::new(Notify::new()),
        delay: Duration::ZERO,
    }));

    assert_matches!(
        server.spawn(listener, registry),
        Err(ServerError::AlreadyRunning)
    );
    server.stop().await.unwrap();
}
