//! Node start and stop on loopback.

use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use rumor_node_core::config::{NodeConfig, PeerEntry};
use rumor_node_core::{Node, NodeError};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

fn config(addr: &str) -> NodeConfig {
    let mut config = NodeConfig {
        local: PeerEntry::new(addr),
        ..Default::default()
    };
    config.discovery.interval_ms = 50;
    config.server.shutdown_grace_ms = 2_000;
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_stops_serving_node() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let node = std::sync::Arc::new(Node::new(config(&addr)).unwrap());
    let cancel = CancellationToken::new();

    let serving = tokio::spawn({
        let node = node.clone();
        let cancel = cancel.clone();
        async move { node.serve(listener, cancel).await }
    });

    // Accepting connections while running.
    TcpStream::connect(&addr).await.unwrap();

    let started = Instant::now();
    cancel.cancel();
    serving.await.unwrap().unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));

    assert!(TcpStream::connect(&addr).await.is_err());

    // Stopping again is a no-op.
    node.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_unblocks_serve() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let node = std::sync::Arc::new(Node::new(config(&addr)).unwrap());

    let serving = tokio::spawn({
        let node = node.clone();
        async move { node.serve(listener, CancellationToken::new()).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    node.stop().await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_start_fails_when_address_in_use() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap().to_string();
    let node = Node::new(config(&addr)).unwrap();

    let result = node.start(CancellationToken::new()).await;
    assert_matches!(result, Err(NodeError::Bind { addr: bound, .. }) if bound == addr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_does_not_wait_for_stalled_discovery() {
    // Accepts TCP but never speaks HTTP/2, so every exchange with it stalls.
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let silent_addr = silent.local_addr().unwrap().to_string();
    let accepting = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = silent.accept().await {
            held.push(stream);
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let node = Node::new(NodeConfig {
        local: PeerEntry::new(addr.clone()),
        bootstrap: vec![PeerEntry::new(silent_addr.clone())],
        ..Default::default()
    })
    .unwrap();
    node.spawn(listener).unwrap();

    // Let the first cycle get stuck on the silent peer.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    node.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    assert!(TcpStream::connect(&addr).await.is_err());
    assert!(node.connections().is_closed());
    assert_eq!(
        node.peer_state(&silent_addr).unwrap(),
        rumor_net_peers::ConnectionState::NoConnection
    );

    accepting.abort();
}
