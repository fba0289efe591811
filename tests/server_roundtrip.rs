//! End-to-end tests over real TCP connections

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mailbox_relay::config::{ServerConfig, PROTOCOL_VERSION};
use mailbox_relay::core::packet::{Request, RequestHeader};
use mailbox_relay::core::payload::{
    encode_message_payload, encode_registration_payload, parse_message_batch, parse_user_list,
};
use mailbox_relay::protocol::Router;
use mailbox_relay::transport;
use mailbox_relay::utils::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct TestServer {
    addr: String,
    metrics: Arc<Metrics>,
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let metrics = Arc::new(Metrics::new());
        let (shutdown, shutdown_rx) = mpsc::channel(1);

        let config = ServerConfig {
            max_request_size: 4096,
            shutdown_timeout: Duration::from_secs(2),
            ..ServerConfig::default()
        };
        let server_metrics = metrics.clone();
        let handle = tokio::spawn(async move {
            transport::serve(listener, &config, router, server_metrics, shutdown_rx)
                .await
                .unwrap();
        });

        Self { addr, metrics, shutdown, handle }
    }

    async fn stop(self) {
        self.shutdown.send(()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server stops within the timeout")
            .unwrap();
    }
}

async fn register(addr: &str, username: &str) -> String {
    let request = Request::new(
        "",
        PROTOCOL_VERSION,
        600,
        encode_registration_payload(username, b"pk"),
    );
    let response = transport::request(addr, &request).await.unwrap().expect("reply");
    assert_eq!(response.code, 2100);
    String::from_utf8(response.payload).unwrap()
}

#[tokio::test]
async fn test_register_send_pull_over_tcp() {
    let server = TestServer::start(Router::default()).await;

    let alice = register(&server.addr, "alice").await;
    let bob = register(&server.addr, "bob").await;

    let list = Request::new(&alice, PROTOCOL_VERSION, 601, Vec::new());
    let response = transport::request(&server.addr, &list).await.unwrap().unwrap();
    assert_eq!(response.code, 2101);
    assert_eq!(response.version, PROTOCOL_VERSION);
    let users = parse_user_list(&response.payload).unwrap();
    assert_eq!(users, vec![(bob.clone(), "bob".to_string())]);

    let send = Request::new(
        &alice,
        PROTOCOL_VERSION,
        603,
        encode_message_payload(&bob, 3, b"hello bob"),
    );
    let response = transport::request(&server.addr, &send).await.unwrap().unwrap();
    assert_eq!(response.code, 2103);

    let pull = Request::new(&bob, PROTOCOL_VERSION, 604, Vec::new());
    let response = transport::request(&server.addr, &pull).await.unwrap().unwrap();
    assert_eq!(response.code, 2104);
    let messages = parse_message_batch(&response.payload).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_id, alice);
    assert_eq!(messages[0].content, b"hello bob");

    let response = transport::request(&server.addr, &pull).await.unwrap().unwrap();
    assert_eq!(response.code, 2104);
    assert!(response.payload.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_failures_are_answered() {
    let server = TestServer::start(Router::default()).await;
    register(&server.addr, "carol").await;

    let duplicate = Request::new("", PROTOCOL_VERSION, 600, encode_registration_payload("carol", b""));
    let response = transport::request(&server.addr, &duplicate).await.unwrap().unwrap();
    assert_eq!(response.code, 9002);

    let unknown = Request::new("", PROTOCOL_VERSION, 777, Vec::new());
    let response = transport::request(&server.addr, &unknown).await.unwrap().unwrap();
    assert_eq!(response.code, 9000);

    server.stop().await;
}

#[tokio::test]
async fn test_short_header_gets_no_reply() {
    let server = TestServer::start(Router::default()).await;

    let mut stream = TcpStream::connect(&server.addr).await.unwrap();
    stream.write_all(&[0u8; 10]).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    assert!(reply.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_request_is_dropped() {
    let server = TestServer::start(Router::default()).await;

    let mut stream = TcpStream::connect(&server.addr).await.unwrap();
    let header = RequestHeader::new("big", PROTOCOL_VERSION, 603, 1_000_000);
    stream.write_all(&header.to_bytes()).await.unwrap();

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    assert!(reply.is_empty());

    // The server keeps serving after dropping a bad connection
    register(&server.addr, "dave").await;

    let snapshot = server.metrics.snapshot();
    assert_eq!(snapshot.decode_errors, 1);
    assert_eq!(snapshot.registrations, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_shared_router_state_is_visible() {
    let router = Router::default();
    let server = TestServer::start(router.clone()).await;

    let erin = register(&server.addr, "erin").await;
    let frank = register(&server.addr, "frank").await;
    let send = Request::new(&frank, PROTOCOL_VERSION, 603, encode_message_payload(&erin, 1, b""));
    transport::request(&server.addr, &send).await.unwrap().unwrap();

    assert_eq!(router.directory().len(), 2);
    assert_eq!(router.mailbox().pending(&erin), 1);

    server.stop().await;
}
