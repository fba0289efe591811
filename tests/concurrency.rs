#![allow(clippy::unwrap_used, clippy::expect_used)]

use mailbox_relay::config::PROTOCOL_VERSION;
use mailbox_relay::core::packet::{Request, Response};
use mailbox_relay::core::payload::{
    encode_message_payload, encode_registration_payload, parse_message_batch,
};
use mailbox_relay::protocol::Router;
use std::collections::HashSet;
use tokio::task::JoinSet;

fn call(router: &Router, client_id: &str, code: u16, payload: Vec<u8>) -> Response {
    let raw = Request::new(client_id, PROTOCOL_VERSION, code, payload).to_bytes();
    Response::from_bytes(&router.handle_bytes(&raw).unwrap()).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_registration_of_same_name_admits_one() {
    let router = Router::default();
    let mut tasks = JoinSet::new();

    for _ in 0..64 {
        let router = router.clone();
        tasks.spawn(async move {
            call(&router, "", 600, encode_registration_payload("contended", b"")).code
        });
    }

    let mut codes = Vec::new();
    while let Some(res) = tasks.join_next().await {
        codes.push(res.unwrap());
    }

    assert_eq!(codes.iter().filter(|&&c| c == 2100).count(), 1);
    assert_eq!(codes.iter().filter(|&&c| c == 9002).count(), 63);
    assert_eq!(router.directory().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_registrations_yield_distinct_ids() {
    let router = Router::default();
    let mut tasks = JoinSet::new();

    for i in 0..200 {
        let router = router.clone();
        tasks.spawn(async move {
            let resp = call(&router, "", 600, encode_registration_payload(&format!("user{i}"), b""));
            assert_eq!(resp.code, 2100);
            String::from_utf8(resp.payload).unwrap()
        });
    }

    let mut ids = HashSet::new();
    while let Some(res) = tasks.join_next().await {
        assert!(ids.insert(res.unwrap()));
    }
    assert_eq!(ids.len(), 200);
    assert_eq!(router.directory().len(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_sends_and_pulls_lose_nothing() {
    let router = Router::default();
    let recipient = {
        let resp = call(&router, "", 600, encode_registration_payload("inbox", b""));
        String::from_utf8(resp.payload).unwrap()
    };

    let senders = 8usize;
    let per_sender = 250usize;
    let mut tasks = JoinSet::new();

    for s in 0..senders {
        let router = router.clone();
        let recipient = recipient.clone();
        tasks.spawn(async move {
            for n in 0..per_sender {
                let body = format!("{s}:{n}");
                let resp = call(
                    &router,
                    &format!("sender{s}"),
                    603,
                    encode_message_payload(&recipient, 3, body.as_bytes()),
                );
                assert_eq!(resp.code, 2103);
            }
            Vec::new()
        });
    }

    // Pull while the senders are still running
    for _ in 0..4 {
        let router = router.clone();
        let recipient = recipient.clone();
        tasks.spawn(async move {
            let mut received = Vec::new();
            for _ in 0..50 {
                let resp = call(&router, &recipient, 604, Vec::new());
                received.extend(parse_message_batch(&resp.payload).unwrap());
                tokio::task::yield_now().await;
            }
            received
        });
    }

    let mut received = Vec::new();
    while let Some(res) = tasks.join_next().await {
        received.extend(res.unwrap());
    }
    let resp = call(&router, &recipient, 604, Vec::new());
    received.extend(parse_message_batch(&resp.payload).unwrap());

    assert_eq!(received.len(), senders * per_sender);

    // No message is delivered twice
    let unique: HashSet<Vec<u8>> = received.iter().map(|m| m.content.clone()).collect();
    assert_eq!(unique.len(), senders * per_sender);
    assert_eq!(router.mailbox().total_pending(), 0);
}
