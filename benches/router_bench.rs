use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use mailbox_relay::config::PROTOCOL_VERSION;
use mailbox_relay::core::codec::RequestCodec;
use mailbox_relay::core::packet::Request;
use mailbox_relay::core::payload::{encode_message_payload, encode_registration_payload};
use mailbox_relay::protocol::Router;
use tokio_util::codec::Decoder;

#[allow(clippy::unwrap_used)]
fn bench_request_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_decode");
    let content_sizes = [64usize, 4096, 65536];

    for &size in &content_sizes {
        let raw = Request::new(
            "bench-client",
            PROTOCOL_VERSION,
            603,
            encode_message_payload("bench-recipient", 3, &vec![0xAB; size]),
        )
        .to_bytes();

        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_function(format!("codec_{size}b"), |b| {
            b.iter_batched(
                || BytesMut::from(&raw[..]),
                |mut buf| {
                    let mut codec = RequestCodec::default();
                    codec.decode(&mut buf).unwrap().unwrap()
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let router = Router::default();
    let mut ids = Vec::new();
    for i in 0..100 {
        let raw = Request::new(
            "",
            PROTOCOL_VERSION,
            600,
            encode_registration_payload(&format!("user{i}"), b"key"),
        )
        .to_bytes();
        let reply = router.handle_bytes(&raw).unwrap();
        ids.push(String::from_utf8(reply[7..].to_vec()).unwrap());
    }

    let list = Request::new(&ids[0], PROTOCOL_VERSION, 601, Vec::new()).to_bytes();
    group.bench_function("list_100_users", |b| {
        b.iter(|| router.handle_bytes(&list).unwrap())
    });

    let send = Request::new(
        &ids[0],
        PROTOCOL_VERSION,
        603,
        encode_message_payload(&ids[1], 3, b"benchmark message"),
    )
    .to_bytes();
    let pull = Request::new(&ids[1], PROTOCOL_VERSION, 604, Vec::new()).to_bytes();
    group.bench_function("send_then_pull", |b| {
        b.iter(|| {
            router.handle_bytes(&send).unwrap();
            router.handle_bytes(&pull).unwrap()
        })
    });

    group.bench_function("register_duplicate", |b| {
        let raw = Request::new(
            "",
            PROTOCOL_VERSION,
            600,
            encode_registration_payload("user0", b""),
        )
        .to_bytes();
        b.iter(|| router.handle_bytes(&raw).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_request_decode, bench_dispatch);
criterion_main!(benches);
