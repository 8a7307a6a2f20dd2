use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use tsch_int::coap::{
    Code, Message, MessageType, parse, parse_with_telemetry, serialize, serialize_with_telemetry,
};

fn sample_message(payload_len: usize) -> Message {
    let mut msg = Message::new(MessageType::Con, Code::POST, 0x1234);
    msg.set_token(&[0xA1, 0xB2, 0xC3, 0xD4]);
    msg.set_uri_path("sensors/temp");
    msg.set_content_format(0);
    msg.set_uri_query("unit=c");
    msg.set_payload(vec![0x42u8; payload_len]);
    msg
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    // Header only
    let empty = Message::new(MessageType::Ack, Code::EMPTY, 7);
    group.bench_function("serialize_empty_ack", |b| {
        b.iter(|| black_box(serialize(&empty).unwrap()));
    });

    // Options plus a full chunk
    let full = sample_message(64);
    group.throughput(Throughput::Bytes(64));
    group.bench_function("serialize_64b", |b| {
        b.iter(|| black_box(serialize(&full).unwrap()));
    });

    // Piggybacked telemetry
    let reading = sample_message(16);
    let records = [0x5Au8; 30];
    group.throughput(Throughput::Bytes(46));
    group.bench_function("serialize_with_telemetry", |b| {
        b.iter(|| black_box(serialize_with_telemetry(&reading, &records).unwrap()));
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let encoded = serialize(&sample_message(64)).unwrap();
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("parse_64b", |b| {
        b.iter(|| black_box(parse(&encoded).unwrap()));
    });

    let piggybacked = serialize_with_telemetry(&sample_message(16), &[0x5Au8; 30]).unwrap();
    group.throughput(Throughput::Bytes(piggybacked.len() as u64));
    group.bench_function("parse_with_telemetry", |b| {
        b.iter(|| black_box(parse_with_telemetry(&piggybacked).unwrap()));
    });

    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let msg = sample_message(32);
    group.throughput(Throughput::Bytes(32));
    group.bench_function("roundtrip_32b", |b| {
        b.iter(|| {
            let encoded = serialize(&msg).unwrap();
            black_box(parse(&encoded).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_serialize, bench_parse, bench_roundtrip);
criterion_main!(benches);
