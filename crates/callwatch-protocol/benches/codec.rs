//! Codec benchmarks for callwatch-protocol.

use callwatch_protocol::{codec, ClientMessage};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn bench_decode_progress(c: &mut Criterion) {
    let text = format!(
        r#"{{"type":"transcription_progress","call_id":"3f2b9c1e-7d4a-4b8e-9f0a-1c2d3e4f5a6b","progress":42.5,"text":"{}"}}"#,
        "x".repeat(256)
    );

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("progress_256B", |b| {
        b.iter(|| codec::decode(black_box(&text)))
    });
    group.finish();
}

fn bench_decode_unknown(c: &mut Criterion) {
    let text = r#"{"type":"queue_position","position":3,"eta_seconds":120}"#;

    c.bench_function("decode_unknown", |b| {
        b.iter(|| codec::decode(black_box(text)))
    });
}

fn bench_encode_ping(c: &mut Criterion) {
    c.bench_function("encode_ping", |b| {
        b.iter(|| codec::encode(black_box(&ClientMessage::Ping)))
    });
}

criterion_group!(
    benches,
    bench_decode_progress,
    bench_decode_unknown,
    bench_encode_ping
);
criterion_main!(benches);
