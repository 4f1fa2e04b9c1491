//! Throughput Benchmark for SparkKV
//!
//! This benchmark measures the keyspace and the request parser under
//! various workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sparkkv::protocol::{parse_frame, Frame};
use sparkkv::storage::StorageEngine;
use std::sync::Arc;
use std::time::Duration;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, Bytes::from("small_value"), None);
            i += 1;
        });
    });

    group.bench_function("set_1kb", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024));
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, value.clone(), None);
            i += 1;
        });
    });

    group.bench_function("set_with_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("ttl:{}", i));
            engine.set(key, Bytes::from("value"), Some(Duration::from_secs(3600)));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set(key, value, None);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{}", i));
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..10_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set(key, value, None);
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                let key = Bytes::from(format!("new:{}", i));
                engine.set(key, Bytes::from("value"), None);
            } else {
                let key = Bytes::from(format!("key:{}", i % 10_000));
                black_box(engine.get(&key));
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let engine = Arc::new(StorageEngine::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let engine = Arc::clone(&engine);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            engine.set(key.clone(), Bytes::from("value"), None);
                            engine.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(engine.len());
        });
    });

    group.finish();
}

/// Benchmark request parsing
fn bench_parse(c: &mut Criterion) {
    let set = Frame::new(
        "SET",
        vec![
            Bytes::from("user:101"),
            Bytes::from("x".repeat(256)),
            Bytes::from("PX"),
            Bytes::from("60000"),
        ],
    )
    .to_resp()
    .serialize();

    let pipeline: Vec<u8> = set.iter().copied().cycle().take(set.len() * 16).collect();

    let mut group = c.benchmark_group("parse");

    group.throughput(Throughput::Bytes(set.len() as u64));
    group.bench_function("single_set", |b| {
        b.iter(|| black_box(parse_frame(&set).unwrap()));
    });

    group.throughput(Throughput::Elements(16));
    group.bench_function("pipeline_16", |b| {
        b.iter(|| {
            let mut offset = 0;
            while let Some((frame, consumed)) = parse_frame(&pipeline[offset..]).unwrap() {
                black_box(frame);
                offset += consumed;
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_concurrent,
    bench_parse,
);

criterion_main!(benches);
