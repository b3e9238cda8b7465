// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publish/Read Latency Benchmark
//!
//! Measures the cost of the latch hot paths:
//! - `publish()` by payload size and by number of attached subscribers
//! - `copy()` and `peek()` of the latest value
//! - `wait()` with a pending notification (no suspension)

#![allow(clippy::uninlined_format_args)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hdds_latch::{Topic, MAX_CHANNELS};
use std::hint::black_box as bb;
use std::time::Duration;

/// Publish latency by payload size, one subscriber attached
fn bench_publish_payload_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_latency_by_size");

    for size in [4, 64, 256, 1024, 4096] {
        let topic = Topic::new("bench/size", size).expect("topic creation");
        let _sub = topic.register(0).expect("register");
        let payload = vec![0xABu8; size];

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                topic.publish(0, bb(&payload)).expect("publish should succeed");
            });
        });
    }

    group.finish();
}

/// Publish latency by fan-out (subscribers on the published channel)
fn bench_publish_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_latency_by_fanout");

    for subscribers in [0usize, 1, 4, 16] {
        let topic = Topic::new("bench/fanout", 16).expect("topic creation");
        let _subs: Vec<_> = (0..subscribers)
            .map(|_| topic.register(0).expect("register"))
            .collect();
        let payload = [0x5Au8; 16];

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    topic.publish(0, bb(&payload)).expect("publish should succeed");
                });
            },
        );
    }

    group.finish();
}

/// Read-side latency: copy vs peek vs pending wait
fn bench_read_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_latency");

    let topic = Topic::new("bench/read", 64).expect("topic creation");
    let sub = topic.register(MAX_CHANNELS - 1).expect("register");
    topic
        .publish(MAX_CHANNELS - 1, &[0x11u8; 64])
        .expect("publish");

    group.bench_function("copy_64B", |b| {
        let mut out = [0u8; 64];
        b.iter(|| {
            bb(sub.copy(&mut out).expect("copy"));
        });
    });

    group.bench_function("peek_64B", |b| {
        b.iter(|| {
            bb(sub.peek(|value| value[0]));
        });
    });

    group.bench_function("has_update", |b| {
        b.iter(|| bb(sub.has_update()));
    });

    group.bench_function("publish_then_wait_ready", |b| {
        let payload = [0x22u8; 64];
        b.iter(|| {
            topic
                .publish(MAX_CHANNELS - 1, &payload)
                .expect("publish");
            bb(sub.wait(Some(Duration::ZERO)).expect("wait"));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_publish_payload_sizes,
    bench_publish_fanout,
    bench_read_paths
);
criterion_main!(benches);
