// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev
//
// Container and codec hot-path benchmarks.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use valise::{Container, Value};

fn twenty_field_container() -> Container {
    let c = Container::builder()
        .source("bench-src", "s")
        .target("bench-dst", "d")
        .message_type("bench")
        .version("1")
        .build()
        .expect("builder should assemble");
    for i in 0..20i64 {
        c.set(&format!("num_{i}"), i).expect("set should succeed");
    }
    c.set("text", "benchmark payload with some length to it")
        .expect("set should succeed");
    c
}

fn bench_container_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("container");

    group.bench_function("set_replace", |b| {
        let container = Container::new();
        container.set("key", 0i64).expect("set should succeed");
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            container.set("key", i).expect("set should succeed");
        });
    });

    group.bench_function("get_cached", |b| {
        let container = twenty_field_container();
        b.iter(|| black_box(container.get::<i64>("num_7").expect("get should succeed")));
    });

    group.bench_function("snapshot_read", |b| {
        let container = twenty_field_container();
        b.iter(|| {
            let snapshot = container.snapshot_reader();
            black_box(snapshot.get_typed::<i64>("num_7").expect("read should succeed"))
        });
    });

    group.bench_function("bulk_insert_100", |b| {
        b.iter(|| {
            let container = Container::new();
            let batch: Vec<Value> = (0..100i64)
                .map(|i| Value::new(format!("k{i}"), i))
                .collect();
            container.bulk_insert(batch).expect("bulk insert should succeed");
            black_box(container.len())
        });
    });

    group.bench_function("per_element_insert_100", |b| {
        b.iter(|| {
            let container = Container::new();
            for i in 0..100i64 {
                container.set(&format!("k{i}"), i).expect("set should succeed");
            }
            black_box(container.len())
        });
    });

    group.finish();
}

fn bench_codecs(c: &mut Criterion) {
    let container = twenty_field_container();
    let binary = container.to_bytes().expect("encode should succeed");
    let json = container.to_json().expect("encode should succeed");
    let packed = container.to_msgpack().expect("encode should succeed");

    let mut group = c.benchmark_group("codec");
    group.bench_function("binary_encode", |b| {
        b.iter(|| black_box(container.to_bytes().expect("encode should succeed")));
    });
    group.bench_function("binary_decode", |b| {
        b.iter(|| black_box(Container::from_bytes(&binary).expect("decode should succeed")));
    });
    group.bench_function("json_encode", |b| {
        b.iter(|| black_box(container.to_json().expect("encode should succeed")));
    });
    group.bench_function("json_decode", |b| {
        b.iter(|| black_box(Container::from_json(&json).expect("decode should succeed")));
    });
    group.bench_function("msgpack_encode", |b| {
        b.iter(|| black_box(container.to_msgpack().expect("encode should succeed")));
    });
    group.bench_function("msgpack_decode", |b| {
        b.iter(|| black_box(Container::from_msgpack(&packed).expect("decode should succeed")));
    });
    group.bench_function("view_lookup", |b| {
        b.iter(|| {
            let view = valise::codec::view::parse_view(&binary).expect("parse_view should succeed");
            black_box(view.get_view("num_7").and_then(|v| v.as_i64()))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_container_ops, bench_codecs);
criterion_main!(benches);
