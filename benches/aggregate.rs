use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use brc_aggregate::testing::{generate, Unresident};
use brc_aggregate::{aggregate, parse_tenths, ValueFormat};

fn bench_parse(c: &mut Criterion) {
    let values: [&[u8]; 4] = [b"-12.3", b"5.1", b"99.9", b"-0.4"];
    c.bench_function("parse_tenths", |b| {
        b.iter(|| {
            for v in &values {
                black_box(parse_tenths(black_box(v), ValueFormat::Standard).ok());
            }
        })
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let data = generate(1_000_000, 400, 42);
    let len = data.len() as u64;
    let mut group = c.benchmark_group("aggregate");
    group.throughput(Throughput::Bytes(len));
    group.sample_size(10);
    for workers in [1, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("resident", workers), &workers, |b, &w| {
            b.iter(|| aggregate(&data[..], len, w).unwrap().len())
        });
        group.bench_with_input(BenchmarkId::new("positional", workers), &workers, |b, &w| {
            let source = Unresident(&data);
            b.iter(|| aggregate(&source, len, w).unwrap().len())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_aggregate);
criterion_main!(benches);
