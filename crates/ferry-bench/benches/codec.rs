//! Column codec benchmarks.
//!
//! Benchmarks for:
//! - Sample vs strict classification
//! - Encoding byte and object columns
//! - Sniffed decoding of encoded columns

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ferry_bench::utils::{bytes_column, object_column};
use ferry_codec::{classify, classify_strict, decode_column, encode_column, ColumnTypeTag};

/// Sampling looks at one value; strict mode scans the column.
fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/classify");

    for rows in [1_000, 100_000] {
        let column = bytes_column(rows, 16);
        group.bench_with_input(BenchmarkId::new("sample", rows), &column, |b, column| {
            b.iter(|| black_box(classify(column)));
        });
        group.bench_with_input(BenchmarkId::new("strict", rows), &column, |b, column| {
            b.iter(|| black_box(classify_strict(column).unwrap()));
        });
    }

    group.finish();
}

fn bench_encode_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/encode_bytes");

    for len in [16, 256, 4096] {
        let column = bytes_column(1_000, len);
        group.throughput(Throughput::Bytes((1_000 * len) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &column, |b, column| {
            b.iter(|| {
                let mut column = column.clone();
                encode_column(&mut column, ColumnTypeTag::Bytes).unwrap();
                black_box(column)
            });
        });
    }

    group.finish();
}

fn bench_encode_objects(c: &mut Criterion) {
    let column = object_column(1_000);
    c.bench_function("codec/encode_objects", |b| {
        b.iter(|| {
            let mut column = column.clone();
            encode_column(&mut column, ColumnTypeTag::Opaque).unwrap();
            black_box(column)
        });
    });
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/decode");

    let mut bytes = bytes_column(1_000, 256);
    encode_column(&mut bytes, ColumnTypeTag::Bytes).unwrap();
    let mut objects = object_column(1_000);
    encode_column(&mut objects, ColumnTypeTag::Opaque).unwrap();

    group.throughput(Throughput::Elements(1_000));
    group.bench_function("bytes", |b| {
        b.iter(|| {
            let mut column = bytes.clone();
            black_box(decode_column(&mut column).unwrap())
        });
    });
    group.bench_function("objects", |b| {
        b.iter(|| {
            let mut column = objects.clone();
            black_box(decode_column(&mut column).unwrap())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_classify,
    bench_encode_bytes,
    bench_encode_objects,
    bench_decode,
);
criterion_main!(benches);
