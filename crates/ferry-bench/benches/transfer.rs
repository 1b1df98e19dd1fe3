//! Chunked store and query benchmarks.
//!
//! Benchmarks for:
//! - Store throughput by worker count (memory backend)
//! - Query throughput by chunk size (memory backend)
//! - Store and query against a SQLite file

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ferry_bench::utils::transfer_table;
use ferry_common::config::{ConnectionConfig, TransferOptions};
use ferry_engine::{Ferry, QueryRequest};
use tempfile::TempDir;

const ROWS: usize = 20_000;

fn bench_store_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer/store_memory");
    let table = transfer_table(ROWS);
    group.throughput(Throughput::Elements(ROWS as u64));

    for workers in [1, 2, 4, 8] {
        let options = TransferOptions::new()
            .chunk_size(1_000)
            .max_workers(workers)
            .table_replace(true);
        group.bench_with_input(BenchmarkId::from_parameter(workers), &options, |b, options| {
            let ferry = Ferry::connect(&ConnectionConfig::memory()).unwrap();
            b.iter(|| black_box(ferry.store_table(table.clone(), "bench", options).unwrap()));
        });
    }

    group.finish();
}

fn bench_query_chunk_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer/query_memory");
    let ferry = Ferry::connect(&ConnectionConfig::memory()).unwrap();
    ferry
        .store_table(transfer_table(ROWS), "bench", &TransferOptions::default())
        .unwrap();
    group.throughput(Throughput::Elements(ROWS as u64));

    for chunk_size in [250, 2_048, ROWS] {
        let options = TransferOptions::new().chunk_size(chunk_size);
        group.bench_with_input(BenchmarkId::from_parameter(chunk_size), &options, |b, options| {
            b.iter(|| black_box(ferry.query_table("bench", options).unwrap()));
        });
    }

    group.finish();
}

fn bench_sqlite(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer/sqlite");
    group.sample_size(10);

    let dir = TempDir::new().unwrap();
    let ferry = Ferry::connect(&ConnectionConfig::sqlite(dir.path().join("bench.db"))).unwrap();
    let table = transfer_table(ROWS);
    let options = TransferOptions::new().chunk_size(2_048).table_replace(true);
    group.throughput(Throughput::Elements(ROWS as u64));

    group.bench_function("store", |b| {
        b.iter(|| black_box(ferry.store_table(table.clone(), "bench", &options).unwrap()));
    });

    ferry.store_table(table.clone(), "bench", &options).unwrap();
    let request = QueryRequest::new("bench").order_by("id");
    group.bench_function("query", |b| {
        b.iter(|| black_box(ferry.query(&request, &options).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_store_workers, bench_query_chunk_size, bench_sqlite);
criterion_main!(benches);
