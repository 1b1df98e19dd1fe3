//! Chunked parallel queries return rows in single-fetch order.

use ferry_backend::SelectRequest;
use ferry_common::config::TransferOptions;
use ferry_engine::QueryRequest;
use ferry_test::fixtures::numbered_table;
use ferry_test::{memory_ferry, sqlite_ferry};
use tempfile::TempDir;

#[test]
fn test_ten_thousand_rows_memory() {
    let ferry = memory_ferry().unwrap();
    ferry
        .store_table(numbered_table(10_000), "big", &TransferOptions::default())
        .unwrap();

    let single = ferry.select_rows(&SelectRequest::new("big")).unwrap();
    let options = TransferOptions::new().chunk_size(100).max_workers(8);
    let chunked = ferry.query_table("big", &options).unwrap().unwrap();

    assert_eq!(chunked.num_rows(), 10_000);
    assert_eq!(chunked, single);
}

#[test]
fn test_ten_thousand_rows_sqlite() {
    let dir = TempDir::new().unwrap();
    let ferry = sqlite_ferry(dir.path(), "big.db").unwrap();
    let options = TransferOptions::new().chunk_size(100).max_workers(8);
    ferry
        .store_table(numbered_table(10_000), "big", &options)
        .unwrap();

    let single = ferry
        .select_rows(&SelectRequest::new("big").with_order_by(Some("id")))
        .unwrap();
    let chunked = ferry
        .query(&QueryRequest::new("big").order_by("id"), &options)
        .unwrap()
        .unwrap();

    assert_eq!(chunked, single);
    assert_eq!(chunked, numbered_table(10_000));
}

#[test]
fn test_order_independent_of_workers() {
    let ferry = memory_ferry().unwrap();
    ferry
        .store_table(numbered_table(1_000), "n", &TransferOptions::default())
        .unwrap();

    let reference = ferry
        .query_table("n", &TransferOptions::new().max_workers(1))
        .unwrap()
        .unwrap();
    for workers in [2, 3, 8, 32] {
        for chunk_size in [1, 9, 250] {
            let options = TransferOptions::new()
                .chunk_size(chunk_size)
                .max_workers(workers);
            let back = ferry.query_table("n", &options).unwrap().unwrap();
            assert_eq!(back, reference, "workers={} chunk_size={}", workers, chunk_size);
        }
    }
}
