//! ferry performance benchmarks
//!
//! - Column codec: classify, encode, decode
//! - Chunked store and query against the memory backend and SQLite
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p ferry-bench
//! ```

pub mod utils;
