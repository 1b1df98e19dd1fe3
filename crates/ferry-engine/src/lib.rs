//! # ferry-engine
//!
//! Moves tables between memory and SQL databases in parallel chunks.
//!
//! - [`StoreEngine`]: encode, chunk, insert chunks concurrently
//! - [`QueryEngine`]: count, fetch pages concurrently, decode, reassemble in
//!   order
//! - [`extract_select`]: pulls table, columns and condition out of a simple
//!   `SELECT`
//! - [`Ferry`]: one connection's worth of all of the above plus the
//!   pass-through DDL and raw SQL operations
//!
//! ## Example
//!
//! ```rust
//! use ferry_common::{ConnectionConfig, Table, TransferOptions, Value};
//! use ferry_engine::Ferry;
//!
//! let ferry = Ferry::connect(&ConnectionConfig::memory()).unwrap();
//! let table = Table::from_rows(
//!     ["id", "blob"],
//!     vec![
//!         vec![Value::Int(1), Value::bytes(b"a")],
//!         vec![Value::Int(2), Value::Null],
//!     ],
//! )
//! .unwrap();
//!
//! ferry.store_table(table.clone(), "items", &TransferOptions::default()).unwrap();
//!
//! // Pages come back in order however many workers fetch them.
//! let options = TransferOptions::new().chunk_size(1);
//! let back = ferry.query_table("items", &options).unwrap().unwrap();
//! assert_eq!(back, table);
//! ```
//!
//! Neither engine is transactional across chunks: when one chunk fails the
//! others may already be committed. Chunks commit in completion order, so a
//! store with several workers does not preserve physical row order.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod ferry;
mod query;
mod sql_extract;
mod store;
mod tags;

pub use crate::ferry::Ferry;
pub use query::{QueryEngine, QueryRequest};
pub use sql_extract::{extract_select, SelectStatement};
pub use store::{StoreEngine, StoreSummary};
