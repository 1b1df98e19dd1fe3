//! # ferry-common
//!
//! Common types, errors, and configuration for ferry.
//!
//! This crate provides the foundational pieces shared by every ferry
//! component:
//!
//! - **Types**: the in-memory columnar data model (`Value`, `Column`, `Table`)
//! - **Errors**: unified error handling with `FerryError`
//! - **Config**: connection and transfer configuration
//! - **Constants**: wire-format prefixes and transfer defaults
//!
//! ## Example
//!
//! ```rust
//! use ferry_common::types::{Column, Table, Value};
//! use ferry_common::error::FerryResult;
//!
//! fn example() -> FerryResult<Table> {
//!     Table::new(vec![
//!         Column::new("id", vec![Value::Int(1), Value::Int(2)]),
//!         Column::new("payload", vec![Value::bytes(b"a"), Value::Null]),
//!     ])
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::{BackendKind, ClassifyMode, ConnectionConfig, TagSource, TransferOptions};
pub use constants::*;
pub use error::{ErrorCode, FerryError, FerryResult};
pub use types::{Column, FixedFloat, FixedInt, ObjectValue, Table, TableBuilder, Value};
