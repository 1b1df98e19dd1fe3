//! # ferry-test
//!
//! Shared fixtures and end-to-end tests for ferry.
//!
//! This crate contains:
//! - Sample tables covering every codec path
//! - Fault-injecting sinks for partial-failure tests
//! - Integration tests under `tests/` against the memory backend and
//!   file-backed SQLite databases

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Sample tables
pub mod fixtures;

/// Recording and failing backends
pub mod faults;

use std::path::Path;

use ferry_common::config::ConnectionConfig;
use ferry_common::error::FerryResult;
use ferry_engine::Ferry;

/// A `Ferry` over a SQLite file inside `dir`.
pub fn sqlite_ferry(dir: &Path, file: &str) -> FerryResult<Ferry> {
    Ferry::connect(&ConnectionConfig::sqlite(dir.join(file)))
}

/// A `Ferry` over a fresh in-memory backend.
pub fn memory_ferry() -> FerryResult<Ferry> {
    Ferry::connect(&ConnectionConfig::memory())
}
