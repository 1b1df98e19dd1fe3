//! Configuration for ferry.
//!
//! This module provides the construction-time connection configuration and
//! the per-call transfer options.

mod connection;
mod transfer;

pub use connection::{BackendKind, ConnectionConfig};
pub use transfer::{ClassifyMode, TagSource, TransferOptions};
