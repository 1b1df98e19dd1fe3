//! Error handling for ferry.
//!
//! This module provides a unified error type and result alias used
//! across all ferry components.

mod transfer;

pub use transfer::{ErrorCode, FerryError};

/// Result type alias for ferry operations.
pub type FerryResult<T> = std::result::Result<T, FerryError>;
