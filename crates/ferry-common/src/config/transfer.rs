//! Per-call transfer options.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_WORKERS};
use crate::error::{FerryError, FerryResult};

/// How a column's type tag is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyMode {
    /// Inspect the first non-NULL value only.
    #[default]
    Sample,
    /// Scan every value and reject mixed columns.
    Strict,
}

/// Where the query path learns which columns need decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    /// Sniff the encoded prefix on a sampled value.
    #[default]
    Sniff,
    /// Read tags recorded in the sidecar tag table at store time.
    Sidecar,
}

/// Options shared by store and query calls.
///
/// # Example
///
/// ```rust
/// use ferry_common::config::TransferOptions;
///
/// let options = TransferOptions::new().chunk_size(500).max_workers(4);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    /// Rows per chunk.
    pub chunk_size: usize,
    /// Concurrent workers per phase.
    pub max_workers: usize,
    /// Replace the destination table's schema before writing.
    pub table_replace: bool,
    /// Encode non-primitive columns. When false such columns are rejected.
    pub encode: bool,
    /// Column classification strategy.
    pub classify_mode: ClassifyMode,
    /// Where decode tags come from.
    pub tag_source: TagSource,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_workers: DEFAULT_MAX_WORKERS,
            table_replace: false,
            encode: true,
            classify_mode: ClassifyMode::Sample,
            tag_source: TagSource::Sniff,
        }
    }
}

impl TransferOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chunk size.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the worker count.
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Sets whether the destination schema is replaced.
    pub fn table_replace(mut self, table_replace: bool) -> Self {
        self.table_replace = table_replace;
        self
    }

    /// Sets whether non-primitive columns are encoded.
    pub fn encode(mut self, encode: bool) -> Self {
        self.encode = encode;
        self
    }

    /// Sets the classification mode.
    pub fn classify_mode(mut self, mode: ClassifyMode) -> Self {
        self.classify_mode = mode;
        self
    }

    /// Sets the decode tag source.
    pub fn tag_source(mut self, source: TagSource) -> Self {
        self.tag_source = source;
        self
    }

    /// Validates the options.
    pub fn validate(&self) -> FerryResult<()> {
        if self.chunk_size == 0 {
            return Err(FerryError::invalid_argument("chunk_size must be at least 1"));
        }
        if self.max_workers == 0 {
            return Err(FerryError::invalid_argument("max_workers must be at least 1"));
        }
        Ok(())
    }
}
