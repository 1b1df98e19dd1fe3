//! Transfer error types.
//!
//! Every failure in ferry aborts the current call and surfaces to the
//! caller. Nothing in the core retries.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Internal error (bug).
    Internal = 0x0001,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// A worker task panicked.
    TaskPanicked = 0x0006,

    // I/O and configuration errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,
    /// Configuration could not be loaded or is invalid.
    Config = 0x0105,

    // Backend errors (0x0200 - 0x02FF)
    /// Unknown or compiled-out backend kind.
    UnsupportedBackend = 0x0200,
    /// Driver-level failure (connection, constraint, syntax).
    Backend = 0x0201,

    // Codec errors (0x0300 - 0x03FF)
    /// Column cannot be classified or encoded under the requested options.
    UnsupportedColumnType = 0x0300,
    /// Encoded payload is malformed or serialization failed.
    CodecFailure = 0x0301,

    // Query errors (0x0600 - 0x06FF)
    /// SQL text could not be handled by the statement extractor.
    UnsupportedQuery = 0x0600,
    /// Tables or chunks disagree on their columns.
    SchemaMismatch = 0x0603,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Backend",
            0x03 => "Codec",
            0x06 => "Query",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for ferry.
///
/// # Example
///
/// ```rust
/// use ferry_common::error::{FerryError, FerryResult};
///
/// fn connect(kind: &str) -> FerryResult<()> {
///     Err(FerryError::UnsupportedBackend { kind: kind.to_string() })
/// }
/// assert!(connect("oracle").is_err());
/// ```
#[derive(Debug, Error)]
pub enum FerryError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// A unit of work panicked inside the worker pool.
    #[error("task {task} panicked: {message}")]
    TaskPanicked {
        /// Index of the task in submission order.
        task: usize,
        /// Panic payload, if it was a string.
        message: String,
    },

    // ==========================================================================
    // I/O and Configuration Errors
    // ==========================================================================
    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("invalid configuration: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Backend Errors
    // ==========================================================================
    /// Backend kind string is unknown or its driver is not compiled in.
    #[error("unsupported database backend: {kind}")]
    UnsupportedBackend {
        /// The rejected kind string.
        kind: String,
    },

    /// Error reported by a database driver.
    #[error("{backend} {operation} failed: {message}")]
    Backend {
        /// Backend name.
        backend: &'static str,
        /// Operation that failed.
        operation: &'static str,
        /// Driver message, verbatim.
        message: String,
    },

    // ==========================================================================
    // Codec Errors
    // ==========================================================================
    /// Column cannot be handled under the requested options.
    #[error("unsupported type for column '{column}' ({tag}): {reason}")]
    UnsupportedColumnType {
        /// Column name.
        column: String,
        /// Classified tag name.
        tag: String,
        /// Why the column was rejected.
        reason: String,
    },

    /// Malformed encoded payload or failed serialization.
    #[error("codec failure in column '{column}': {message}")]
    CodecFailure {
        /// Column name.
        column: String,
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Query Errors
    // ==========================================================================
    /// SQL text not accepted by the statement extractor.
    #[error("unsupported query: {message}")]
    UnsupportedQuery {
        /// Error message.
        message: String,
    },

    /// Column sets disagree.
    #[error("schema mismatch: {message}")]
    SchemaMismatch {
        /// Error message.
        message: String,
    },
}

impl FerryError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::TaskPanicked { .. } => ErrorCode::TaskPanicked,
            Self::Io { .. } => ErrorCode::Io,
            Self::Config { .. } => ErrorCode::Config,
            Self::UnsupportedBackend { .. } => ErrorCode::UnsupportedBackend,
            Self::Backend { .. } => ErrorCode::Backend,
            Self::UnsupportedColumnType { .. } => ErrorCode::UnsupportedColumnType,
            Self::CodecFailure { .. } => ErrorCode::CodecFailure,
            Self::UnsupportedQuery { .. } => ErrorCode::UnsupportedQuery,
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
        }
    }

    /// Returns true if retrying the same call could succeed.
    ///
    /// The core never retries on its own; this only informs callers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Backend { .. })
    }

    /// Returns true if the error was raised before any database I/O.
    #[must_use]
    pub const fn is_client_side(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. }
                | Self::Config { .. }
                | Self::UnsupportedBackend { .. }
                | Self::UnsupportedColumnType { .. }
                | Self::UnsupportedQuery { .. }
        )
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a codec failure for the given column.
    #[must_use]
    pub fn codec(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CodecFailure {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported query error.
    #[must_use]
    pub fn unsupported_query(message: impl Into<String>) -> Self {
        Self::UnsupportedQuery {
            message: message.into(),
        }
    }

    /// Creates a schema mismatch error.
    #[must_use]
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Wraps a driver error with the backend and operation it came from.
    #[must_use]
    pub fn backend(backend: &'static str, operation: &'static str, err: impl fmt::Display) -> Self {
        Self::Backend {
            backend,
            operation,
            message: err.to_string(),
        }
    }
}
