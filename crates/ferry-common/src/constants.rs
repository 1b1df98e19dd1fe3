//! System-wide constants for ferry.
//!
//! The prefix constants define the encoded-cell wire format and must stay
//! bit-exact: values written by one build are decoded by another.

// =============================================================================
// Encoded Cell Wire Format
// =============================================================================

/// Separator between an encoding prefix and its base64 payload.
pub const PREFIX_SEPARATOR: &str = "::";

/// Prefix tag for raw byte sequences.
pub const BYTES_PREFIX: &str = "base64_encode";

/// Prefix tag for serialized opaque objects.
pub const OBJECT_PREFIX: &str = "base64_pickle_encode";

/// Full marker (prefix plus separator) that starts an encoded byte cell.
pub const BYTES_MARKER: &str = "base64_encode::";

/// Full marker (prefix plus separator) that starts an encoded object cell.
pub const OBJECT_MARKER: &str = "base64_pickle_encode::";

// =============================================================================
// Transfer Defaults
// =============================================================================

/// Default number of rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// Default number of concurrent workers per call.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Column list that selects every column.
pub const ALL_COLUMNS: &str = "*";

// =============================================================================
// Sidecar Metadata
// =============================================================================

/// Table holding per-column type tags when the sidecar tag source is used.
pub const TAG_TABLE_NAME: &str = "_ferry_column_tags";

// =============================================================================
// Backend Defaults
// =============================================================================

/// Default PostgreSQL port.
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Default MySQL port.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Busy timeout applied to every SQLite connection, in milliseconds.
///
/// Chunk writers open their own connections and contend for the database
/// write lock.
pub const SQLITE_BUSY_TIMEOUT_MS: u64 = 30_000;
