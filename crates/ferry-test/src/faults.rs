//! Sinks that record or sabotage chunk inserts.

use parking_lot::Mutex;

use ferry_backend::{DataSink, DataSource, MemoryBackend, SelectRequest};
use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Table, Value};

/// A memory-backed sink that rejects any chunk whose first key equals one
/// of the poisoned keys, the way a constraint violation would.
#[derive(Debug, Default)]
pub struct FailingSink {
    inner: MemoryBackend,
    poisoned: Vec<i64>,
    attempts: Mutex<Vec<i64>>,
}

impl FailingSink {
    /// Creates a sink that fails chunks starting at any of `keys`.
    pub fn new(keys: impl IntoIterator<Item = i64>) -> Self {
        Self {
            inner: MemoryBackend::new(),
            poisoned: keys.into_iter().collect(),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// The backing store.
    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    /// First keys of every chunk insert attempted, sorted.
    pub fn attempts(&self) -> Vec<i64> {
        let mut attempts = self.attempts.lock().clone();
        attempts.sort_unstable();
        attempts
    }
}

fn first_key(chunk: &Table) -> Option<i64> {
    chunk
        .key_column()
        .map(|column| column.get(0))
        .and_then(Value::as_i64)
}

impl DataSink for FailingSink {
    fn insert_table(&self, chunk: &Table, table: &str) -> FerryResult<usize> {
        let key = first_key(chunk);
        if let Some(key) = key {
            self.attempts.lock().push(key);
        }
        match key {
            Some(key) if self.poisoned.contains(&key) => Err(FerryError::backend(
                "memory",
                "insert",
                format!("duplicate key value violates unique constraint (id={})", key),
            )),
            _ => self.inner.insert_table(chunk, table),
        }
    }

    fn ensure_table(&self, table: &str, template: &Table) -> FerryResult<()> {
        self.inner.ensure_table(table, template)
    }

    fn replace_table(&self, table: &str, template: &Table) -> FerryResult<()> {
        self.inner.replace_table(table, template)
    }

    fn delete_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<usize> {
        self.inner.delete_keyed(table, column, key)
    }
}

impl DataSource for FailingSink {
    fn select_table(&self, request: &SelectRequest) -> FerryResult<Table> {
        self.inner.select_table(request)
    }

    fn count_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize> {
        self.inner.count_rows(table, condition)
    }

    fn table_exists(&self, table: &str) -> FerryResult<bool> {
        self.inner.table_exists(table)
    }
}

/// A memory-backed source that counts page fetches.
#[derive(Debug, Default)]
pub struct CountingSource {
    inner: MemoryBackend,
    pages: Mutex<Vec<(usize, usize)>>,
}

impl CountingSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store.
    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    /// `(offset, limit)` of every page fetched, sorted by offset.
    pub fn pages(&self) -> Vec<(usize, usize)> {
        let mut pages = self.pages.lock().clone();
        pages.sort_unstable();
        pages
    }
}

impl DataSource for CountingSource {
    fn select_table(&self, request: &SelectRequest) -> FerryResult<Table> {
        self.pages
            .lock()
            .push((request.offset, request.limit.unwrap_or(usize::MAX)));
        self.inner.select_table(request)
    }

    fn count_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize> {
        self.inner.count_rows(table, condition)
    }

    fn table_exists(&self, table: &str) -> FerryResult<bool> {
        self.inner.table_exists(table)
    }
}
