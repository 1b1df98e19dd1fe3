//! The `Ferry` facade.

use std::fmt;
use std::sync::Arc;

use ferry_backend::{connect, Backend, ColumnDef, SelectRequest};
use ferry_codec::encode_table;
use ferry_common::config::{BackendKind, ClassifyMode, ConnectionConfig, TransferOptions};
use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Column, Table, Value};

use crate::query::{QueryEngine, QueryRequest};
use crate::sql_extract::extract_select;
use crate::store::{StoreEngine, StoreSummary};
use crate::tags::clear_tags;

/// One database connection with chunked store/query and pass-through
/// operations.
///
/// Cheap to clone; clones share the backend handle.
#[derive(Clone)]
pub struct Ferry {
    backend: Arc<dyn Backend>,
    store: StoreEngine<dyn Backend>,
    query: QueryEngine<dyn Backend>,
}

impl fmt::Debug for Ferry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ferry")
            .field("backend", &self.backend.kind())
            .finish()
    }
}

impl Ferry {
    /// Connects using a connection config.
    ///
    /// # Errors
    ///
    /// Fails with [`FerryError::UnsupportedBackend`] when the kind is not
    /// available in this build.
    pub fn connect(config: &ConnectionConfig) -> FerryResult<Self> {
        Ok(Self::with_backend(connect(config)?))
    }

    /// Wraps an existing backend.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            store: StoreEngine::new(Arc::clone(&backend)),
            query: QueryEngine::new(Arc::clone(&backend)),
            backend,
        }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Backend kind.
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Stores a table in parallel chunks. See [`StoreEngine::store`].
    pub fn store_table(&self, table: Table, name: &str, options: &TransferOptions) -> FerryResult<StoreSummary> {
        self.store.store(table, name, options)
    }

    /// Stores several named tables one after another.
    pub fn store_tables<N, I>(&self, tables: I, options: &TransferOptions) -> FerryResult<Vec<StoreSummary>>
    where
        N: AsRef<str>,
        I: IntoIterator<Item = (N, Table)>,
    {
        self.store.store_many(tables, options)
    }

    /// Reads a whole table in parallel chunks; `None` when it is empty.
    pub fn query_table(&self, name: &str, options: &TransferOptions) -> FerryResult<Option<Table>> {
        self.query.query(&QueryRequest::new(name), options)
    }

    /// Runs a chunked query. See [`QueryEngine::query`].
    pub fn query(&self, request: &QueryRequest, options: &TransferOptions) -> FerryResult<Option<Table>> {
        self.query.query(request, options)
    }

    /// Runs a chunked query described by a simple `SELECT`.
    ///
    /// Only the table, column list and condition are honored; see
    /// [`extract_select`].
    pub fn query_sql(&self, sql: &str, options: &TransferOptions) -> FerryResult<Option<Table>> {
        let request = QueryRequest::from(extract_select(sql)?);
        self.query.query(&request, options)
    }

    /// Executes raw SQL on the backend.
    pub fn execute_sql(&self, sql: &str) -> FerryResult<Table> {
        self.backend.execute(sql)
    }

    /// Creates a table from explicit column definitions.
    pub fn create_table(&self, name: &str, columns: &[ColumnDef]) -> FerryResult<()> {
        self.backend.create_table(name, columns)
    }

    /// Replaces `name` with an empty table shaped like `template` after
    /// encoding.
    pub fn create_table_like(&self, name: &str, template: &Table) -> FerryResult<()> {
        let mut shape = template.clone();
        encode_table(&mut shape, ClassifyMode::Sample, true)?;
        self.backend.replace_table(name, &shape)
    }

    /// Drops a table if it exists, along with the column tags recorded for
    /// it.
    pub fn drop_table(&self, name: &str) -> FerryResult<()> {
        self.backend.drop_table(name)?;
        clear_tags(self.backend.as_ref(), name)?;
        Ok(())
    }

    /// Whether a table exists.
    pub fn table_exists(&self, name: &str) -> FerryResult<bool> {
        self.backend.table_exists(name)
    }

    /// Deletes matching rows; all rows when `condition` is `None`.
    pub fn delete_rows(&self, name: &str, condition: Option<&str>) -> FerryResult<usize> {
        self.backend.delete_rows(name, condition)
    }

    /// Encodes and inserts one row.
    pub fn insert_row(&self, name: &str, columns: &[&str], values: &[Value]) -> FerryResult<()> {
        if columns.len() != values.len() {
            return Err(FerryError::invalid_argument(format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        let mut row = Table::new(
            columns
                .iter()
                .zip(values)
                .map(|(name, value)| Column::new(*name, vec![value.clone()]))
                .collect(),
        )?;
        encode_table(&mut row, ClassifyMode::Sample, true)?;
        self.backend.insert_table(&row, name).map(|_| ())
    }

    /// Fetches one page without chunking or decoding.
    pub fn select_rows(&self, request: &SelectRequest) -> FerryResult<Table> {
        self.backend.select_table(request)
    }

    /// Counts matching rows.
    pub fn count_rows(&self, name: &str, condition: Option<&str>) -> FerryResult<usize> {
        self.backend.count_rows(name, condition)
    }
}
