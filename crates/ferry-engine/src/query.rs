//! Chunked parallel query.

use std::sync::Arc;
use std::time::Instant;

use ferry_backend::{DataSource, SelectRequest};
use ferry_codec::{decode_table, decode_table_with, TagManifest};
use ferry_common::config::{TagSource, TransferOptions};
use ferry_common::constants::ALL_COLUMNS;
use ferry_common::error::FerryResult;
use ferry_common::types::Table;
use ferry_exec::{plan_chunks, ParallelExecutor};

use crate::sql_extract::SelectStatement;
use crate::tags::recorded_tags;

/// What to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Source table.
    pub table: String,
    /// Column specs; empty or `*` reads every column.
    ///
    /// With [`TagSource::Sidecar`], a result column whose name has no
    /// recorded tag (an alias or an expression) is decoded by sniffing.
    pub columns: Vec<String>,
    /// Optional `WHERE` condition.
    pub condition: Option<String>,
    /// Optional cap on the number of rows.
    pub limit: Option<usize>,
    /// Optional `ORDER BY` clause applied to every page.
    ///
    /// Offset pagination is only stable when the backend returns rows in a
    /// deterministic order; set this when it does not.
    pub order_by: Option<String>,
}

impl QueryRequest {
    /// Reads every row and column of a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            condition: None,
            limit: None,
            order_by: None,
        }
    }

    /// Sets the column specs.
    pub fn columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `WHERE` condition.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Caps the number of rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the ordering applied to every page.
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    fn page(&self, offset: usize, len: usize) -> SelectRequest {
        SelectRequest::new(self.table.as_str())
            .with_columns(self.columns.iter().filter(|c| c.trim() != ALL_COLUMNS).cloned())
            .with_condition(self.condition.clone())
            .with_order_by(self.order_by.clone())
            .page(offset, len)
    }
}

impl From<SelectStatement> for QueryRequest {
    fn from(statement: SelectStatement) -> Self {
        Self {
            table: statement.table,
            columns: statement.columns,
            condition: statement.condition,
            limit: None,
            order_by: None,
        }
    }
}

/// Reads tables from a [`DataSource`] in parallel pages.
pub struct QueryEngine<S: ?Sized + DataSource = dyn DataSource> {
    source: Arc<S>,
}

impl<S: ?Sized + DataSource> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: ?Sized + DataSource> QueryEngine<S> {
    /// Creates a query engine over a source.
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Runs a chunked query.
    ///
    /// Returns `None` when no row matches. Otherwise:
    ///
    /// 1. the matching rows are counted and the count is clamped to `limit`
    /// 2. one page fetch per chunk runs on at most `max_workers` threads
    /// 3. every fetched page is decoded, again in parallel
    /// 4. pages are concatenated in chunk order, never completion order
    ///
    /// The first column of the result is the logical row key.
    pub fn query(&self, request: &QueryRequest, options: &TransferOptions) -> FerryResult<Option<Table>> {
        options.validate()?;
        let start = Instant::now();

        let count = self
            .source
            .count_rows(&request.table, request.condition.as_deref())?;
        let total = request.limit.map_or(count, |limit| count.min(limit));
        if total == 0 {
            tracing::debug!("No rows in {}", request.table);
            return Ok(None);
        }

        let chunks = plan_chunks(total, options.chunk_size)?;
        let executor = ParallelExecutor::new(options.max_workers)?;
        let source = self.source.as_ref();

        let pages = executor.map_chunks(&chunks, |chunk| {
            tracing::debug!(
                "Fetching chunk {} (rows {}..{}) from {}",
                chunk.index,
                chunk.offset,
                chunk.end(),
                request.table
            );
            source.select_table(&request.page(chunk.offset, chunk.len))
        })?;

        let manifest = match options.tag_source {
            TagSource::Sniff => None,
            TagSource::Sidecar => self.load_manifest(&request.table)?,
        };
        let manifest = manifest.as_ref();

        let decode_tasks: Vec<_> = pages
            .into_iter()
            .map(|mut page| {
                move || -> FerryResult<Table> {
                    match manifest {
                        Some(manifest) => decode_table_with(&mut page, manifest)?,
                        None => {
                            decode_table(&mut page)?;
                        }
                    }
                    Ok(page)
                }
            })
            .collect();
        let decoded = executor.run_all(decode_tasks)?;

        let table = Table::concat(decoded)?;
        tracing::info!(
            "Queried {} rows from {} in {} chunks ({:?})",
            table.num_rows(),
            request.table,
            chunks.len(),
            start.elapsed()
        );
        Ok(Some(table))
    }

    /// Reads the recorded column tags of a table.
    ///
    /// Falls back to sniffing (returns `None`) when nothing was recorded.
    fn load_manifest(&self, table: &str) -> FerryResult<Option<TagManifest>> {
        let manifest = recorded_tags(self.source.as_ref(), table)?;
        if manifest.is_empty() {
            tracing::warn!("No recorded tags for {}; decoding by sniffing", table);
            return Ok(None);
        }
        Ok(Some(manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreEngine;
    use ferry_backend::{DataSink, MemoryBackend};
    use ferry_common::error::FerryError;
    use ferry_common::types::{Column, ObjectValue, Value};
    use serde_json::json;

    fn numbered(rows: i64) -> Table {
        Table::new(vec![
            Column::new("id", (0..rows).map(Value::Int).collect()),
            Column::new("label", (0..rows).map(|i| Value::string(format!("row-{}", i))).collect()),
        ])
        .unwrap()
    }

    fn engines() -> (
        Arc<MemoryBackend>,
        StoreEngine<MemoryBackend>,
        QueryEngine<MemoryBackend>,
    ) {
        let backend = Arc::new(MemoryBackend::new());
        (
            backend.clone(),
            StoreEngine::new(backend.clone()),
            QueryEngine::new(backend),
        )
    }

    #[test]
    fn test_query_preserves_order() {
        let (_, store, query) = engines();
        let options = TransferOptions::new().chunk_size(7).max_workers(4);
        store.store(numbered(100), "n", &TransferOptions::default()).unwrap();

        let back = query.query(&QueryRequest::new("n"), &options).unwrap().unwrap();
        assert_eq!(back, numbered(100));
        assert_eq!(back.key_column().unwrap().name(), "id");
    }

    #[test]
    fn test_query_limit_clamps() {
        let (_, store, query) = engines();
        let options = TransferOptions::new().chunk_size(4);
        store.store(numbered(20), "n", &TransferOptions::default()).unwrap();

        let back = query
            .query(&QueryRequest::new("n").limit(10), &options)
            .unwrap()
            .unwrap();
        assert_eq!(back, numbered(10));
    }

    #[test]
    fn test_query_absent_when_empty() {
        let (backend, _, query) = engines();
        backend.ensure_table("empty", &numbered(1)).unwrap();
        let options = TransferOptions::default();
        assert!(query.query(&QueryRequest::new("empty"), &options).unwrap().is_none());
        assert!(query
            .query(&QueryRequest::new("empty").limit(0), &options)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_query_projection() {
        let (_, store, query) = engines();
        let options = TransferOptions::new().chunk_size(3);
        store.store(numbered(5), "n", &TransferOptions::default()).unwrap();
        let back = query
            .query(&QueryRequest::new("n").columns(["label"]), &options)
            .unwrap()
            .unwrap();
        assert_eq!(back.column_names(), vec!["label"]);
        assert_eq!(back.num_rows(), 5);
    }

    #[test]
    fn test_query_decodes_objects() {
        let (_, store, query) = engines();
        let table = Table::new(vec![
            Column::new("id", vec![Value::Int(1), Value::Int(2)]),
            Column::new(
                "meta",
                vec![Value::Null, Value::Object(ObjectValue::new(json!({"k": [1, 2]})))],
            ),
        ])
        .unwrap();
        let options = TransferOptions::new().chunk_size(1);
        store.store(table.clone(), "o", &TransferOptions::default()).unwrap();
        assert_eq!(query.query(&QueryRequest::new("o"), &options).unwrap().unwrap(), table);
    }

    #[test]
    fn test_sidecar_leaves_lookalike_strings() {
        let (_, store, query) = engines();
        let table = Table::new(vec![Column::new(
            "note",
            vec![Value::string("base64_encode::not-encoded")],
        )])
        .unwrap();
        let options = TransferOptions::new().tag_source(TagSource::Sidecar);
        store.store(table.clone(), "notes", &options).unwrap();

        let back = query.query(&QueryRequest::new("notes"), &options).unwrap().unwrap();
        assert_eq!(back, table);

        let sniffed = query.query(&QueryRequest::new("notes"), &TransferOptions::default());
        assert!(matches!(sniffed, Err(FerryError::CodecFailure { .. })));
    }

    #[test]
    fn test_missing_table_is_backend_error() {
        let (_, _, query) = engines();
        let err = query
            .query(&QueryRequest::new("nope"), &TransferOptions::default())
            .unwrap_err();
        assert!(matches!(err, FerryError::Backend { .. }));
    }
}
