//! Chunked parallel store.

use std::sync::Arc;
use std::time::Instant;

use ferry_backend::{Backend, DataSink, DataSource};
use ferry_codec::{encode_table, ColumnTypeTag, TagManifest};
use ferry_common::config::{TagSource, TransferOptions};
use ferry_common::constants::TAG_TABLE_NAME;
use ferry_common::error::FerryResult;
use ferry_common::types::Table;
use ferry_exec::{plan_chunks, ParallelExecutor};

use crate::tags::{clear_tags, recorded_tags};

/// Outcome of one store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    /// Destination table.
    pub table: String,
    /// Rows written.
    pub rows: usize,
    /// Chunks inserted.
    pub chunks: usize,
    /// Tag assigned to each column, in column order.
    pub tags: Vec<ColumnTypeTag>,
}

impl StoreSummary {
    fn skipped(table: &str) -> Self {
        Self {
            table: table.to_string(),
            rows: 0,
            chunks: 0,
            tags: Vec::new(),
        }
    }
}

/// Writes tables to a [`DataSink`] in parallel chunks.
///
/// The sink must also be readable so an append can check the column tags
/// already recorded for the destination.
pub struct StoreEngine<S: ?Sized + DataSink + DataSource = dyn Backend> {
    sink: Arc<S>,
}

impl<S: ?Sized + DataSink + DataSource> Clone for StoreEngine<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S: ?Sized + DataSink + DataSource> StoreEngine<S> {
    /// Creates a store engine over a sink.
    pub fn new(sink: Arc<S>) -> Self {
        Self { sink }
    }

    /// Stores one table.
    ///
    /// Steps, in order:
    ///
    /// 1. an empty table is a no-op
    /// 2. every column is classified and encoded; with encoding disabled a
    ///    non-primitive column fails here, before any I/O
    /// 3. with [`TagSource::Sidecar`], the tags of columns holding a value
    ///    are checked against the ones recorded for the destination; a
    ///    column whose recorded tag decodes differently fails here
    /// 4. with `table_replace`, the destination is dropped and recreated
    ///    empty; otherwise it is created if missing
    /// 5. with [`TagSource::Sidecar`], the tag table is brought up to date:
    ///    a new or replaced destination drops its old tags, an append only
    ///    adds columns not recorded yet
    /// 6. one insert task per chunk runs on at most `max_workers` threads
    ///
    /// The first failing chunk (in chunk order) is returned once every chunk
    /// has finished. Chunks that succeeded stay written.
    pub fn store(&self, table: Table, name: &str, options: &TransferOptions) -> FerryResult<StoreSummary> {
        options.validate()?;
        if table.is_empty() {
            tracing::debug!("Nothing to store into {}", name);
            return Ok(StoreSummary::skipped(name));
        }

        let start = Instant::now();
        let mut table = table;
        let tags = encode_table(&mut table, options.classify_mode, options.encode)?;

        let pending = match options.tag_source {
            TagSource::Sniff => None,
            TagSource::Sidecar => {
                let fresh = options.table_replace || !self.sink.table_exists(name)?;
                Some((fresh, self.pending_tags(name, &table, &tags, fresh)?))
            }
        };

        if options.table_replace {
            tracing::info!("Replacing table {}", name);
            self.sink.replace_table(name, &table)?;
        } else {
            self.sink.ensure_table(name, &table)?;
        }

        if let Some((fresh, pending)) = pending {
            if fresh {
                clear_tags(self.sink.as_ref(), name)?;
            }
            if !pending.is_empty() {
                self.sink.insert_table(&pending.to_table(name)?, TAG_TABLE_NAME)?;
            }
        }

        let chunks = plan_chunks(table.num_rows(), options.chunk_size)?;
        let executor = ParallelExecutor::new(options.max_workers)?;
        let sink = self.sink.as_ref();
        let table = &table;

        let written = executor
            .map_chunks(&chunks, |chunk| {
                let slice = table.slice(chunk.offset, chunk.len)?;
                tracing::debug!(
                    "Inserting chunk {} (rows {}..{}) into {}",
                    chunk.index,
                    chunk.offset,
                    chunk.end(),
                    name
                );
                sink.insert_table(&slice, name)
            })
            .map_err(|err| {
                tracing::warn!("Store into {} failed; earlier chunks may be committed: {}", name, err);
                err
            })?;

        let rows: usize = written.iter().sum();
        tracing::info!(
            "Stored {} rows into {} in {} chunks on {} workers ({:?})",
            rows,
            name,
            chunks.len(),
            executor.max_workers().min(chunks.len()),
            start.elapsed()
        );

        Ok(StoreSummary {
            table: name.to_string(),
            rows,
            chunks: chunks.len(),
            tags,
        })
    }

    /// Tags to record for this store: every observed column for a fresh
    /// destination, only unrecorded columns for an append.
    fn pending_tags(
        &self,
        name: &str,
        table: &Table,
        tags: &[ColumnTypeTag],
        fresh: bool,
    ) -> FerryResult<TagManifest> {
        let observed = TagManifest::observed(table, tags)?;
        if fresh {
            return Ok(observed);
        }
        recorded_tags(self.sink.as_ref(), name)?.additions(&observed)
    }

    /// Stores several tables one after another.
    ///
    /// There is no atomicity across tables: a failure stops the sequence
    /// and leaves earlier tables written.
    pub fn store_many<N, I>(&self, tables: I, options: &TransferOptions) -> FerryResult<Vec<StoreSummary>>
    where
        N: AsRef<str>,
        I: IntoIterator<Item = (N, Table)>,
    {
        tables
            .into_iter()
            .map(|(name, table)| self.store(table, name.as_ref(), options))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_backend::{MemoryBackend, SelectRequest};
    use ferry_common::error::FerryError;
    use ferry_common::types::{Column, Value};
    use parking_lot::Mutex;

    /// Sink that records the row ranges it receives.
    #[derive(Default)]
    struct RecordingSink {
        inner: MemoryBackend,
        chunks: Mutex<Vec<usize>>,
        replaced: Mutex<Vec<String>>,
    }

    impl DataSink for RecordingSink {
        fn insert_table(&self, chunk: &Table, table: &str) -> FerryResult<usize> {
            if table != TAG_TABLE_NAME {
                self.chunks.lock().push(chunk.num_rows());
            }
            self.inner.insert_table(chunk, table)
        }

        fn ensure_table(&self, table: &str, template: &Table) -> FerryResult<()> {
            self.inner.ensure_table(table, template)
        }

        fn replace_table(&self, table: &str, template: &Table) -> FerryResult<()> {
            self.replaced.lock().push(table.to_string());
            self.inner.replace_table(table, template)
        }

        fn delete_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<usize> {
            self.inner.delete_keyed(table, column, key)
        }
    }

    impl DataSource for RecordingSink {
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

    fn bytes_table() -> Table {
        Table::new(vec![Column::new(
            "blob",
            vec![
                Value::bytes(b"a"),
                Value::bytes(b"bb"),
                Value::Null,
                Value::bytes(b"d"),
                Value::bytes(b"e"),
            ],
        )])
        .unwrap()
    }

    #[test]
    fn test_store_chunks_bytes_column() {
        let sink = Arc::new(RecordingSink::default());
        let engine = StoreEngine::new(sink.clone());
        let options = TransferOptions::new().chunk_size(2).max_workers(2);

        let summary = engine.store(bytes_table(), "blobs", &options).unwrap();
        assert_eq!(summary.rows, 5);
        assert_eq!(summary.chunks, 3);
        assert_eq!(summary.tags, vec![ColumnTypeTag::Bytes]);

        let mut sizes = sink.chunks.lock().clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2, 2]);

        let stored = sink.inner.snapshot("blobs").unwrap();
        let first = stored.column("blob").unwrap().iter().find(|v| !v.is_null()).unwrap();
        assert!(first.as_str().unwrap().starts_with("base64_encode::"));
    }

    #[test]
    fn test_store_empty_is_noop() {
        let sink = Arc::new(RecordingSink::default());
        let engine = StoreEngine::new(sink.clone());
        let options = TransferOptions::new().table_replace(true);

        let summary = engine.store(bytes_table().empty_like(), "t", &options).unwrap();
        assert_eq!(summary.rows, 0);
        assert!(sink.replaced.lock().is_empty());
        assert!(!sink.inner.table_exists("t").unwrap());
    }

    #[test]
    fn test_store_encode_disabled_fails_before_io() {
        let sink = Arc::new(RecordingSink::default());
        let engine = StoreEngine::new(sink.clone());
        let options = TransferOptions::new().encode(false).table_replace(true);

        let err = engine.store(bytes_table(), "t", &options).unwrap_err();
        assert!(matches!(err, FerryError::UnsupportedColumnType { .. }));
        assert!(sink.replaced.lock().is_empty());
        assert!(sink.chunks.lock().is_empty());
    }

    #[test]
    fn test_store_replace_happens_first() {
        let sink = Arc::new(RecordingSink::default());
        let engine = StoreEngine::new(sink.clone());
        let options = TransferOptions::new().chunk_size(2);
        engine.store(bytes_table(), "t", &options).unwrap();
        engine
            .store(bytes_table(), "t", &options.clone().table_replace(true))
            .unwrap();

        assert_eq!(sink.replaced.lock().as_slice(), ["t".to_string()]);
        assert_eq!(sink.inner.count_rows("t", None).unwrap(), 5);
    }

    #[test]
    fn test_store_sidecar_writes_tags() {
        let sink = Arc::new(RecordingSink::default());
        let engine = StoreEngine::new(sink.clone());
        let options = TransferOptions::new().tag_source(TagSource::Sidecar);
        engine.store(bytes_table(), "t", &options).unwrap();

        let rows = sink.inner.snapshot(TAG_TABLE_NAME).unwrap();
        let manifest = TagManifest::from_table(&rows, "t").unwrap();
        assert_eq!(manifest.tag_for("blob"), ColumnTypeTag::Bytes);
    }

    #[test]
    fn test_store_sidecar_append_keeps_tags() {
        let sink = Arc::new(RecordingSink::default());
        let engine = StoreEngine::new(sink.clone());
        let options = TransferOptions::new().tag_source(TagSource::Sidecar);
        engine.store(bytes_table(), "t", &options).unwrap();

        let nulls = Table::new(vec![Column::new("blob", vec![Value::Null])]).unwrap();
        engine.store(nulls, "t", &options).unwrap();
        engine.store(bytes_table(), "t", &options).unwrap();

        let rows = sink.inner.snapshot(TAG_TABLE_NAME).unwrap();
        assert_eq!(rows.num_rows(), 1);
        let manifest = TagManifest::from_table(&rows, "t").unwrap();
        assert_eq!(manifest.tag_for("blob"), ColumnTypeTag::Bytes);
    }

    #[test]
    fn test_store_sidecar_conflict_fails_before_io() {
        let sink = Arc::new(RecordingSink::default());
        let engine = StoreEngine::new(sink.clone());
        let options = TransferOptions::new().tag_source(TagSource::Sidecar);
        engine.store(bytes_table(), "t", &options).unwrap();
        sink.chunks.lock().clear();

        let text = Table::new(vec![Column::new("blob", vec![Value::string("plain")])]).unwrap();
        let err = engine.store(text, "t", &options).unwrap_err();
        assert!(matches!(err, FerryError::UnsupportedColumnType { ref column, .. } if column == "blob"));
        assert!(sink.chunks.lock().is_empty());
        assert_eq!(sink.inner.count_rows("t", None).unwrap(), 5);
    }

    #[test]
    fn test_store_many_sequential() {
        let sink = Arc::new(RecordingSink::default());
        let engine = StoreEngine::new(sink.clone());
        let summaries = engine
            .store_many(
                vec![("a", bytes_table()), ("b", bytes_table())],
                &TransferOptions::default(),
            )
            .unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(sink.inner.table_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_store_rejects_invalid_options() {
        let engine = StoreEngine::new(Arc::new(MemoryBackend::new()));
        let options = TransferOptions::new().chunk_size(0);
        assert!(matches!(
            engine.store(bytes_table(), "t", &options),
            Err(FerryError::InvalidArgument { .. })
        ));
    }
}
