//! Reading and clearing the sidecar column tags of one table.

use ferry_backend::{DataSink, DataSource};
use ferry_codec::{TagManifest, MANIFEST_COLUMNS};
use ferry_common::constants::TAG_TABLE_NAME;
use ferry_common::error::FerryResult;

/// Column of the tag table that names the owning table.
const OWNER_COLUMN: &str = MANIFEST_COLUMNS[0];

/// Tags recorded for `table`; empty when nothing was recorded.
pub(crate) fn recorded_tags<S: ?Sized + DataSource>(source: &S, table: &str) -> FerryResult<TagManifest> {
    if !source.table_exists(TAG_TABLE_NAME)? {
        return Ok(TagManifest::new());
    }
    let rows = source.select_keyed(TAG_TABLE_NAME, OWNER_COLUMN, table)?;
    TagManifest::from_table(&rows, table)
}

/// Removes every tag recorded for `table`.
pub(crate) fn clear_tags<S: ?Sized + DataSink>(sink: &S, table: &str) -> FerryResult<usize> {
    let cleared = sink.delete_keyed(TAG_TABLE_NAME, OWNER_COLUMN, table)?;
    if cleared > 0 {
        tracing::debug!("Cleared {} recorded tags of {}", cleared, table);
    }
    Ok(cleared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_backend::MemoryBackend;
    use ferry_codec::ColumnTypeTag;

    #[test]
    fn test_recorded_tags_per_table() {
        let backend = MemoryBackend::new();
        assert!(recorded_tags(&backend, "a").unwrap().is_empty());

        let mut a = TagManifest::new();
        a.insert("blob", ColumnTypeTag::Bytes);
        let mut b = TagManifest::new();
        b.insert("blob", ColumnTypeTag::Opaque);
        backend.insert_table(&a.to_table("a").unwrap(), TAG_TABLE_NAME).unwrap();
        backend.insert_table(&b.to_table("b").unwrap(), TAG_TABLE_NAME).unwrap();

        assert_eq!(recorded_tags(&backend, "a").unwrap(), a);
        assert_eq!(clear_tags(&backend, "a").unwrap(), 1);
        assert!(recorded_tags(&backend, "a").unwrap().is_empty());
        assert_eq!(recorded_tags(&backend, "b").unwrap(), b);
    }
}
