//! Sidecar column tags.
//!
//! A [`TagManifest`] records the [`ColumnTypeTag`] of every column written to
//! a table. Stored next to the data, it lets a reader decode without guessing
//! from cell contents, so plain text that happens to start with a marker is
//! never misread.

use std::collections::BTreeMap;

use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Column, Table, Value};

use crate::tag::ColumnTypeTag;

/// Column names of the sidecar table.
pub const MANIFEST_COLUMNS: [&str; 3] = ["table_name", "column_name", "tag"];

/// Mapping from column name to its recorded tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagManifest {
    tags: BTreeMap<String, ColumnTypeTag>,
}

impl TagManifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a manifest from a table's columns and their tags.
    pub fn from_tags(table: &Table, tags: &[ColumnTypeTag]) -> FerryResult<Self> {
        if table.num_columns() != tags.len() {
            return Err(FerryError::internal(format!(
                "{} tags for {} columns",
                tags.len(),
                table.num_columns()
            )));
        }
        let tags = table
            .column_names()
            .into_iter()
            .map(str::to_string)
            .zip(tags.iter().copied())
            .collect();
        Ok(Self { tags })
    }

    /// Builds a manifest from the columns of `table` that hold a value.
    ///
    /// An all-NULL column carries no type information and is left out, so
    /// it cannot mask a tag recorded by an earlier batch.
    pub fn observed(table: &Table, tags: &[ColumnTypeTag]) -> FerryResult<Self> {
        let mut manifest = Self::from_tags(table, tags)?;
        for column in table.columns() {
            if column.first_non_null().is_none() {
                manifest.tags.remove(column.name());
            }
        }
        Ok(manifest)
    }

    /// Entries of `incoming` that are not recorded here yet.
    ///
    /// A column already recorded with a tag that reads back the same way is
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::UnsupportedColumnType`] when a column is
    /// recorded with a tag that decodes differently from the incoming one.
    pub fn additions(&self, incoming: &TagManifest) -> FerryResult<TagManifest> {
        let mut added = Self::new();
        for (column, tag) in incoming.iter() {
            match self.get(column) {
                None => added.insert(column, tag),
                Some(recorded) if reads_alike(recorded, tag) => {}
                Some(recorded) => {
                    return Err(FerryError::UnsupportedColumnType {
                        column: column.to_string(),
                        tag: tag.to_string(),
                        reason: format!("column is already recorded as {}", recorded),
                    })
                }
            }
        }
        Ok(added)
    }

    /// Records the tag of one column.
    pub fn insert(&mut self, column: impl Into<String>, tag: ColumnTypeTag) {
        self.tags.insert(column.into(), tag);
    }

    /// Recorded tag of a column.
    pub fn get(&self, column: &str) -> Option<ColumnTypeTag> {
        self.tags.get(column).copied()
    }

    /// Tag of a column; unknown columns are primitive.
    pub fn tag_for(&self, column: &str) -> ColumnTypeTag {
        self.tags
            .get(column)
            .copied()
            .unwrap_or(ColumnTypeTag::Primitive)
    }

    /// Number of recorded columns.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates recorded columns in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnTypeTag)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Renders the manifest as rows of the sidecar table.
    pub fn to_table(&self, table_name: &str) -> FerryResult<Table> {
        let n = self.tags.len();
        let mut owners = Vec::with_capacity(n);
        let mut names = Vec::with_capacity(n);
        let mut tags = Vec::with_capacity(n);
        for (column, tag) in &self.tags {
            owners.push(Value::string(table_name));
            names.push(Value::string(column.as_str()));
            tags.push(Value::Int(i64::from(tag.as_i8())));
        }
        Table::new(vec![
            Column::new(MANIFEST_COLUMNS[0], owners),
            Column::new(MANIFEST_COLUMNS[1], names),
            Column::new(MANIFEST_COLUMNS[2], tags),
        ])
    }

    /// Parses the sidecar rows that belong to `table_name`.
    ///
    /// A column may appear more than once only with the same tag. Without a
    /// `table_name` column every row is taken.
    pub fn from_table(rows: &Table, table_name: &str) -> FerryResult<Self> {
        let (names, tags) = match (rows.column(MANIFEST_COLUMNS[1]), rows.column(MANIFEST_COLUMNS[2])) {
            (Some(n), Some(t)) => (n, t),
            _ => {
                return Err(FerryError::schema_mismatch(format!(
                    "tag table needs columns {} and {}",
                    MANIFEST_COLUMNS[1], MANIFEST_COLUMNS[2]
                )))
            }
        };
        let owners = rows.column(MANIFEST_COLUMNS[0]);

        let mut manifest = Self::new();
        for row in 0..rows.num_rows() {
            if let Some(owners) = owners {
                if owners.get(row).as_str() != Some(table_name) {
                    continue;
                }
            }
            let name = names.get(row);
            let name = name.as_str().ok_or_else(|| {
                FerryError::schema_mismatch(format!(
                    "column name must be text, got {}",
                    name.type_name()
                ))
            })?;
            let tag = tags.get(row);
            let tag = tag.as_i64().ok_or_else(|| {
                FerryError::schema_mismatch(format!(
                    "tag must be an integer, got {}",
                    tag.type_name()
                ))
            })?;
            let tag = ColumnTypeTag::from_stored(tag)?;
            match manifest.get(name) {
                Some(recorded) if recorded != tag => {
                    return Err(FerryError::schema_mismatch(format!(
                        "column {}.{} is recorded as both {} and {}",
                        table_name, name, recorded, tag
                    )))
                }
                _ => manifest.insert(name, tag),
            }
        }
        Ok(manifest)
    }
}

/// Whether two tags decode stored cells the same way.
fn reads_alike(a: ColumnTypeTag, b: ColumnTypeTag) -> bool {
    a == b || (!a.is_prefixed() && !b.is_prefixed())
}
