//! Capability traits implemented by every backend.

use ferry_common::config::BackendKind;
use ferry_common::constants::ALL_COLUMNS;
use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Column, Table, Value};

use crate::sql::ColumnDef;

/// One page of a select.
///
/// Column specs, the table name, the condition and the ordering are SQL
/// fragments passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectRequest {
    /// Source table.
    pub table: String,
    /// Column specs; empty selects every column.
    pub columns: Vec<String>,
    /// Optional `WHERE` condition.
    pub condition: Option<String>,
    /// Optional `ORDER BY` clause body.
    pub order_by: Option<String>,
    /// Maximum number of rows; `None` means unbounded.
    pub limit: Option<usize>,
    /// Number of rows to skip.
    pub offset: usize,
}

impl SelectRequest {
    /// Selects every row and column of a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Sets the column specs. A single `*` is the same as none.
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = columns
            .into_iter()
            .map(Into::into)
            .filter(|c: &String| c.trim() != ALL_COLUMNS)
            .collect();
        self
    }

    /// Sets the `WHERE` condition.
    pub fn with_condition(mut self, condition: Option<impl Into<String>>) -> Self {
        self.condition = condition.map(Into::into);
        self
    }

    /// Sets the `ORDER BY` clause.
    pub fn with_order_by(mut self, order_by: Option<impl Into<String>>) -> Self {
        self.order_by = order_by.map(Into::into);
        self
    }

    /// Restricts the request to one page.
    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Whether all columns are requested.
    pub fn selects_all(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Append-side capability: receives chunks of already-encoded rows.
///
/// Every value handed to a sink is NULL or primitive.
pub trait DataSink: Send + Sync {
    /// Appends the rows of `chunk` to `table`, creating the table from the
    /// chunk's schema if it does not exist. Returns the number of rows
    /// written.
    fn insert_table(&self, chunk: &Table, table: &str) -> FerryResult<usize>;

    /// Creates `table` from the schema of `template` if it does not exist.
    fn ensure_table(&self, table: &str, template: &Table) -> FerryResult<()>;

    /// Drops `table` if present and recreates it, empty, from the schema of
    /// `template`.
    fn replace_table(&self, table: &str, template: &Table) -> FerryResult<()>;

    /// Deletes every row of `table` whose `column` holds the text `key`.
    /// A missing table deletes nothing. Returns the number of rows deleted.
    fn delete_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<usize>;
}

/// Read-side capability: paginated selects and counts.
pub trait DataSource: Send + Sync {
    /// Fetches exactly the requested page.
    fn select_table(&self, request: &SelectRequest) -> FerryResult<Table>;

    /// Fetches every row of `table` whose `column` holds the text `key`.
    ///
    /// The default reads the whole table and filters it in process; SQL
    /// backends bind the key into the statement instead.
    fn select_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<Table> {
        let rows = self.select_table(&SelectRequest::new(table))?;
        retain_rows(&rows, column, |value| value.as_str() == Some(key))
    }

    /// Counts the rows of `table` matching `condition`.
    fn count_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize>;

    /// Whether a table exists.
    fn table_exists(&self, table: &str) -> FerryResult<bool>;
}

/// A full backend: both capabilities plus pass-through operations.
pub trait Backend: DataSink + DataSource {
    /// Backend kind.
    fn kind(&self) -> BackendKind;

    /// Executes one raw SQL statement. Statements that return rows yield
    /// them as a table; others yield an empty table.
    fn execute(&self, sql: &str) -> FerryResult<Table>;

    /// Creates a table from explicit column definitions.
    fn create_table(&self, table: &str, columns: &[ColumnDef]) -> FerryResult<()>;

    /// Drops a table if it exists.
    fn drop_table(&self, table: &str) -> FerryResult<()>;

    /// Deletes the rows matching `condition` (all rows when `None`).
    /// Returns the number of rows deleted.
    fn delete_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize>;

    /// Inserts one row.
    fn insert_row(&self, table: &str, columns: &[&str], values: &[Value]) -> FerryResult<()> {
        let row = single_row(columns, values)?;
        self.insert_table(&row, table).map(|_| ())
    }
}

/// Keeps the rows whose value in `column` satisfies `keep`.
pub(crate) fn retain_rows(
    rows: &Table,
    column: &str,
    keep: impl Fn(&Value) -> bool,
) -> FerryResult<Table> {
    let keys = rows.column(column).ok_or_else(|| {
        FerryError::schema_mismatch(format!("no column {} to match rows on", column))
    })?;
    let kept: Vec<usize> = keys
        .iter()
        .enumerate()
        .filter(|(_, value)| keep(*value))
        .map(|(row, _)| row)
        .collect();
    Table::new(
        rows.columns()
            .iter()
            .map(|c| Column::new(c.name(), kept.iter().map(|&row| c.get(row).clone()).collect()))
            .collect(),
    )
}

/// Builds a one-row table from parallel name and value lists.
pub(crate) fn single_row(columns: &[&str], values: &[Value]) -> FerryResult<Table> {
    if columns.len() != values.len() {
        return Err(FerryError::invalid_argument(format!(
            "{} columns but {} values",
            columns.len(),
            values.len()
        )));
    }
    if columns.is_empty() {
        return Err(FerryError::invalid_argument("a row needs at least one column"));
    }
    Table::new(
        columns
            .iter()
            .zip(values)
            .map(|(name, value)| Column::new(*name, vec![value.clone()]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_request_builder() {
        let request = SelectRequest::new("users")
            .with_columns(["name", "age"])
            .with_condition(Some("age > 30"))
            .page(100, 50);
        assert_eq!(request.columns, vec!["name", "age"]);
        assert_eq!(request.condition.as_deref(), Some("age > 30"));
        assert_eq!((request.offset, request.limit), (100, Some(50)));
        assert!(request.order_by.is_none());
    }

    #[test]
    fn test_star_selects_all() {
        let request = SelectRequest::new("t").with_columns(["*"]);
        assert!(request.selects_all());
    }

    #[test]
    fn test_retain_rows() {
        let rows = Table::from_rows(
            ["k", "v"],
            vec![
                vec![Value::string("a"), Value::Int(1)],
                vec![Value::string("b"), Value::Int(2)],
                vec![Value::string("a"), Value::Int(3)],
            ],
        )
        .unwrap();
        let kept = retain_rows(&rows, "k", |v| v.as_str() == Some("a")).unwrap();
        assert_eq!(kept.column("v").unwrap().values(), &[Value::Int(1), Value::Int(3)]);
        assert!(matches!(
            retain_rows(&rows, "missing", |_| true),
            Err(FerryError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_single_row() {
        let row = single_row(&["a", "b"], &[Value::Int(1), Value::Null]).unwrap();
        assert_eq!(row.num_rows(), 1);
        assert_eq!(row.row(0).unwrap(), vec![Value::Int(1), Value::Null]);

        assert!(single_row(&["a"], &[]).is_err());
        assert!(single_row(&[], &[]).is_err());
    }
}
