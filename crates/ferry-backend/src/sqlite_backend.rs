//! SQLite backend over `rusqlite`.
//!
//! Every call opens the database file, does its work and closes it again.
//! A chunk insert runs in one immediate transaction with a single prepared
//! statement, so concurrent writers queue on the busy timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Params, TransactionBehavior};

use ferry_common::config::{BackendKind, ConnectionConfig};
use ferry_common::constants::SQLITE_BUSY_TIMEOUT_MS;
use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Table, TableBuilder, Value};

use crate::sql::{self, infer_schema, ColumnDef, Dialect};
use crate::traits::{Backend, DataSink, DataSource, SelectRequest};

const NAME: &str = "sqlite";
const DIALECT: Dialect = Dialect::Sqlite;

fn db_err(operation: &'static str) -> impl Fn(rusqlite::Error) -> FerryError {
    move |err| FerryError::backend(NAME, operation, err)
}

/// Backend for a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteBackend {
    /// Creates a backend for the database file at `path`.
    ///
    /// In-memory databases are rejected: every call opens its own
    /// connection, so they would not outlive a single call.
    pub fn new(path: impl AsRef<Path>) -> FerryResult<Self> {
        let path = path.as_ref();
        let text = path.to_string_lossy();
        if text.is_empty() || text == ":memory:" {
            return Err(FerryError::config(
                "sqlite needs a database file; use the memory backend for in-process tables",
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            busy_timeout: Duration::from_millis(SQLITE_BUSY_TIMEOUT_MS),
        })
    }

    /// Creates a backend from a connection config.
    pub fn from_config(config: &ConnectionConfig) -> FerryResult<Self> {
        Self::new(&config.database)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> FerryResult<Connection> {
        let conn = Connection::open(&self.path).map_err(db_err("connect"))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(db_err("connect"))?;
        Ok(conn)
    }

    fn create_if_missing(&self, conn: &Connection, table: &str, template: &Table) -> FerryResult<()> {
        let ddl = sql::create_sql(DIALECT, table, &infer_schema(template), true)?;
        conn.execute(&ddl, []).map_err(db_err("create"))?;
        Ok(())
    }
}

fn to_sql(value: &Value) -> FerryResult<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::FixedInt(i) => SqlValue::Integer(i.to_i64().ok_or_else(|| {
            FerryError::backend(NAME, "insert", format!("{} does not fit in INTEGER", i))
        })?),
        Value::FixedFloat(f) => SqlValue::Real(f.to_f64()),
        Value::Object(o) => SqlValue::Text(o.to_string()),
    })
}

fn from_sql(value: ValueRef<'_>) -> FerryResult<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::String(
            std::str::from_utf8(t)
                .map_err(|e| FerryError::backend(NAME, "select", format!("text decode failed: {}", e)))?
                .to_string(),
        ),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    })
}

/// Runs a query and collects every row into a table.
fn query_table(conn: &Connection, sql: &str, params: impl Params) -> FerryResult<Table> {
    let mut stmt = conn.prepare(sql).map_err(db_err("prepare"))?;
    let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let width = names.len();
    let mut builder = TableBuilder::new(names);

    let mut rows = stmt.query(params).map_err(db_err("select"))?;
    while let Some(row) = rows.next().map_err(db_err("select"))? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(from_sql(row.get_ref(i).map_err(db_err("select"))?)?);
        }
        builder.append_row(values)?;
    }
    builder.build()
}

impl DataSink for SqliteBackend {
    fn insert_table(&self, chunk: &Table, table: &str) -> FerryResult<usize> {
        if chunk.num_columns() == 0 {
            return Ok(0);
        }
        let mut conn = self.open()?;
        self.create_if_missing(&conn, table, chunk)?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err("insert"))?;
        {
            let names = chunk.column_names();
            let mut stmt = tx
                .prepare(&sql::insert_sql(DIALECT, table, &names))
                .map_err(db_err("insert"))?;
            for row in chunk.rows() {
                let params = row.iter().map(to_sql).collect::<FerryResult<Vec<_>>>()?;
                stmt.execute(params_from_iter(params))
                    .map_err(db_err("insert"))?;
            }
        }
        tx.commit().map_err(db_err("insert"))?;

        tracing::debug!("sqlite: inserted {} rows into {}", chunk.num_rows(), table);
        Ok(chunk.num_rows())
    }

    fn ensure_table(&self, table: &str, template: &Table) -> FerryResult<()> {
        let conn = self.open()?;
        self.create_if_missing(&conn, table, template)
    }

    fn replace_table(&self, table: &str, template: &Table) -> FerryResult<()> {
        let mut conn = self.open()?;
        let ddl = sql::create_sql(DIALECT, table, &infer_schema(template), false)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err("replace"))?;
        tx.execute(&sql::drop_sql(table), [])
            .map_err(db_err("replace"))?;
        tx.execute(&ddl, []).map_err(db_err("replace"))?;
        tx.commit().map_err(db_err("replace"))?;
        Ok(())
    }

    fn delete_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<usize> {
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let conn = self.open()?;
        conn.execute(&sql::delete_keyed_sql(DIALECT, table, column), [key])
            .map_err(db_err("delete"))
    }
}

impl DataSource for SqliteBackend {
    fn select_table(&self, request: &SelectRequest) -> FerryResult<Table> {
        let conn = self.open()?;
        query_table(&conn, &sql::select_sql(DIALECT, request), [])
    }

    fn select_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<Table> {
        let conn = self.open()?;
        query_table(&conn, &sql::select_keyed_sql(DIALECT, table, column), [key])
    }

    fn count_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize> {
        let conn = self.open()?;
        let count: i64 = conn
            .query_row(&sql::count_sql(table, condition), [], |row| row.get(0))
            .map_err(db_err("count"))?;
        usize::try_from(count).map_err(|e| FerryError::backend(NAME, "count", e))
    }

    fn table_exists(&self, table: &str) -> FerryResult<bool> {
        let conn = self.open()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err("exists"))?;
        Ok(found.is_some())
    }
}

impl Backend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn execute(&self, sql: &str) -> FerryResult<Table> {
        let conn = self.open()?;
        let returns_rows = conn
            .prepare(sql)
            .map_err(db_err("prepare"))?
            .column_count()
            > 0;
        if returns_rows {
            return query_table(&conn, sql, []);
        }
        conn.execute_batch(sql).map_err(db_err("execute"))?;
        Ok(Table::empty())
    }

    fn create_table(&self, table: &str, columns: &[ColumnDef]) -> FerryResult<()> {
        let conn = self.open()?;
        conn.execute(&sql::create_sql(DIALECT, table, columns, false)?, [])
            .map_err(db_err("create"))?;
        Ok(())
    }

    fn drop_table(&self, table: &str) -> FerryResult<()> {
        let conn = self.open()?;
        conn.execute(&sql::drop_sql(table), [])
            .map_err(db_err("drop"))?;
        Ok(())
    }

    fn delete_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize> {
        let conn = self.open()?;
        conn.execute(&sql::delete_sql(table, condition), [])
            .map_err(db_err("delete"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_common::types::Column;
    use tempfile::TempDir;

    fn backend(dir: &TempDir) -> SqliteBackend {
        SqliteBackend::new(dir.path().join("test.db")).unwrap()
    }

    fn sample() -> Table {
        Table::new(vec![
            Column::new("id", vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            Column::new(
                "name",
                vec![Value::string("a"), Value::Null, Value::string("c")],
            ),
            Column::new(
                "score",
                vec![Value::Float(0.5), Value::Float(1.5), Value::Null],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_in_memory_path() {
        assert!(SqliteBackend::new(":memory:").is_err());
    }

    #[test]
    fn test_insert_creates_table() {
        let dir = TempDir::new().unwrap();
        let db = backend(&dir);
        assert!(!db.table_exists("t").unwrap());

        assert_eq!(db.insert_table(&sample(), "t").unwrap(), 3);
        assert!(db.table_exists("t").unwrap());
        db.insert_table(&sample(), "t").unwrap();
        assert_eq!(db.count_rows("t", None).unwrap(), 6);
        assert_eq!(db.count_rows("t", Some("id > 1")).unwrap(), 4);
    }

    #[test]
    fn test_select_round_trip() {
        let dir = TempDir::new().unwrap();
        let db = backend(&dir);
        db.insert_table(&sample(), "t").unwrap();

        let all = db
            .select_table(&SelectRequest::new("t").with_order_by(Some("id")))
            .unwrap();
        assert_eq!(all, sample());

        let page = db
            .select_table(
                &SelectRequest::new("t")
                    .with_columns(["name"])
                    .with_order_by(Some("id"))
                    .page(1, 1),
            )
            .unwrap();
        assert_eq!(page.num_rows(), 1);
        assert_eq!(page.column("name").unwrap().get(0), &Value::Null);
    }

    #[test]
    fn test_blob_and_text_values() {
        let dir = TempDir::new().unwrap();
        let db = backend(&dir);
        let table = Table::new(vec![
            Column::new("raw", vec![Value::bytes([0_u8, 255])]),
            Column::new("note", vec![Value::string("")]),
        ])
        .unwrap();
        db.insert_table(&table, "b").unwrap();
        assert_eq!(db.select_table(&SelectRequest::new("b")).unwrap(), table);
    }

    #[test]
    fn test_replace_table_empties() {
        let dir = TempDir::new().unwrap();
        let db = backend(&dir);
        db.insert_table(&sample(), "t").unwrap();
        db.replace_table("t", &sample()).unwrap();
        assert_eq!(db.count_rows("t", None).unwrap(), 0);
        assert!(db.table_exists("t").unwrap());
    }

    #[test]
    fn test_execute_and_ddl() {
        let dir = TempDir::new().unwrap();
        let db = backend(&dir);
        db.create_table(
            "kv",
            &[
                ColumnDef::new("k", crate::sql::SqlType::Text),
                ColumnDef::new("v", crate::sql::SqlType::BigInt),
            ],
        )
        .unwrap();
        db.insert_row("kv", &["k", "v"], &[Value::string("a"), Value::Int(7)])
            .unwrap();

        let result = db.execute("SELECT k, v FROM kv").unwrap();
        assert_eq!(result.row(0).unwrap(), vec![Value::string("a"), Value::Int(7)]);

        let none = db.execute("UPDATE kv SET v = 8").unwrap();
        assert_eq!(none.num_columns(), 0);

        assert_eq!(db.delete_rows("kv", Some("k = 'a'")).unwrap(), 1);
        db.drop_table("kv").unwrap();
        assert!(!db.table_exists("kv").unwrap());
    }

    #[test]
    fn test_keyed_select_and_delete() {
        let dir = TempDir::new().unwrap();
        let db = backend(&dir);
        assert_eq!(db.delete_keyed("t", "name", "a").unwrap(), 0);

        db.insert_table(&sample(), "t").unwrap();
        db.insert_table(&sample(), "t").unwrap();
        let found = db.select_keyed("t", "name", "a").unwrap();
        assert_eq!(found.num_rows(), 2);
        assert_eq!(found.column("id").unwrap().get(0), &Value::Int(1));
        assert_eq!(db.select_keyed("t", "name", "a' OR 1=1 --").unwrap().num_rows(), 0);

        assert_eq!(db.delete_keyed("t", "name", "c").unwrap(), 2);
        assert_eq!(db.count_rows("t", None).unwrap(), 4);
    }

    #[test]
    fn test_driver_error_has_context() {
        let dir = TempDir::new().unwrap();
        let db = backend(&dir);
        let err = db.count_rows("missing", None).unwrap_err();
        assert!(matches!(err, FerryError::Backend { backend: "sqlite", operation: "count", .. }));
    }
}
