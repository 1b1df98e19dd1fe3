//! SQL text generation shared by the SQL backends.
//!
//! Table names, column specs, conditions and orderings supplied by callers
//! are SQL fragments and are inserted verbatim. Column names taken from a
//! [`Table`] are quoted for the dialect.

use std::fmt::{self, Write};

use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Table, Value};

use crate::traits::SelectRequest;

/// SQL dialect of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL.
    Postgres,
    /// MySQL / MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// Quotes an identifier.
    pub fn quote_ident(self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Bind parameter for the 1-based position `n`.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", n),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// `LIMIT` value meaning "no limit", for dialects that need one before
    /// `OFFSET`.
    fn unbounded_limit(self) -> Option<&'static str> {
        match self {
            Dialect::Postgres => None,
            Dialect::MySql => Some("18446744073709551615"),
            Dialect::Sqlite => Some("-1"),
        }
    }
}

/// Column storage type used when a table is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    /// Boolean.
    Boolean,
    /// 64-bit integer.
    BigInt,
    /// 64-bit float.
    Double,
    /// Unbounded text.
    Text,
    /// Binary.
    Blob,
    /// Any other type name, passed through.
    Custom(String),
}

impl SqlType {
    /// Type name in the given dialect.
    pub fn render(&self, dialect: Dialect) -> &str {
        match (self, dialect) {
            (SqlType::Boolean, _) => "BOOLEAN",
            (SqlType::BigInt, _) => "BIGINT",
            (SqlType::Double, Dialect::Postgres) => "DOUBLE PRECISION",
            (SqlType::Double, _) => "DOUBLE",
            (SqlType::Text, Dialect::MySql) => "LONGTEXT",
            (SqlType::Text, _) => "TEXT",
            (SqlType::Blob, Dialect::Postgres) => "BYTEA",
            (SqlType::Blob, Dialect::MySql) => "LONGBLOB",
            (SqlType::Blob, Dialect::Sqlite) => "BLOB",
            (SqlType::Custom(name), _) => name,
        }
    }

    /// Storage type for a value. NULL has none.
    pub fn for_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Boolean(_) => Some(SqlType::Boolean),
            Value::Int(_) | Value::FixedInt(_) => Some(SqlType::BigInt),
            Value::Float(_) | Value::FixedFloat(_) => Some(SqlType::Double),
            Value::String(_) | Value::Object(_) => Some(SqlType::Text),
            Value::Bytes(_) => Some(SqlType::Blob),
        }
    }
}

impl std::str::FromStr for SqlType {
    type Err = FerryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(FerryError::invalid_argument("empty column type"));
        }
        Ok(match name.to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => SqlType::Boolean,
            "INT" | "INTEGER" | "BIGINT" | "INT8" => SqlType::BigInt,
            "REAL" | "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => SqlType::Double,
            "TEXT" | "STRING" | "LONGTEXT" => SqlType::Text,
            "BLOB" | "BYTEA" | "BYTES" | "LONGBLOB" => SqlType::Blob,
            _ => SqlType::Custom(name.to_string()),
        })
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render(Dialect::Sqlite))
    }
}

/// One column of a `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Storage type.
    pub sql_type: SqlType,
}

impl ColumnDef {
    /// Creates a column definition.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// Derives column definitions from a table's first non-null values.
///
/// Columns with no non-null value become text.
pub fn infer_schema(table: &Table) -> Vec<ColumnDef> {
    table
        .columns()
        .iter()
        .map(|column| {
            let sql_type = column
                .first_non_null()
                .and_then(SqlType::for_value)
                .unwrap_or(SqlType::Text);
            ColumnDef::new(column.name(), sql_type)
        })
        .collect()
}

/// `SELECT` for one page.
pub fn select_sql(dialect: Dialect, request: &SelectRequest) -> String {
    let columns = if request.selects_all() {
        "*".to_string()
    } else {
        request.columns.join(", ")
    };
    let mut sql = format!("SELECT {} FROM {}", columns, request.table);
    push_where(&mut sql, request.condition.as_deref());
    if let Some(order_by) = &request.order_by {
        let _ = write!(sql, " ORDER BY {}", order_by);
    }
    match (request.limit, request.offset) {
        (Some(limit), 0) => {
            let _ = write!(sql, " LIMIT {}", limit);
        }
        (Some(limit), offset) => {
            let _ = write!(sql, " LIMIT {} OFFSET {}", limit, offset);
        }
        (None, 0) => {}
        (None, offset) => {
            if let Some(all) = dialect.unbounded_limit() {
                let _ = write!(sql, " LIMIT {}", all);
            }
            let _ = write!(sql, " OFFSET {}", offset);
        }
    }
    sql
}

/// `SELECT COUNT(*)`.
pub fn count_sql(table: &str, condition: Option<&str>) -> String {
    let mut sql = format!("SELECT COUNT(*) FROM {}", table);
    push_where(&mut sql, condition);
    sql
}

/// `DELETE`.
pub fn delete_sql(table: &str, condition: Option<&str>) -> String {
    let mut sql = format!("DELETE FROM {}", table);
    push_where(&mut sql, condition);
    sql
}

/// `SELECT` of the rows whose `column` equals the first bind parameter.
pub fn select_keyed_sql(dialect: Dialect, table: &str, column: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = {}",
        table,
        dialect.quote_ident(column),
        dialect.placeholder(1)
    )
}

/// `DELETE` of the rows whose `column` equals the first bind parameter.
pub fn delete_keyed_sql(dialect: Dialect, table: &str, column: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {} = {}",
        table,
        dialect.quote_ident(column),
        dialect.placeholder(1)
    )
}

/// `DROP TABLE IF EXISTS`.
pub fn drop_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", table)
}

/// `CREATE TABLE`, optionally guarded with `IF NOT EXISTS`.
pub fn create_sql(
    dialect: Dialect,
    table: &str,
    columns: &[ColumnDef],
    if_not_exists: bool,
) -> FerryResult<String> {
    if columns.is_empty() {
        return Err(FerryError::invalid_argument(format!(
            "table {} needs at least one column",
            table
        )));
    }
    let defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", dialect.quote_ident(&c.name), c.sql_type.render(dialect)))
        .collect();
    let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
    Ok(format!("CREATE TABLE {}{} ({})", guard, table, defs.join(", ")))
}

/// Parameterized `INSERT` for one row.
pub fn insert_sql(dialect: Dialect, table: &str, columns: &[&str]) -> String {
    let names: Vec<String> = columns.iter().map(|c| dialect.quote_ident(c)).collect();
    let params: Vec<String> = (1..=columns.len()).map(|n| dialect.placeholder(n)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        params.join(", ")
    )
}

/// PostgreSQL `COPY ... FROM STDIN` in CSV format.
pub fn copy_in_sql(table: &str, columns: &[&str]) -> String {
    let names: Vec<String> = columns
        .iter()
        .map(|c| Dialect::Postgres.quote_ident(c))
        .collect();
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv)",
        table,
        names.join(", ")
    )
}

/// Renders the rows of a table as CSV for `COPY ... FROM STDIN`.
///
/// NULL is an unquoted empty field; every text value is quoted, so an empty
/// string stays distinct from NULL.
pub fn write_csv(table: &Table, out: &mut String) {
    for row in 0..table.num_rows() {
        for (i, column) in table.columns().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_csv_value(column.get(row), out);
        }
        out.push('\n');
    }
}

fn write_csv_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(i) => {
            let _ = write!(out, "{}", i);
        }
        Value::Float(f) => write_float(*f, out),
        Value::FixedInt(i) => {
            let _ = write!(out, "{}", i);
        }
        Value::FixedFloat(f) => write_float(f.to_f64(), out),
        Value::String(s) => push_quoted(s, out),
        Value::Bytes(bytes) => {
            out.push_str("\\x");
            for b in bytes {
                let _ = write!(out, "{:02x}", b);
            }
        }
        Value::Object(o) => push_quoted(&o.to_string(), out),
    }
}

fn write_float(f: f64, out: &mut String) {
    if f.is_nan() {
        out.push_str("NaN");
    } else if f.is_infinite() {
        out.push_str(if f > 0.0 { "Infinity" } else { "-Infinity" });
    } else {
        let _ = write!(out, "{}", f);
    }
}

fn push_quoted(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

fn push_where(sql: &mut String, condition: Option<&str>) {
    if let Some(condition) = condition.map(str::trim).filter(|c| !c.is_empty()) {
        let _ = write!(sql, " WHERE {}", condition);
    }
}
