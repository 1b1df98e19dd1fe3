//! MySQL backend over the synchronous `mysql` client.
//!
//! A chunk insert runs as one batched prepared statement inside a
//! transaction. Every call opens its own connection.

use mysql::consts::ColumnType;
use mysql::prelude::Queryable;
use mysql::{Conn, Opts, OptsBuilder, Params, Row, TxOpts, Value as MyValue};

use ferry_common::config::{BackendKind, ConnectionConfig};
use ferry_common::constants::DEFAULT_MYSQL_PORT;
use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Table, TableBuilder, Value};

use crate::sql::{self, infer_schema, ColumnDef, Dialect};
use crate::traits::{Backend, DataSink, DataSource, SelectRequest};

const NAME: &str = "mysql";
const DIALECT: Dialect = Dialect::MySql;

/// Character set number MySQL reports for binary columns.
const BINARY_CHARSET: u16 = 63;

fn db_err(operation: &'static str) -> impl Fn(mysql::Error) -> FerryError {
    move |err| FerryError::backend(NAME, operation, err)
}

/// Backend for a MySQL database.
#[derive(Clone)]
pub struct MySqlBackend {
    opts: Opts,
    target: String,
}

impl std::fmt::Debug for MySqlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlBackend")
            .field("target", &self.target)
            .finish()
    }
}

impl MySqlBackend {
    /// Creates a backend from a connection config.
    pub fn from_config(config: &ConnectionConfig) -> FerryResult<Self> {
        config.validate()?;
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port.unwrap_or(DEFAULT_MYSQL_PORT))
            .db_name(Some(config.database.clone()))
            .user(config.user.clone())
            .pass(config.password.clone());
        Ok(Self {
            opts: opts.into(),
            target: config.connection_url(),
        })
    }

    fn open(&self) -> FerryResult<Conn> {
        Conn::new(self.opts.clone()).map_err(db_err("connect"))
    }

    fn create_if_missing(&self, conn: &mut Conn, table: &str, template: &Table) -> FerryResult<()> {
        let ddl = sql::create_sql(DIALECT, table, &infer_schema(template), true)?;
        conn.query_drop(ddl).map_err(db_err("create"))
    }

    fn query_table(&self, conn: &mut Conn, sql: &str, params: impl Into<Params>) -> FerryResult<Table> {
        let mut result = conn.exec_iter(sql, params).map_err(db_err("select"))?;
        let (names, binary): (Vec<String>, Vec<bool>) = {
            let columns = result.columns();
            columns
                .as_ref()
                .iter()
                .map(|c| {
                    let binary =
                        c.character_set() == BINARY_CHARSET && is_string_type(c.column_type());
                    (c.name_str().into_owned(), binary)
                })
                .unzip()
        };

        let mut builder = TableBuilder::new(names);
        for row in result.by_ref() {
            let row = row.map_err(db_err("select"))?;
            builder.append_row(row_values(&row, &binary))?;
        }
        builder.build()
    }
}

fn is_string_type(ty: ColumnType) -> bool {
    matches!(
        ty,
        ColumnType::MYSQL_TYPE_BLOB
            | ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
            | ColumnType::MYSQL_TYPE_VARCHAR
            | ColumnType::MYSQL_TYPE_VAR_STRING
            | ColumnType::MYSQL_TYPE_STRING
    )
}

fn row_values(row: &Row, binary: &[bool]) -> Vec<Value> {
    (0..row.len())
        .map(|i| {
            let raw = row.as_ref(i).cloned().unwrap_or(MyValue::NULL);
            from_mysql(raw, binary.get(i).copied().unwrap_or(false))
        })
        .collect()
}

fn from_mysql(value: MyValue, binary: bool) -> Value {
    match value {
        MyValue::NULL => Value::Null,
        MyValue::Int(i) => Value::Int(i),
        MyValue::UInt(u) => i64::try_from(u)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::String(u.to_string())),
        MyValue::Float(f) => Value::Float(f64::from(f)),
        MyValue::Double(f) => Value::Float(f),
        MyValue::Bytes(bytes) if binary => Value::Bytes(bytes),
        MyValue::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::String(text),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        MyValue::Date(y, mo, d, h, mi, s, us) => Value::String(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            y, mo, d, h, mi, s, us
        )),
        MyValue::Time(neg, days, h, mi, s, us) => Value::String(format!(
            "{}{:02}:{:02}:{:02}.{:06}",
            if neg { "-" } else { "" },
            u32::from(h) + days * 24,
            mi,
            s,
            us
        )),
    }
}

fn to_mysql(value: &Value) -> FerryResult<MyValue> {
    Ok(match value {
        Value::Null => MyValue::NULL,
        Value::Boolean(b) => MyValue::Int(i64::from(*b)),
        Value::Int(i) => MyValue::Int(*i),
        Value::Float(f) => MyValue::Double(*f),
        Value::String(s) => MyValue::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => MyValue::Bytes(b.clone()),
        Value::FixedInt(i) => MyValue::Int(i.to_i64().ok_or_else(|| {
            FerryError::backend(NAME, "insert", format!("{} does not fit in BIGINT", i))
        })?),
        Value::FixedFloat(f) => MyValue::Double(f.to_f64()),
        Value::Object(o) => MyValue::Bytes(o.to_string().into_bytes()),
    })
}

impl DataSink for MySqlBackend {
    fn insert_table(&self, chunk: &Table, table: &str) -> FerryResult<usize> {
        if chunk.num_columns() == 0 {
            return Ok(0);
        }
        let mut conn = self.open()?;
        self.create_if_missing(&mut conn, table, chunk)?;

        let params = chunk
            .rows()
            .map(|row| row.iter().map(to_mysql).collect::<FerryResult<Vec<_>>>())
            .collect::<FerryResult<Vec<_>>>()?;
        let stmt = sql::insert_sql(DIALECT, table, &chunk.column_names());

        let mut tx = conn
            .start_transaction(TxOpts::default())
            .map_err(db_err("insert"))?;
        tx.exec_batch(stmt, params).map_err(db_err("insert"))?;
        tx.commit().map_err(db_err("insert"))?;

        tracing::debug!("mysql: inserted {} rows into {}", chunk.num_rows(), table);
        Ok(chunk.num_rows())
    }

    fn ensure_table(&self, table: &str, template: &Table) -> FerryResult<()> {
        let mut conn = self.open()?;
        self.create_if_missing(&mut conn, table, template)
    }

    fn replace_table(&self, table: &str, template: &Table) -> FerryResult<()> {
        // MySQL DDL commits implicitly, so the drop and create are not atomic.
        let mut conn = self.open()?;
        let ddl = sql::create_sql(DIALECT, table, &infer_schema(template), false)?;
        conn.query_drop(sql::drop_sql(table))
            .map_err(db_err("replace"))?;
        conn.query_drop(ddl).map_err(db_err("replace"))
    }

    fn delete_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<usize> {
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let mut conn = self.open()?;
        conn.exec_drop(sql::delete_keyed_sql(DIALECT, table, column), (key,))
            .map_err(db_err("delete"))?;
        usize::try_from(conn.affected_rows()).map_err(|e| FerryError::backend(NAME, "delete", e))
    }
}

impl DataSource for MySqlBackend {
    fn select_table(&self, request: &SelectRequest) -> FerryResult<Table> {
        let mut conn = self.open()?;
        self.query_table(&mut conn, &sql::select_sql(DIALECT, request), ())
    }

    fn select_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<Table> {
        let mut conn = self.open()?;
        self.query_table(&mut conn, &sql::select_keyed_sql(DIALECT, table, column), (key,))
    }

    fn count_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize> {
        let mut conn = self.open()?;
        let count: Option<i64> = conn
            .query_first(sql::count_sql(table, condition))
            .map_err(db_err("count"))?;
        usize::try_from(count.unwrap_or(0)).map_err(|e| FerryError::backend(NAME, "count", e))
    }

    fn table_exists(&self, table: &str) -> FerryResult<bool> {
        let mut conn = self.open()?;
        let count: Option<i64> = conn
            .exec_first(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?",
                (table,),
            )
            .map_err(db_err("exists"))?;
        Ok(count.unwrap_or(0) > 0)
    }
}

impl Backend for MySqlBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    fn execute(&self, sql: &str) -> FerryResult<Table> {
        let mut conn = self.open()?;
        self.query_table(&mut conn, sql, ())
    }

    fn create_table(&self, table: &str, columns: &[ColumnDef]) -> FerryResult<()> {
        let mut conn = self.open()?;
        conn.query_drop(sql::create_sql(DIALECT, table, columns, false)?)
            .map_err(db_err("create"))
    }

    fn drop_table(&self, table: &str) -> FerryResult<()> {
        let mut conn = self.open()?;
        conn.query_drop(sql::drop_sql(table))
            .map_err(db_err("drop"))
    }

    fn delete_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize> {
        let mut conn = self.open()?;
        conn.query_drop(sql::delete_sql(table, condition))
            .map_err(db_err("delete"))?;
        usize::try_from(conn.affected_rows()).map_err(|e| FerryError::backend(NAME, "delete", e))
    }
}
