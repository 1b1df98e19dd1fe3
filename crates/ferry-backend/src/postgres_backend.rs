//! PostgreSQL backend over the synchronous `postgres` client.
//!
//! Chunks are bulk-loaded with `COPY ... FROM STDIN` in CSV format. Every
//! call opens its own connection.

use std::io::Write;

use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls, Row};

use ferry_common::config::{BackendKind, ConnectionConfig};
use ferry_common::constants::DEFAULT_POSTGRES_PORT;
use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{ObjectValue, Table, TableBuilder, Value};

use crate::sql::{self, infer_schema, ColumnDef, Dialect};
use crate::traits::{Backend, DataSink, DataSource, SelectRequest};

const NAME: &str = "postgresql";
const DIALECT: Dialect = Dialect::Postgres;

fn db_err(operation: &'static str) -> impl Fn(postgres::Error) -> FerryError {
    move |err| FerryError::backend(NAME, operation, err)
}

/// Backend for a PostgreSQL database.
#[derive(Clone)]
pub struct PostgresBackend {
    config: postgres::Config,
    target: String,
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("target", &self.target)
            .finish()
    }
}

impl PostgresBackend {
    /// Creates a backend from a connection config.
    pub fn from_config(config: &ConnectionConfig) -> FerryResult<Self> {
        config.validate()?;
        let mut pg = postgres::Config::new();
        pg.host(&config.host)
            .port(config.port.unwrap_or(DEFAULT_POSTGRES_PORT))
            .dbname(&config.database);
        if let Some(user) = &config.user {
            pg.user(user);
        }
        if let Some(password) = &config.password {
            pg.password(password);
        }
        Ok(Self {
            config: pg,
            target: config.connection_url(),
        })
    }

    fn open(&self) -> FerryResult<Client> {
        self.config.connect(NoTls).map_err(db_err("connect"))
    }

    fn create_if_missing(&self, client: &mut Client, table: &str, template: &Table) -> FerryResult<()> {
        let ddl = sql::create_sql(DIALECT, table, &infer_schema(template), true)?;
        client.batch_execute(&ddl).map_err(db_err("create"))
    }

    fn query_table(
        &self,
        client: &mut Client,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> FerryResult<Table> {
        let stmt = client.prepare(sql).map_err(db_err("prepare"))?;
        let names: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();
        let rows = client.query(&stmt, params).map_err(db_err("select"))?;

        let mut builder = TableBuilder::new(names);
        for row in &rows {
            builder.append_row(row_values(row)?)?;
        }
        builder.build()
    }
}

fn row_values(row: &Row) -> FerryResult<Vec<Value>> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = match *ty {
            Type::BOOL => row.try_get::<_, Option<bool>>(idx).map(|v| v.map(Value::Boolean)),
            Type::INT2 => row
                .try_get::<_, Option<i16>>(idx)
                .map(|v| v.map(|i| Value::Int(i64::from(i)))),
            Type::INT4 => row
                .try_get::<_, Option<i32>>(idx)
                .map(|v| v.map(|i| Value::Int(i64::from(i)))),
            Type::INT8 => row.try_get::<_, Option<i64>>(idx).map(|v| v.map(Value::Int)),
            Type::FLOAT4 => row
                .try_get::<_, Option<f32>>(idx)
                .map(|v| v.map(|f| Value::Float(f64::from(f)))),
            Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map(|v| v.map(Value::Float)),
            Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx).map(|v| v.map(Value::Bytes)),
            Type::JSON | Type::JSONB => row
                .try_get::<_, Option<serde_json::Value>>(idx)
                .map(|v| v.map(|j| Value::Object(ObjectValue::new(j)))),
            _ => row.try_get::<_, Option<String>>(idx).map(|v| v.map(Value::String)),
        }
        .map_err(|err| {
            FerryError::backend(
                NAME,
                "select",
                format!("column {} of type {}: {}", column.name(), ty, err),
            )
        })?;
        values.push(value.unwrap_or(Value::Null));
    }
    Ok(values)
}

impl DataSink for PostgresBackend {
    fn insert_table(&self, chunk: &Table, table: &str) -> FerryResult<usize> {
        if chunk.num_columns() == 0 {
            return Ok(0);
        }
        let mut client = self.open()?;
        self.create_if_missing(&mut client, table, chunk)?;

        let mut payload = String::new();
        sql::write_csv(chunk, &mut payload);

        let copy = sql::copy_in_sql(table, &chunk.column_names());
        let mut writer = client.copy_in(copy.as_str()).map_err(db_err("insert"))?;
        writer
            .write_all(payload.as_bytes())
            .map_err(|e| FerryError::backend(NAME, "insert", e))?;
        let written = writer.finish().map_err(db_err("insert"))?;

        tracing::debug!("postgresql: copied {} rows into {}", written, table);
        Ok(chunk.num_rows())
    }

    fn ensure_table(&self, table: &str, template: &Table) -> FerryResult<()> {
        let mut client = self.open()?;
        self.create_if_missing(&mut client, table, template)
    }

    fn replace_table(&self, table: &str, template: &Table) -> FerryResult<()> {
        let mut client = self.open()?;
        let ddl = sql::create_sql(DIALECT, table, &infer_schema(template), false)?;
        let mut tx = client.transaction().map_err(db_err("replace"))?;
        tx.batch_execute(&sql::drop_sql(table))
            .map_err(db_err("replace"))?;
        tx.batch_execute(&ddl).map_err(db_err("replace"))?;
        tx.commit().map_err(db_err("replace"))
    }

    fn delete_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<usize> {
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let mut client = self.open()?;
        let deleted = client
            .execute(sql::delete_keyed_sql(DIALECT, table, column).as_str(), &[&key])
            .map_err(db_err("delete"))?;
        usize::try_from(deleted).map_err(|e| FerryError::backend(NAME, "delete", e))
    }
}

impl DataSource for PostgresBackend {
    fn select_table(&self, request: &SelectRequest) -> FerryResult<Table> {
        let mut client = self.open()?;
        self.query_table(&mut client, &sql::select_sql(DIALECT, request), &[])
    }

    fn select_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<Table> {
        let mut client = self.open()?;
        self.query_table(&mut client, &sql::select_keyed_sql(DIALECT, table, column), &[&key])
    }

    fn count_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize> {
        let mut client = self.open()?;
        let row = client
            .query_one(sql::count_sql(table, condition).as_str(), &[])
            .map_err(db_err("count"))?;
        let count: i64 = row.try_get(0).map_err(db_err("count"))?;
        usize::try_from(count).map_err(|e| FerryError::backend(NAME, "count", e))
    }

    fn table_exists(&self, table: &str) -> FerryResult<bool> {
        let mut client = self.open()?;
        let row = client
            .query_one("SELECT to_regclass($1) IS NOT NULL", &[&table])
            .map_err(db_err("exists"))?;
        row.try_get(0).map_err(db_err("exists"))
    }
}

impl Backend for PostgresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn execute(&self, sql: &str) -> FerryResult<Table> {
        let mut client = self.open()?;
        self.query_table(&mut client, sql, &[])
    }

    fn create_table(&self, table: &str, columns: &[ColumnDef]) -> FerryResult<()> {
        let mut client = self.open()?;
        client
            .batch_execute(&sql::create_sql(DIALECT, table, columns, false)?)
            .map_err(db_err("create"))
    }

    fn drop_table(&self, table: &str) -> FerryResult<()> {
        let mut client = self.open()?;
        client
            .batch_execute(&sql::drop_sql(table))
            .map_err(db_err("drop"))
    }

    fn delete_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize> {
        let mut client = self.open()?;
        let deleted = client
            .execute(sql::delete_sql(table, condition).as_str(), &[])
            .map_err(db_err("delete"))?;
        usize::try_from(deleted).map_err(|e| FerryError::backend(NAME, "delete", e))
    }
}
