//! In-process backend.
//!
//! Tables live in a map guarded by a read-write lock. Rows keep insertion
//! order, so pagination is stable without an ordering clause. Conditions are
//! SQL text and cannot be evaluated here; requests that carry one are
//! rejected.

use std::cmp::Ordering;
use std::collections::HashMap;

use parking_lot::RwLock;

use ferry_common::config::BackendKind;
use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Column, Table, Value};

use crate::sql::ColumnDef;
use crate::traits::{retain_rows, Backend, DataSink, DataSource, SelectRequest};

const NAME: &str = "memory";

/// Backend that keeps tables in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of a stored table.
    pub fn snapshot(&self, table: &str) -> Option<Table> {
        self.tables.read().get(table).cloned()
    }

    /// Names of the stored tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

fn reject_condition(condition: Option<&str>) -> FerryResult<()> {
    match condition.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => Err(FerryError::unsupported_query(format!(
            "memory backend cannot evaluate condition {:?}",
            c
        ))),
        None => Ok(()),
    }
}

fn missing(table: &str) -> FerryError {
    FerryError::backend(NAME, "select", format!("no such table: {}", table))
}

impl DataSink for MemoryBackend {
    fn insert_table(&self, chunk: &Table, table: &str) -> FerryResult<usize> {
        let mut tables = self.tables.write();
        let stored = tables
            .entry(table.to_string())
            .or_insert_with(|| chunk.empty_like());

        stored.append(chunk)?;
        Ok(chunk.num_rows())
    }

    fn ensure_table(&self, table: &str, template: &Table) -> FerryResult<()> {
        self.tables
            .write()
            .entry(table.to_string())
            .or_insert_with(|| template.empty_like());
        Ok(())
    }

    fn replace_table(&self, table: &str, template: &Table) -> FerryResult<()> {
        self.tables
            .write()
            .insert(table.to_string(), template.empty_like());
        Ok(())
    }

    fn delete_keyed(&self, table: &str, column: &str, key: &str) -> FerryResult<usize> {
        let mut tables = self.tables.write();
        let Some(stored) = tables.get_mut(table) else {
            return Ok(0);
        };
        let kept = retain_rows(stored, column, |value| value.as_str() != Some(key))?;
        let deleted = stored.num_rows() - kept.num_rows();
        *stored = kept;
        Ok(deleted)
    }
}

impl DataSource for MemoryBackend {
    fn select_table(&self, request: &SelectRequest) -> FerryResult<Table> {
        reject_condition(request.condition.as_deref())?;

        let tables = self.tables.read();
        let stored = tables.get(&request.table).ok_or_else(|| missing(&request.table))?;

        let projected = if request.selects_all() {
            stored.clone()
        } else {
            let columns = request
                .columns
                .iter()
                .map(|name| {
                    stored.column(name.trim()).cloned().ok_or_else(|| {
                        FerryError::backend(
                            NAME,
                            "select",
                            format!("no such column: {}", name),
                        )
                    })
                })
                .collect::<FerryResult<Vec<Column>>>()?;
            Table::new(columns)?
        };
        drop(tables);

        let ordered = match &request.order_by {
            Some(order_by) => sort_table(&projected, order_by)?,
            None => projected,
        };

        let len = request.limit.unwrap_or(usize::MAX);
        if request.offset >= ordered.num_rows() {
            return Ok(ordered.empty_like());
        }
        ordered.slice(request.offset, len)
    }

    fn count_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize> {
        reject_condition(condition)?;
        self.tables
            .read()
            .get(table)
            .map(Table::num_rows)
            .ok_or_else(|| missing(table))
    }

    fn table_exists(&self, table: &str) -> FerryResult<bool> {
        Ok(self.tables.read().contains_key(table))
    }
}

impl Backend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn execute(&self, sql: &str) -> FerryResult<Table> {
        Err(FerryError::unsupported_query(format!(
            "memory backend does not execute SQL: {}",
            sql
        )))
    }

    fn create_table(&self, table: &str, columns: &[ColumnDef]) -> FerryResult<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(table) {
            return Err(FerryError::backend(
                NAME,
                "create",
                format!("table {} already exists", table),
            ));
        }
        let empty = Table::new(columns.iter().map(|c| Column::empty(c.name.as_str())).collect())?;
        tables.insert(table.to_string(), empty);
        Ok(())
    }

    fn drop_table(&self, table: &str) -> FerryResult<()> {
        self.tables.write().remove(table);
        Ok(())
    }

    fn delete_rows(&self, table: &str, condition: Option<&str>) -> FerryResult<usize> {
        reject_condition(condition)?;
        let mut tables = self.tables.write();
        let stored = tables.get_mut(table).ok_or_else(|| missing(table))?;
        let deleted = stored.num_rows();
        *stored = stored.empty_like();
        Ok(deleted)
    }
}

/// Sorts by one column, `"<column> [ASC|DESC]"`. The sort is stable.
fn sort_table(table: &Table, order_by: &str) -> FerryResult<Table> {
    let mut parts = order_by.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let descending = match parts.next().map(|d| d.to_ascii_uppercase()) {
        None => false,
        Some(d) if d == "ASC" => false,
        Some(d) if d == "DESC" => true,
        Some(_) => {
            return Err(FerryError::unsupported_query(format!(
                "memory backend cannot order by {:?}",
                order_by
            )))
        }
    };
    if parts.next().is_some() {
        return Err(FerryError::unsupported_query(format!(
            "memory backend orders by a single column, got {:?}",
            order_by
        )));
    }
    let key = table.column(name).ok_or_else(|| {
        FerryError::backend(NAME, "select", format!("no such column: {}", name))
    })?;

    let mut order: Vec<usize> = (0..table.num_rows()).collect();
    order.sort_by(|&a, &b| {
        let ord = compare(key.get(a), key.get(b));
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });

    let columns = table
        .columns()
        .iter()
        .map(|c| Column::new(c.name(), order.iter().map(|&i| c.get(i).clone()).collect()))
        .collect();
    Table::new(columns)
}

/// Orders NULL first, then booleans, numbers, text, bytes, objects.
fn compare(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Int(_) | Value::Float(_) | Value::FixedInt(_) | Value::FixedFloat(_) => 2,
            Value::String(_) => 3,
            Value::Bytes(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        _ if rank(a) == 2 && rank(b) == 2 => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a
                .as_f64()
                .unwrap_or(f64::NAN)
                .total_cmp(&b.as_f64().unwrap_or(f64::NAN)),
        },
        _ => rank(a).cmp(&rank(b)),
    }
}
