//! In-memory columnar tables.
//!
//! `Table` is the unit the store and query engines move in and out of SQL.
//! Columns are kept in order and always share one row count; the first
//! column doubles as the logical row key once a table has been through a
//! store/query round trip.

use std::collections::HashSet;
use std::fmt;

use super::Value;
use crate::error::{FerryError, FerryResult};

/// A named column of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The column name.
    name: String,
    /// The values in this column.
    values: Vec<Value>,
}

impl Column {
    /// Creates a new column with the given name and values.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Creates an empty column.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of values in this column.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this column is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at the given index, or NULL when out of range.
    pub fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Null)
    }

    /// Returns the values as a slice.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the values for in-place rewriting.
    ///
    /// A slice is handed out so the column length cannot change.
    pub fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Appends a value to this column.
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Returns the first non-NULL value, the column's classification sample.
    pub fn first_non_null(&self) -> Option<&Value> {
        self.values.iter().find(|v| !v.is_null())
    }

    /// Returns the number of NULL values.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Consumes the column, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn slice(&self, offset: usize, end: usize) -> Self {
        Self::new(self.name.clone(), self.values[offset..end].to_vec())
    }
}

/// An ordered set of equally long, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// The columns in this table.
    columns: Vec<Column>,
    /// Number of rows in this table.
    num_rows: usize,
}

impl Table {
    /// Creates a table, verifying that all columns agree on length and that
    /// names are unique.
    pub fn new(columns: Vec<Column>) -> FerryResult<Self> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);

        let mut seen = HashSet::with_capacity(columns.len());
        for col in &columns {
            if col.len() != num_rows {
                return Err(FerryError::schema_mismatch(format!(
                    "column '{}' has {} rows, expected {}",
                    col.name(),
                    col.len(),
                    num_rows
                )));
            }
            if !seen.insert(col.name()) {
                return Err(FerryError::schema_mismatch(format!(
                    "duplicate column name '{}'",
                    col.name()
                )));
            }
        }

        Ok(Self { columns, num_rows })
    }

    /// Creates a table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a table from row-major data.
    pub fn from_rows<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> FerryResult<Self> {
        let mut builder = TableBuilder::new(names);
        for row in rows {
            builder.append_row(row)?;
        }
        builder.build()
    }

    /// Returns the number of rows in this table.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Returns the number of columns in this table.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if this table has no rows.
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Returns the columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the columns for in-place rewriting.
    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Returns the column at the given position.
    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns the column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Returns the column with the given name, mutably.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name() == name)
    }

    /// Returns the logical row key column (the first column).
    pub fn key_column(&self) -> Option<&Column> {
        self.columns.first()
    }

    /// Returns the row at the given index.
    pub fn row(&self, index: usize) -> Option<Vec<Value>> {
        if index >= self.num_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| c.get(index).clone()).collect())
    }

    /// Returns an iterator over the rows.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.num_rows).map(move |i| self.columns.iter().map(|c| c.get(i).clone()).collect())
    }

    /// Returns a table with the same columns and no rows.
    pub fn empty_like(&self) -> Self {
        Self {
            columns: self.columns.iter().map(|c| Column::empty(c.name())).collect(),
            num_rows: 0,
        }
    }

    /// Slices this table to a range of rows. The range is clamped to the
    /// table end.
    pub fn slice(&self, offset: usize, length: usize) -> FerryResult<Table> {
        if offset > self.num_rows {
            return Err(FerryError::invalid_argument(format!(
                "slice offset {} exceeds row count {}",
                offset, self.num_rows
            )));
        }

        let end = offset.saturating_add(length).min(self.num_rows);
        Ok(Self {
            columns: self.columns.iter().map(|c| c.slice(offset, end)).collect(),
            num_rows: end - offset,
        })
    }

    /// Concatenates tables in order. All tables must have the same column
    /// names in the same order.
    pub fn concat(tables: Vec<Table>) -> FerryResult<Table> {
        let mut iter = tables.into_iter();
        let Some(mut result) = iter.next() else {
            return Ok(Table::empty());
        };

        for table in iter {
            if table.column_names() != result.column_names() {
                return Err(FerryError::schema_mismatch(format!(
                    "cannot concat columns {:?} onto {:?}",
                    table.column_names(),
                    result.column_names()
                )));
            }
            result.num_rows += table.num_rows;
            for (dst, src) in result.columns.iter_mut().zip(table.columns) {
                dst.values.extend(src.values);
            }
        }

        Ok(result)
    }

    /// Appends the rows of `other`, which must have the same column names in
    /// the same order. On mismatch `self` is left unchanged.
    pub fn append(&mut self, other: &Table) -> FerryResult<()> {
        if self.column_names() != other.column_names() {
            return Err(FerryError::schema_mismatch(format!(
                "cannot append columns {:?} onto {:?}",
                other.column_names(),
                self.column_names()
            )));
        }
        self.num_rows += other.num_rows;
        for (dst, src) in self.columns.iter_mut().zip(&other.columns) {
            dst.values.extend_from_slice(&src.values);
        }
        Ok(())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Table ({} rows x {} cols)",
            self.num_rows,
            self.num_columns()
        )?;

        // Header
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", col.name())?;
        }
        writeln!(f)?;

        // Separator
        writeln!(
            f,
            "{}",
            "-".repeat(self.columns.iter().map(|c| c.name().len() + 3).sum::<usize>())
        )?;

        // Data (limit to 10 rows for display)
        let display_rows = self.num_rows.min(10);
        for i in 0..display_rows {
            for (j, col) in self.columns.iter().enumerate() {
                if j > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{}", col.get(i))?;
            }
            writeln!(f)?;
        }

        if self.num_rows > 10 {
            writeln!(f, "... ({} more rows)", self.num_rows - 10)?;
        }

        Ok(())
    }
}

/// Builder for creating tables row by row.
#[derive(Debug)]
pub struct TableBuilder {
    /// Column names.
    names: Vec<String>,
    /// The columns being built.
    columns: Vec<Vec<Value>>,
}

impl TableBuilder {
    /// Creates a new builder with the given column names.
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let columns = vec![Vec::new(); names.len()];
        Self { names, columns }
    }

    /// Appends a row to the table.
    pub fn append_row(&mut self, row: Vec<Value>) -> FerryResult<()> {
        if row.len() != self.columns.len() {
            return Err(FerryError::schema_mismatch(format!(
                "row has {} values, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(value);
        }
        Ok(())
    }

    /// Returns the current number of rows.
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    /// Builds the table.
    pub fn build(self) -> FerryResult<Table> {
        let columns = self
            .names
            .into_iter()
            .zip(self.columns)
            .map(|(name, values)| Column::new(name, values))
            .collect();
        Table::new(columns)
    }
}
