//! Column classification.
//!
//! The default strategy samples one value per column: the first non-NULL
//! cell decides the tag for the whole column and the remaining rows are not
//! checked. A column that mixes types after its first value is a caller
//! error that sampling does not catch. Strict mode pays for a full scan to
//! catch it.

use ferry_common::config::ClassifyMode;
use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Column, Table, Value};

use crate::tag::ColumnTypeTag;

/// Returns the tag a single non-NULL value calls for.
pub fn tag_of(value: &Value) -> ColumnTypeTag {
    match value {
        Value::Null | Value::Boolean(_) | Value::Int(_) | Value::Float(_) | Value::String(_) => {
            ColumnTypeTag::Primitive
        }
        Value::Bytes(_) => ColumnTypeTag::Bytes,
        Value::FixedInt(_) => ColumnTypeTag::FixedInt,
        Value::FixedFloat(_) => ColumnTypeTag::FixedFloat,
        Value::Object(_) => ColumnTypeTag::Opaque,
    }
}

/// Classifies a column from its first non-NULL value.
///
/// An all-NULL column is `Primitive`.
pub fn classify(column: &Column) -> ColumnTypeTag {
    column
        .first_non_null()
        .map(tag_of)
        .unwrap_or(ColumnTypeTag::Primitive)
}

/// Classifies a column after checking that every non-NULL value agrees.
pub fn classify_strict(column: &Column) -> FerryResult<ColumnTypeTag> {
    let mut values = column.iter().enumerate().filter(|(_, v)| !v.is_null());

    let Some((_, first)) = values.next() else {
        return Ok(ColumnTypeTag::Primitive);
    };
    let expected = tag_of(first);

    for (row, value) in values {
        let found = tag_of(value);
        if found != expected {
            return Err(FerryError::UnsupportedColumnType {
                column: column.name().to_string(),
                tag: "mixed".to_string(),
                reason: format!(
                    "row {} holds a {} value ({}) in a {} column",
                    row,
                    value.type_name(),
                    found,
                    expected
                ),
            });
        }
    }

    Ok(expected)
}

/// Classifies a column with the given strategy.
pub fn classify_with(column: &Column, mode: ClassifyMode) -> FerryResult<ColumnTypeTag> {
    match mode {
        ClassifyMode::Sample => Ok(classify(column)),
        ClassifyMode::Strict => classify_strict(column),
    }
}

/// Classifies every column of a table, in column order.
pub fn classify_table(table: &Table, mode: ClassifyMode) -> FerryResult<Vec<ColumnTypeTag>> {
    table
        .columns()
        .iter()
        .map(|column| classify_with(column, mode))
        .collect()
}
