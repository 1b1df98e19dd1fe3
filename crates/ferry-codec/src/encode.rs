//! Value encoding.
//!
//! After encoding, every cell of a table is either NULL or a primitive that
//! any SQL backend can store.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use ferry_common::config::ClassifyMode;
use ferry_common::constants::{BYTES_MARKER, OBJECT_MARKER};
use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Column, ObjectValue, Table, Value};

use crate::classify::classify_table;
use crate::tag::ColumnTypeTag;

/// Encodes a column in place according to its tag.
///
/// `Primitive` columns are left alone. Cells that are already primitive or
/// NULL pass through in every column; a non-primitive cell the column's
/// strategy cannot convert is a [`FerryError::CodecFailure`].
pub fn encode_column(column: &mut Column, tag: ColumnTypeTag) -> FerryResult<()> {
    if tag.is_primitive() {
        return Ok(());
    }

    let name = column.name().to_string();
    for (row, cell) in column.values_mut().iter_mut().enumerate() {
        if let Some(encoded) = encode_value(cell, tag).map_err(|msg| {
            FerryError::codec(&name, format!("row {}: {}", row, msg))
        })? {
            *cell = encoded;
        }
    }
    Ok(())
}

/// Classifies and encodes every column of a table.
///
/// All columns are classified before any is rewritten, so a rejected column
/// leaves the table untouched. With `encode` off, any non-`Primitive`
/// column is rejected with [`FerryError::UnsupportedColumnType`].
pub fn encode_table(
    table: &mut Table,
    mode: ClassifyMode,
    encode: bool,
) -> FerryResult<Vec<ColumnTypeTag>> {
    let tags = classify_table(table, mode)?;

    if !encode {
        if let Some((column, tag)) = table
            .columns()
            .iter()
            .zip(&tags)
            .find(|(_, tag)| !tag.is_primitive())
        {
            return Err(FerryError::UnsupportedColumnType {
                column: column.name().to_string(),
                tag: tag.to_string(),
                reason: "encoding is disabled and SQL cannot store this type".to_string(),
            });
        }
        return Ok(tags);
    }

    for (column, tag) in table.columns_mut().iter_mut().zip(&tags) {
        encode_column(column, *tag)?;
    }
    Ok(tags)
}

/// Returns the replacement for one cell, or `None` to keep it.
fn encode_value(value: &Value, tag: ColumnTypeTag) -> Result<Option<Value>, String> {
    if value.is_null() {
        return Ok(None);
    }

    if tag == ColumnTypeTag::Opaque {
        let object = match value {
            Value::Object(object) => object.clone(),
            other => ObjectValue::from_typed(&plain_json(other)?).map_err(|e| e.to_string())?,
        };
        return encode_object(&object).map(Some);
    }

    match value {
        Value::Bytes(bytes) => Ok(Some(Value::String(encode_bytes(bytes)))),
        Value::FixedInt(v) => v
            .to_i64()
            .map(|i| Some(Value::Int(i)))
            .ok_or_else(|| format!("{} value {} does not fit in 64-bit integer", v.type_name(), v)),
        Value::FixedFloat(v) => Ok(Some(Value::Float(v.to_f64()))),
        Value::Object(_) => Err(format!("object value in a {} column", tag)),
        _ => Ok(None),
    }
}

/// Encodes raw bytes in the tagged text form.
pub(crate) fn encode_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(BYTES_MARKER.len() + bytes.len().div_ceil(3) * 4);
    out.push_str(BYTES_MARKER);
    BASE64.encode_string(bytes, &mut out);
    out
}

/// Serializes an object and encodes it in the tagged text form.
fn encode_object(object: &ObjectValue) -> Result<Value, String> {
    let payload = serde_json::to_vec(object.as_json())
        .map_err(|e| format!("cannot serialize object: {}", e))?;
    let mut out = String::with_capacity(OBJECT_MARKER.len() + payload.len().div_ceil(3) * 4);
    out.push_str(OBJECT_MARKER);
    BASE64.encode_string(&payload, &mut out);
    Ok(Value::String(out))
}

/// Structural form of a non-object cell found in an opaque column.
fn plain_json(value: &Value) -> Result<serde_json::Value, String> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::from(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Value::from(*f),
        Value::String(s) => serde_json::Value::from(s.as_str()),
        Value::Bytes(b) => serde_json::Value::from(b.clone()),
        Value::FixedInt(i) => match i.to_i64() {
            Some(v) => serde_json::Value::from(v),
            None => return Err(format!("{} out of range", i)),
        },
        Value::FixedFloat(f) => serde_json::Value::from(f.to_f64()),
        Value::Object(o) => o.as_json().clone(),
    })
}
