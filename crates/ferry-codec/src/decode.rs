//! Value decoding.
//!
//! Decoding reverses [`crate::encode_column`]. The column type is recovered
//! either by sniffing the marker on the first non-null cell or from a
//! [`TagManifest`] written alongside the table.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use ferry_common::constants::{BYTES_MARKER, OBJECT_MARKER};
use ferry_common::error::{FerryError, FerryResult};
use ferry_common::types::{Column, ObjectValue, Table, Value};

use crate::manifest::TagManifest;
use crate::tag::ColumnTypeTag;

/// Decodes a column in place by sniffing its first non-null value.
///
/// Returns the tag that was detected. A column whose first non-null cell
/// carries no marker is treated as primitive and left untouched.
pub fn decode_column(column: &mut Column) -> FerryResult<ColumnTypeTag> {
    let tag = sniff(column);
    decode_column_as(column, tag)?;
    Ok(tag)
}

/// Decodes a column in place as the given tag.
///
/// Only `Bytes` and `Opaque` columns carry a text encoding; every other tag
/// is a no-op. Every non-null cell of a prefixed column must hold the
/// marker, otherwise [`FerryError::CodecFailure`] is returned.
pub fn decode_column_as(column: &mut Column, tag: ColumnTypeTag) -> FerryResult<()> {
    if !tag.is_prefixed() {
        return Ok(());
    }

    let name = column.name().to_string();
    for (row, cell) in column.values_mut().iter_mut().enumerate() {
        if cell.is_null() {
            continue;
        }
        let text = cell.as_str().ok_or_else(|| {
            FerryError::codec(
                &name,
                format!("row {}: expected encoded text, found {}", row, cell.type_name()),
            )
        })?;
        *cell = decode_text(text, tag).map_err(|msg| FerryError::codec(&name, format!("row {}: {}", row, msg)))?;
    }
    Ok(())
}

/// Decodes every column of a table by sniffing.
pub fn decode_table(table: &mut Table) -> FerryResult<Vec<ColumnTypeTag>> {
    table.columns_mut().iter_mut().map(decode_column).collect()
}

/// Decodes every column of a table using recorded tags.
///
/// Columns missing from the manifest (aliases, expressions, columns that
/// only ever held NULL) are decoded by sniffing.
pub fn decode_table_with(table: &mut Table, manifest: &TagManifest) -> FerryResult<()> {
    for column in table.columns_mut() {
        match manifest.get(column.name()) {
            Some(tag) => decode_column_as(column, tag)?,
            None => {
                decode_column(column)?;
            }
        }
    }
    Ok(())
}

fn sniff(column: &Column) -> ColumnTypeTag {
    match column.first_non_null().and_then(Value::as_str) {
        Some(s) if s.starts_with(BYTES_MARKER) => ColumnTypeTag::Bytes,
        Some(s) if s.starts_with(OBJECT_MARKER) => ColumnTypeTag::Opaque,
        _ => ColumnTypeTag::Primitive,
    }
}

fn decode_text(text: &str, tag: ColumnTypeTag) -> Result<Value, String> {
    let marker = if tag == ColumnTypeTag::Bytes {
        BYTES_MARKER
    } else {
        OBJECT_MARKER
    };
    let payload = text
        .strip_prefix(marker)
        .ok_or_else(|| format!("value is missing the {:?} marker", marker))?;
    let raw = BASE64
        .decode(payload)
        .map_err(|e| format!("invalid base64 payload: {}", e))?;

    if tag == ColumnTypeTag::Bytes {
        return Ok(Value::Bytes(raw));
    }
    let json: serde_json::Value =
        serde_json::from_slice(&raw).map_err(|e| format!("invalid object payload: {}", e))?;
    Ok(Value::Object(ObjectValue::new(json)))
}
