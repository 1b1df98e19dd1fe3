//! Output formatting for result tables.
//!
//! Supports table, JSON and CSV output.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use comfy_table::{Cell, ContentArrangement, Table as TextTable};
use serde_json::{json, Value as JsonValue};

use ferry_common::types::{FixedInt, Table, Value};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Formatted table output.
    Table,
    /// JSON array of row objects.
    Json,
    /// CSV with a header row.
    Csv,
}

/// Formats a table according to the specified format.
pub fn format_table(table: &Table, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_text(table),
        OutputFormat::Json => format_json(table),
        OutputFormat::Csv => format_csv(table),
    }
}

/// Summary line printed after a result.
pub fn row_count_line(rows: usize) -> String {
    match rows {
        1 => "(1 row)".to_string(),
        n => format!("({} rows)", n),
    }
}

fn format_text(table: &Table) -> String {
    let mut text = TextTable::new();

    text.set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    if table.num_columns() > 0 {
        text.set_header(table.column_names().into_iter().map(Cell::new));
    }

    for row in table.rows() {
        text.add_row(row.iter().map(|v| Cell::new(v.to_string())));
    }

    text.to_string()
}

fn format_json(table: &Table) -> String {
    let names = table.column_names();
    let rows: Vec<JsonValue> = table
        .rows()
        .map(|row| {
            let obj: serde_json::Map<String, JsonValue> = names
                .iter()
                .zip(row.iter())
                .map(|(name, value)| (name.to_string(), value_to_json(value)))
                .collect();
            JsonValue::Object(obj)
        })
        .collect();

    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

/// Converts a cell to JSON. Bytes become base64 text.
fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => json!(*b),
        Value::Int(i) => json!(*i),
        Value::Float(f) => json!(*f),
        Value::String(s) => json!(s),
        Value::Bytes(b) => json!(BASE64.encode(b)),
        Value::FixedInt(FixedInt::U64(u)) => json!(*u),
        Value::FixedInt(i) => i.to_i64().map_or(JsonValue::Null, JsonValue::from),
        Value::FixedFloat(f) => json!(f.to_f64()),
        Value::Object(o) => o.as_json().clone(),
    }
}

fn format_csv(table: &Table) -> String {
    let mut output = String::new();

    if table.num_columns() > 0 {
        let header: Vec<String> = table.column_names().into_iter().map(escape_csv).collect();
        output.push_str(&header.join(","));
        output.push('\n');
    }

    for row in table.rows() {
        let values: Vec<String> = row
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                other => escape_csv(&other.to_string()),
            })
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
