//! Subcommand implementations.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use ferry_common::config::TransferOptions;
use ferry_engine::Ferry;

use crate::config::load_file;
use crate::formatter::{format_table, row_count_line, OutputFormat};

/// Runs a chunked query and prints the decoded result.
pub fn query(ferry: &Ferry, sql: &str, options: &TransferOptions, format: OutputFormat) -> Result<String> {
    info!("Querying: {}", sql);

    match ferry.query_sql(sql, options)? {
        Some(table) => Ok(with_footer(format_table(&table, format), table.num_rows(), format)),
        None => Ok(row_count_line(0)),
    }
}

/// Executes raw SQL, printing rows when the statement returns any.
pub fn execute(ferry: &Ferry, sql: &str, format: OutputFormat) -> Result<String> {
    info!("Executing: {}", sql);

    let table = ferry.execute_sql(sql)?;
    if table.num_columns() == 0 {
        return Ok("OK".to_string());
    }
    Ok(with_footer(format_table(&table, format), table.num_rows(), format))
}

/// Counts rows, optionally filtered.
pub fn count(ferry: &Ferry, table: &str, condition: Option<&str>) -> Result<String> {
    let rows = ferry.count_rows(table, condition)?;
    Ok(rows.to_string())
}

/// Drops a table if it exists.
pub fn drop(ferry: &Ferry, table: &str) -> Result<String> {
    ferry.drop_table(table)?;
    Ok(format!("DROP TABLE {}", table))
}

/// Copies a table from `source` into the connection described by
/// `destination`.
pub fn copy(
    source: &Ferry,
    table: &str,
    destination: &Path,
    dest_table: Option<&str>,
    options: &TransferOptions,
) -> Result<String> {
    let dest_config = load_file(destination)?;
    let dest = Ferry::connect(&dest_config)
        .with_context(|| format!("cannot connect to {}", dest_config.connection_url()))?;
    copy_between(source, &dest, table, dest_table.unwrap_or(table), options)
}

/// Chunked query from `source`, chunked store into `dest`.
pub fn copy_between(
    source: &Ferry,
    dest: &Ferry,
    table: &str,
    dest_table: &str,
    options: &TransferOptions,
) -> Result<String> {
    let Some(rows) = source.query_table(table, options)? else {
        info!("Source table {} is empty, nothing to copy", table);
        return Ok(format!("COPY 0 ({} is empty)", table));
    };

    let summary = dest.store_table(rows, dest_table, options)?;
    info!(
        "Copied {} rows from {} to {} in {} chunks",
        summary.rows, table, dest_table, summary.chunks
    );
    Ok(format!("COPY {}", summary.rows))
}

fn with_footer(body: String, rows: usize, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format!("{}\n{}", body, row_count_line(rows)),
        OutputFormat::Json | OutputFormat::Csv => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_common::config::ConnectionConfig;
    use ferry_common::types::{Table, Value};

    fn seeded() -> Ferry {
        let ferry = Ferry::connect(&ConnectionConfig::memory()).unwrap();
        let table = Table::from_rows(
            ["id", "blob"],
            vec![
                vec![Value::Int(1), Value::bytes(b"x")],
                vec![Value::Int(2), Value::Null],
                vec![Value::Int(3), Value::bytes(b"zz")],
            ],
        )
        .unwrap();
        ferry
            .store_table(table, "items", &TransferOptions::default())
            .unwrap();
        ferry
    }

    #[test]
    fn test_query_json() {
        let ferry = seeded();
        let out = query(&ferry, "SELECT * FROM items", &TransferOptions::new(), OutputFormat::Json).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2]["blob"], "eno=");
    }

    #[test]
    fn test_query_empty_table() {
        let ferry = Ferry::connect(&ConnectionConfig::memory()).unwrap();
        ferry
            .create_table_like("empty", &Table::from_rows(["a"], vec![vec![Value::Int(1)]]).unwrap())
            .unwrap();
        let out = query(&ferry, "SELECT * FROM empty", &TransferOptions::new(), OutputFormat::Table).unwrap();
        assert_eq!(out, "(0 rows)");
    }

    #[test]
    fn test_count_and_drop() {
        let ferry = seeded();
        assert_eq!(count(&ferry, "items", None).unwrap(), "3");
        assert_eq!(drop(&ferry, "items").unwrap(), "DROP TABLE items");
        assert!(!ferry.table_exists("items").unwrap());
    }

    #[test]
    fn test_copy_between() {
        let source = seeded();
        let dest = Ferry::connect(&ConnectionConfig::memory()).unwrap();
        let options = TransferOptions::new().chunk_size(1).max_workers(1);

        let out = copy_between(&source, &dest, "items", "items_copy", &options).unwrap();
        assert_eq!(out, "COPY 3");

        let copied = dest.query_table("items_copy", &options).unwrap().unwrap();
        let original = source.query_table("items", &options).unwrap().unwrap();
        assert_eq!(copied, original);
    }

    #[test]
    fn test_execute_unsupported_on_memory() {
        let ferry = seeded();
        assert!(execute(&ferry, "SELECT 1", OutputFormat::Table).is_err());
    }
}
