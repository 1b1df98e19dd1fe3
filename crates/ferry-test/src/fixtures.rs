//! Sample tables.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use ferry_common::types::{Column, ObjectValue, Table, Value};

/// A structured payload stored in opaque columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sensor name.
    pub sensor: String,
    /// Sample values.
    pub samples: Vec<i64>,
    /// Optional calibration note.
    pub note: Option<String>,
}

impl Reading {
    /// A deterministic reading for row `i`.
    pub fn for_row(i: usize) -> Self {
        Self {
            sensor: format!("s{}", i % 7),
            samples: (0..(i % 4) as i64).collect(),
            note: (i % 3 == 0).then(|| format!("calibrated at {}", i)),
        }
    }
}

/// `id` and `label` columns with `rows` rows: `0, "row-0"`, `1, "row-1"`, ...
pub fn numbered_table(rows: usize) -> Table {
    Table::new(vec![
        Column::new("id", (0..rows as i64).map(Value::Int).collect()),
        Column::new(
            "label",
            (0..rows).map(|i| Value::string(format!("row-{}", i))).collect(),
        ),
    ])
    .unwrap_or_else(|_| Table::empty())
}

/// One column of every kind the codec handles end to end.
///
/// Columns: `id` (int key), `name` (string with NULLs), `score` (float),
/// `payload` (bytes with NULLs), `reading` (opaque), `nothing` (all NULL).
pub fn mixed_table(rows: usize) -> Table {
    let mut id = Vec::with_capacity(rows);
    let mut name = Vec::with_capacity(rows);
    let mut score = Vec::with_capacity(rows);
    let mut payload = Vec::with_capacity(rows);
    let mut reading = Vec::with_capacity(rows);

    for i in 0..rows {
        id.push(Value::Int(i as i64));
        name.push(if i % 5 == 4 {
            Value::Null
        } else {
            Value::string(format!("name, \"{}\"", i))
        });
        score.push(Value::Float(i as f64 * 0.25 - 3.5));
        payload.push(if i % 4 == 1 {
            Value::Null
        } else {
            Value::bytes((0..=(i % 9) as u8).map(|b| b.wrapping_mul(37)).collect::<Vec<u8>>())
        });
        reading.push(match ObjectValue::from_typed(&Reading::for_row(i)) {
            Ok(object) => Value::Object(object),
            Err(_) => Value::Null,
        });
    }

    Table::new(vec![
        Column::new("id", id),
        Column::new("name", name),
        Column::new("score", score),
        Column::new("payload", payload),
        Column::new("reading", reading),
        Column::new("nothing", vec![Value::Null; rows]),
    ])
    .unwrap_or_else(|_| Table::empty())
}

/// The five-row byte column `[a, bb, NULL, d, e]`.
pub fn bytes_table() -> Table {
    Table::new(vec![Column::new(
        "blob",
        vec![
            Value::bytes(b"a"),
            Value::bytes(b"bb"),
            Value::Null,
            Value::bytes(b"d"),
            Value::bytes(b"e"),
        ],
    )])
    .unwrap_or_else(|_| Table::empty())
}

/// Random keyed byte rows from a fixed seed.
pub fn random_bytes_table(rows: usize, max_len: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let payload = (0..rows)
        .map(|_| {
            if rng.gen_bool(0.1) {
                Value::Null
            } else {
                let len = rng.gen_range(0..=max_len);
                Value::Bytes((0..len).map(|_| rng.gen::<u8>()).collect())
            }
        })
        .collect();

    Table::new(vec![
        Column::new("id", (0..rows as i64).map(Value::Int).collect()),
        Column::new("payload", payload),
    ])
    .unwrap_or_else(|_| Table::empty())
}

/// Returns the table's rows sorted by the integer key column.
///
/// Stores with several workers commit chunks in completion order; tests
/// that read back without `ORDER BY` compare through this.
pub fn sorted_by_key(table: &Table) -> Table {
    let mut rows: Vec<Vec<Value>> = table.rows().collect();
    rows.sort_by_key(|row| row.first().and_then(Value::as_i64));
    Table::from_rows(table.column_names(), rows).unwrap_or_else(|_| table.empty_like())
}
