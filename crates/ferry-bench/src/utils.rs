//! Benchmark data generators.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use ferry_common::types::{Column, ObjectValue, Table, Value};

/// Generates random alphanumeric text.
pub fn random_string(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A column of random byte payloads of `len` bytes each.
pub fn bytes_column(rows: usize, len: usize) -> Column {
    let mut rng = StdRng::seed_from_u64(42);
    Column::new(
        "payload",
        (0..rows)
            .map(|_| Value::Bytes((0..len).map(|_| rng.gen()).collect()))
            .collect(),
    )
}

/// A column of small structured objects.
pub fn object_column(rows: usize) -> Column {
    let mut rng = StdRng::seed_from_u64(7);
    Column::new(
        "meta",
        (0..rows)
            .map(|i| {
                let tag = random_string(&mut rng, 8);
                Value::Object(ObjectValue::new(json!({
                    "seq": i,
                    "tag": tag,
                    "weights": [rng.gen_range(0..100), rng.gen_range(0..100)],
                })))
            })
            .collect(),
    )
}

/// Keyed rows with a text, a bytes and an object column.
pub fn transfer_table(rows: usize) -> Table {
    let mut rng = StdRng::seed_from_u64(42);
    let names = (0..rows)
        .map(|_| {
            let len = rng.gen_range(4..24);
            Value::String(random_string(&mut rng, len))
        })
        .collect();

    Table::new(vec![
        Column::new("id", (0..rows as i64).map(Value::Int).collect()),
        Column::new("name", names),
        bytes_column(rows, 64),
        object_column(rows),
    ])
    .unwrap_or_else(|_| Table::empty())
}
