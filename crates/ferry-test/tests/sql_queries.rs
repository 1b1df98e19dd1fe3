//! Queries described by SQL text, run against SQLite files.

use ferry_common::config::TransferOptions;
use ferry_common::error::FerryError;
use ferry_common::types::{Table, Value};
use ferry_engine::{extract_select, Ferry};
use ferry_test::sqlite_ferry;
use tempfile::TempDir;

fn users() -> Table {
    Table::from_rows(
        ["name", "age", "avatar"],
        vec![
            vec![Value::string("ann"), Value::Int(34), Value::bytes(b"\x89PNG")],
            vec![Value::string("bob"), Value::Int(25), Value::Null],
            vec![Value::string("cyd"), Value::Int(41), Value::bytes(b"GIF8")],
            vec![Value::string("dee"), Value::Int(30), Value::bytes(b"")],
        ],
    )
    .unwrap()
}

fn seeded(dir: &TempDir) -> Ferry {
    let ferry = sqlite_ferry(dir.path(), "users.db").unwrap();
    ferry
        .store_table(users(), "users", &TransferOptions::default())
        .unwrap();
    ferry
}

#[test]
fn test_extract_simple_select() {
    let statement = extract_select("SELECT name, age FROM users WHERE age > 30").unwrap();
    assert_eq!(statement.table, "users");
    assert_eq!(statement.columns, vec!["name", "age"]);
    assert_eq!(statement.condition.as_deref(), Some("age > 30"));
}

#[test]
fn test_extract_rejects_non_select() {
    for sql in [
        "DELETE FROM users",
        "SELECT 1",
        "SELECT a FROM t1 JOIN t2 ON t1.id = t2.id",
        "SELECT a FROM t WHERE",
    ] {
        let err = extract_select(sql).unwrap_err();
        assert!(matches!(err, FerryError::UnsupportedQuery { .. }), "{}", sql);
    }
}

#[test]
fn test_query_sql_with_condition() {
    let dir = TempDir::new().unwrap();
    let ferry = seeded(&dir);

    let back = ferry
        .query_sql(
            "SELECT name, avatar FROM users WHERE age > 30",
            &TransferOptions::new().chunk_size(1),
        )
        .unwrap()
        .unwrap();

    assert_eq!(back.column_names(), vec!["name", "avatar"]);
    assert_eq!(back.num_rows(), 2);
    assert_eq!(
        back.column("avatar").unwrap().values(),
        &[Value::bytes(b"\x89PNG"), Value::bytes(b"GIF8")]
    );
}

#[test]
fn test_query_sql_no_match_is_absent() {
    let dir = TempDir::new().unwrap();
    let ferry = seeded(&dir);

    let back = ferry
        .query_sql("select * from users where age > 100", &TransferOptions::default())
        .unwrap();
    assert!(back.is_none());
}

#[test]
fn test_raw_sql_and_row_operations() {
    let dir = TempDir::new().unwrap();
    let ferry = seeded(&dir);

    let raw = ferry
        .execute_sql("SELECT avatar FROM users WHERE name = 'ann'")
        .unwrap();
    assert_eq!(raw.column_at(0).unwrap().get(0), &Value::string("base64_encode::iVBORw=="));

    ferry
        .insert_row("users", &["name", "age", "avatar"], &[Value::string("eve"), Value::Int(52), Value::bytes(b"z")])
        .unwrap();
    assert_eq!(ferry.count_rows("users", Some("age >= 30")).unwrap(), 4);

    assert_eq!(ferry.delete_rows("users", Some("age < 30")).unwrap(), 1);
    assert_eq!(ferry.count_rows("users", None).unwrap(), 4);

    ferry.drop_table("users").unwrap();
    assert!(!ferry.table_exists("users").unwrap());
}

#[test]
fn test_driver_errors_surface_with_context() {
    let dir = TempDir::new().unwrap();
    let ferry = seeded(&dir);

    let err = ferry
        .query_sql("SELECT name FROM users WHERE no_such_column = 1", &TransferOptions::default())
        .unwrap_err();
    match err {
        FerryError::Backend { backend, message, .. } => {
            assert_eq!(backend, "sqlite");
            assert!(message.contains("no_such_column"), "{}", message);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
