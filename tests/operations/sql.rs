use rusqlite::{Connection, params};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tidepool::core::config::AgentConfig;
use tidepool::core::dispatcher::Dispatcher;
use tidepool::core::error::AgentError;

fn dispatcher_for(root: &Path) -> Dispatcher {
    Dispatcher::new(AgentConfig::for_data_dir(root)).expect("dispatcher")
}

fn seed_tickets(path: &Path, rows: &[(&str, i64, f64)]) {
    let conn = Connection::open(path).expect("open");
    conn.execute_batch("CREATE TABLE tickets (type TEXT, units INTEGER, price DECIMAL);")
        .expect("schema");
    for (kind, units, price) in rows {
        conn.execute(
            "INSERT INTO tickets (type, units, price) VALUES (?1, ?2, ?3)",
            params![kind, units, price],
        )
        .expect("insert");
    }
}

const GOLD_TASK: &str = "The SQLite database file /data/ticket-sales.db has a tickets with columns type, \
units, and price. What is the total sales of all the items in the \"Gold\" ticket type? Write the number \
in /data/ticket-sales-gold.txt";

#[test]
fn gold_sales_total_is_written() {
    let tmp = tempdir().expect("tempdir");
    seed_tickets(
        &tmp.path().join("ticket-sales.db"),
        &[
            ("Gold", 3, 100.5),
            ("gold", 1, 20.0),
            (" GOLD", 100, 1.0),
            ("Silver", 10, 50.0),
            ("Bronze", 4, 12.25),
        ],
    );
    let d = dispatcher_for(tmp.path());
    let outcome = d.run(GOLD_TASK).expect("run");
    assert!(outcome.message.contains("321.5"), "{}", outcome.message);
    assert_eq!(
        fs::read_to_string(tmp.path().join("ticket-sales-gold.txt")).expect("output"),
        "321.5"
    );
}

#[test]
fn gold_sales_with_no_gold_rows_is_zero() {
    let tmp = tempdir().expect("tempdir");
    seed_tickets(&tmp.path().join("ticket-sales.db"), &[("Silver", 2, 10.0)]);
    let d = dispatcher_for(tmp.path());
    d.run(GOLD_TASK).expect("run");
    assert_eq!(
        fs::read_to_string(tmp.path().join("ticket-sales-gold.txt")).expect("output"),
        "0"
    );
}

#[test]
fn missing_database_is_missing_resource() {
    let tmp = tempdir().expect("tempdir");
    let d = dispatcher_for(tmp.path());
    let err = d.run(GOLD_TASK).unwrap_err();
    assert!(matches!(err, AgentError::MissingResource(_)), "{:?}", err);
    assert!(!tmp.path().join("ticket-sales.db").exists());
}

#[test]
fn query_rows_are_comma_separated() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("shop.sqlite");
    let conn = Connection::open(&db).expect("open");
    conn.execute_batch(
        "CREATE TABLE items (name TEXT, qty INTEGER, price REAL);
         INSERT INTO items VALUES ('bolt', 10, 0.25), ('nut', 5, 0.1), ('gear', NULL, 3.0);",
    )
    .expect("seed");
    drop(conn);

    let d = dispatcher_for(tmp.path());
    d.run("Run the SQL query `SELECT name, qty, price FROM items ORDER BY name` on /data/shop.sqlite \
           and save the rows to /data/reports/items.txt")
        .expect("run");
    assert_eq!(
        fs::read_to_string(tmp.path().join("reports/items.txt")).expect("output"),
        "bolt,10,0.25\ngear,NULL,3.0\nnut,5,0.1\n"
    );
}

#[test]
fn query_output_defaults_when_unnamed() {
    let tmp = tempdir().expect("tempdir");
    let conn = Connection::open(tmp.path().join("app.db")).expect("open");
    conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")
        .expect("seed");
    drop(conn);

    let d = dispatcher_for(tmp.path());
    d.run(r#"query app.db with "SELECT x FROM t""#).expect("run");
    assert_eq!(
        fs::read_to_string(tmp.path().join("query-result.txt")).expect("output"),
        "7\n"
    );
}

#[test]
fn mutating_query_is_rejected_at_extraction() {
    let tmp = tempdir().expect("tempdir");
    let conn = Connection::open(tmp.path().join("app.db")).expect("open");
    conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")
        .expect("seed");
    drop(conn);

    let d = dispatcher_for(tmp.path());
    let err = d.run(r#"run SQL "DROP TABLE t" on app.db"#).unwrap_err();
    assert!(
        matches!(err, AgentError::ExtractionError { ref operation_id, .. } if operation_id == "B5"),
        "{:?}",
        err
    );
    let conn = Connection::open(tmp.path().join("app.db")).expect("open");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
        .expect("table survives");
    assert_eq!(count, 1);
}
