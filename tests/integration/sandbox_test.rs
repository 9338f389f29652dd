//! Executor integration tests.
//!
//! Run statements against the bundled dataset through the SQLite sandbox.

use pretty_assertions::assert_eq;
use sql_practice::compare::compare_results;
use sql_practice::db::{DatasetScript, QueryEngine, QueryResult, SqliteSandbox, Value};

fn sandbox() -> SqliteSandbox {
    SqliteSandbox::new(DatasetScript::bundled())
}

#[tokio::test]
async fn test_bundled_dataset_tables() {
    let engine = sandbox();
    for (table, expected) in [("customers", 5), ("products", 6), ("transactions", 14)] {
        let result = engine
            .execute(&format!("SELECT COUNT(*) AS n FROM {table}"))
            .await;
        let set = result.result_set().expect("tabular result");
        assert_eq!(set.rows[0].get("n"), Some(&Value::Int(expected)), "{table}");
    }
}

#[tokio::test]
async fn test_select_all_products() {
    let result = sandbox().execute("SELECT * FROM products").await;
    let set = result.result_set().expect("tabular result");

    assert_eq!(
        set.columns,
        vec!["ProductID", "ProductName", "Category", "Price"]
    );
    assert_eq!(set.row_count(), 6);
    for row in &set.rows {
        assert_eq!(row.len(), set.columns.len());
    }
}

#[tokio::test]
async fn test_reloading_gives_identical_results() {
    let sql = "SELECT c.Region, SUM(t.TotalValue) AS total
               FROM transactions t JOIN customers c ON c.CustomerID = t.CustomerID
               GROUP BY c.Region";
    let first = sandbox().execute(sql).await;
    let second = sandbox().execute(sql).await;

    assert_eq!(first, second);
    assert!(compare_results(&first, &second).matches);
}

#[tokio::test]
async fn test_mutations_do_not_persist() {
    let engine = sandbox();

    let deleted = engine.execute("DELETE FROM transactions").await;
    assert_eq!(deleted, QueryResult::Affected { rows_affected: 14 });

    let result = engine
        .execute("SELECT COUNT(*) AS n FROM transactions")
        .await;
    let set = result.result_set().expect("tabular result");
    assert_eq!(set.rows[0].get("n"), Some(&Value::Int(14)));
}

#[tokio::test]
async fn test_affected_rows_message() {
    let result = sandbox()
        .execute("UPDATE products SET Price = Price * 2 WHERE Category = 'Electronics'")
        .await;

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "success": true,
            "message": "Query executed successfully. Rows affected: 2",
            "row_count": 2
        })
    );
}

#[tokio::test]
async fn test_engine_error_is_reported() {
    let result = sandbox().execute("SELECT * FROM orders").await;
    assert_eq!(result.error(), Some("SQL Error: no such table: orders"));
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let result = sandbox()
        .execute("SELECT ProductID, Price FROM products WHERE Price > 1000")
        .await;
    let set = result.result_set().expect("tabular result");
    assert_eq!(set.columns, vec!["ProductID", "Price"]);
    assert!(set.is_empty());
}

#[tokio::test]
async fn test_custom_dataset_script() {
    let dataset = DatasetScript::parse(
        "CREATE TABLE t (a INTEGER, b TEXT);
         INSERT INTO t VALUES (1, 'x'), (2, NULL);
         -- the next statement fails and is skipped
         INSERT INTO missing VALUES (3);",
    );
    let result = SqliteSandbox::new(dataset)
        .execute("SELECT a, b FROM t ORDER BY a")
        .await;

    let set = result.result_set().expect("tabular result");
    assert_eq!(set.row_count(), 2);
    assert_eq!(set.rows[1].get("b"), Some(&Value::Null));
}
