use super::*;
use serde_json::json;

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbConnection::new(":memory:").unwrap();
    assert_eq!(db.db_type(), "duckdb");
    assert!(db.as_database_summarizer().is_some());
    assert!(db.as_table_exists_checker().is_some());
}

#[tokio::test]
async fn test_run_script_and_select() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.run_query_without_result(&Query::new(
        "CREATE TABLE nums AS SELECT * FROM range(3) t(n); INSERT INTO nums VALUES (10);",
    ))
    .await
    .unwrap();

    let rows = db
        .select(&Query::new("SELECT n, 'x' AS tag FROM nums ORDER BY n"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], vec![json!(0), json!("x")]);
    assert_eq!(rows[3][0], json!(10));
}

#[tokio::test]
async fn test_select_runs_variable_definitions_first() {
    let db = DuckDbConnection::in_memory().unwrap();
    let query = Query {
        variable_definitions: vec!["SET VARIABLE threshold = 5".to_string()],
        query: "SELECT getvariable('threshold') + 1".to_string(),
    };
    let rows = db.select(&query).await.unwrap();
    assert_eq!(rows, vec![vec![json!(6)]]);
}

#[tokio::test]
async fn test_select_nulls_and_bools() {
    let db = DuckDbConnection::in_memory().unwrap();
    let rows = db
        .select(&Query::new("SELECT NULL AS a, true AS b, 1.5::DOUBLE AS c"))
        .await
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Null, json!(true), json!(1.5)]]);
}

#[tokio::test]
async fn test_execution_error_carries_sql() {
    let db = DuckDbConnection::in_memory().unwrap();
    let err = db
        .run_query_without_result(&Query::new("SELECT * FROM missing_table"))
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("[D002]"), "{msg}");
    assert!(msg.contains("missing_table"), "{msg}");
}

#[tokio::test]
async fn test_table_exists() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.run_query_without_result(&Query::new(
        "CREATE SCHEMA raw; CREATE TABLE raw.events (id INT)",
    ))
    .await
    .unwrap();

    assert!(db.table_exists("raw", "events").await.unwrap());
    assert!(!db.table_exists("raw", "orders").await.unwrap());
    assert!(!db.table_exists("main", "events").await.unwrap());
}

#[tokio::test]
async fn test_database_summary_groups_tables_by_schema() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.run_query_without_result(&Query::new(
        "CREATE SCHEMA raw; CREATE TABLE raw.events (id INT); CREATE TABLE raw.users (id INT); \
         CREATE TABLE main.orders (id INT)",
    ))
    .await
    .unwrap();

    let summary = db.get_database_summary().await.unwrap();
    assert!(summary.table_exists("raw", "events"));
    assert!(summary.table_exists("raw", "users"));
    assert!(summary.table_exists("main", "orders"));
    assert!(!summary.table_exists("raw", "orders"));
    assert!(summary
        .schemas
        .iter()
        .all(|s| s.name != "information_schema" && s.name != "pg_catalog"));
    let raw = summary.schemas.iter().find(|s| s.name == "raw").unwrap();
    assert_eq!(raw.tables.len(), 2);
}

#[tokio::test]
async fn test_file_backed_connection_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warehouse.duckdb");

    {
        let db = DuckDbConnection::from_path(&path).unwrap();
        db.run_query_without_result(&Query::new("CREATE TABLE kept (id INT)"))
            .await
            .unwrap();
    }

    let db = DuckDbConnection::new(path.to_str().unwrap()).unwrap();
    assert!(db.table_exists("main", "kept").await.unwrap());
}
