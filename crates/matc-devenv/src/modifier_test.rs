use super::*;
use async_trait::async_trait;
use matc_core::DbSchema;
use matc_db::{Connection, ConnectionManager, DbResult, DuckDbConnection, StaticPipeline};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const QUERY: &str = "select * from schema1.table1 t1 join schema2.table1 t2 using (someid)";

/// Summary-capable connection that counts fetches
struct SummaryConnection {
    summary: Option<DbDatabase>,
    delay: Duration,
    fetches: AtomicUsize,
}

impl SummaryConnection {
    fn new(summary: DbDatabase) -> Self {
        Self {
            summary: Some(summary),
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            summary: None,
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
        }
    }

    fn slow(summary: DbDatabase) -> Self {
        Self {
            delay: Duration::from_millis(50),
            ..Self::new(summary)
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for SummaryConnection {
    async fn run_query_without_result(&self, _query: &Query) -> DbResult<()> {
        Ok(())
    }

    async fn select(&self, _query: &Query) -> DbResult<Vec<Vec<Value>>> {
        Ok(Vec::new())
    }

    fn db_type(&self) -> &'static str {
        "summary"
    }

    fn as_database_summarizer(&self) -> Option<&dyn DatabaseSummarizer> {
        Some(self)
    }
}

#[async_trait]
impl DatabaseSummarizer for SummaryConnection {
    async fn get_database_summary(&self) -> DbResult<DbDatabase> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.summary
            .clone()
            .ok_or_else(|| matc_db::DbError::ExecutionError("failed to get db summary".to_string()))
    }
}

/// Connection without the summary capability
struct PlainConnection;

#[async_trait]
impl Connection for PlainConnection {
    async fn run_query_without_result(&self, _query: &Query) -> DbResult<()> {
        Ok(())
    }

    async fn select(&self, _query: &Query) -> DbResult<Vec<Vec<Value>>> {
        Ok(Vec::new())
    }

    fn db_type(&self) -> &'static str {
        "plain"
    }
}

fn summary() -> DbDatabase {
    DbDatabase {
        name: "db1".to_string(),
        schemas: vec![
            DbSchema::with_tables("schema1", &["table1", "table2"]),
            DbSchema::with_tables("schema2", &["table1", "table2"]),
            DbSchema::with_tables("dev_schema1", &["table1", "table2"]),
        ],
    }
}

fn asset() -> Asset {
    Asset::new("schema1.table1").with_type("pg.sql")
}

fn pipeline() -> StaticPipeline {
    StaticPipeline::new("pipeline", "postgres-default")
}

fn dev() -> Option<DevEnvironment> {
    Some(DevEnvironment::new("dev", "dev_"))
}

fn modifier_with(conn: Arc<dyn Connection>, env: Option<DevEnvironment>) -> DevEnvQueryModifier {
    DevEnvQueryModifier::new(
        Dialect::Postgres,
        Arc::new(ConnectionManager::new().with("postgres-default", conn)),
        env,
    )
}

#[tokio::test]
async fn test_no_environment_returns_query_unchanged() {
    let m = modifier_with(Arc::new(PlainConnection), None);
    let out = m.modify(&pipeline(), &asset(), &Query::new("select 1")).await.unwrap();
    assert_eq!(out, Query::new("select 1"));
}

#[tokio::test]
async fn test_empty_prefix_returns_query_unchanged() {
    let m = modifier_with(
        Arc::new(PlainConnection),
        Some(DevEnvironment::new("dev", "")),
    );
    let out = m.modify(&pipeline(), &asset(), &Query::new("select 1")).await.unwrap();
    assert_eq!(out, Query::new("select 1"));
}

#[tokio::test]
async fn test_non_two_part_asset_is_untouched() {
    let m = modifier_with(Arc::new(PlainConnection), dev());
    let out = m
        .modify(&pipeline(), &Asset::new("proj.schema1.table1"), &Query::new(QUERY))
        .await
        .unwrap();
    assert_eq!(out.query, QUERY);
}

#[tokio::test]
async fn test_missing_connection() {
    let m = DevEnvQueryModifier::new(Dialect::Postgres, Arc::new(ConnectionManager::new()), dev());
    let err = m
        .modify(&pipeline(), &asset(), &Query::new(QUERY))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "[E002] [D004] connection 'postgres-default' does not exist"
    );
}

#[tokio::test]
async fn test_connection_without_summary_is_unsupported() {
    let m = modifier_with(Arc::new(PlainConnection), dev());
    let err = m
        .modify(&pipeline(), &asset(), &Query::new(QUERY))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "[E001] the asset type 'pg.sql' does not support developer environments, please create an issue if you'd like that"
    );
}

#[tokio::test]
async fn test_parse_error_is_returned() {
    let m = modifier_with(Arc::new(SummaryConnection::new(summary())), dev());
    let err = m
        .modify(&pipeline(), &asset(), &Query::new("selec nothing from"))
        .await
        .unwrap_err();
    assert!(matches!(err, DevEnvError::Sql(_)), "{err}");
}

#[tokio::test]
async fn test_summary_error_is_returned() {
    let m = modifier_with(Arc::new(SummaryConnection::failing()), dev());
    let err = m
        .modify(&pipeline(), &asset(), &Query::new(QUERY))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "[E002] [D002] SQL execution failed: failed to get db summary"
    );
}

#[tokio::test]
async fn test_rewrites_only_tables_with_a_shadow() {
    let m = modifier_with(Arc::new(SummaryConnection::new(summary())), dev());
    let out = m
        .modify(&pipeline(), &asset(), &Query::new(QUERY))
        .await
        .unwrap();
    assert!(out.query.contains("FROM dev_schema1.table1"), "{}", out.query);
    assert!(out.query.contains("JOIN schema2.table1"), "{}", out.query);
    assert!(!out.query.contains("dev_schema2"), "{}", out.query);
}

#[tokio::test]
async fn test_prefixed_asset_maps_its_production_name() {
    let m = modifier_with(
        Arc::new(SummaryConnection::new(DbDatabase::new("db1"))),
        dev(),
    );
    let asset = Asset::new("dev_schema3.orders").with_type("pg.sql");
    let out = m
        .modify(
            &pipeline(),
            &asset,
            &Query::new("SELECT * FROM schema3.orders WHERE id > 10"),
        )
        .await
        .unwrap();
    assert_eq!(out.query, "SELECT * FROM dev_schema3.orders WHERE id > 10");
}

#[tokio::test]
async fn test_variable_definitions_are_kept() {
    let m = modifier_with(Arc::new(SummaryConnection::new(summary())), dev());
    let query = Query::with_variables(
        "SELECT * FROM schema1.table2",
        vec!["SET search_path TO public".to_string()],
    );
    let out = m.modify(&pipeline(), &asset(), &query).await.unwrap();
    assert_eq!(out.query, "SELECT * FROM dev_schema1.table2");
    assert_eq!(out.variable_definitions, query.variable_definitions);
}

#[tokio::test]
async fn test_concurrent_callers_fetch_summary_once() {
    let conn = Arc::new(SummaryConnection::slow(summary()));
    let m = modifier_with(conn.clone(), dev());
    let p = pipeline();
    let a = asset();
    let q = Query::new(QUERY);

    let (first, second) = tokio::join!(m.modify(&p, &a, &q), m.modify(&p, &a, &q));

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(conn.fetches(), 1);
}

#[tokio::test]
async fn test_summary_cache_is_per_connection() {
    let warehouse = Arc::new(SummaryConnection::new(summary()));
    let analytics = Arc::new(SummaryConnection::new(DbDatabase::new("analytics")));
    let m = DevEnvQueryModifier::new(
        Dialect::Postgres,
        Arc::new(
            ConnectionManager::new()
                .with("postgres-default", warehouse.clone())
                .with("analytics", analytics.clone()),
        ),
        dev(),
    );
    let mut other = asset();
    other.connection = Some("analytics".to_string());

    let on_warehouse = m.modify(&pipeline(), &asset(), &Query::new(QUERY)).await.unwrap();
    let on_analytics = m.modify(&pipeline(), &other, &Query::new(QUERY)).await.unwrap();
    m.modify(&pipeline(), &asset(), &Query::new(QUERY)).await.unwrap();

    assert_eq!(warehouse.fetches(), 1);
    assert_eq!(analytics.fetches(), 1);
    assert!(on_warehouse.query.contains("dev_schema1.table1"));
    assert_eq!(on_analytics.query, QUERY);
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_does_not_block_other_connections() {
    let warehouse = Arc::new(SummaryConnection::slow(summary()));
    let analytics = Arc::new(SummaryConnection::slow(DbDatabase::new("analytics")));
    let m = DevEnvQueryModifier::new(
        Dialect::Postgres,
        Arc::new(
            ConnectionManager::new()
                .with("postgres-default", warehouse.clone())
                .with("analytics", analytics.clone()),
        ),
        dev(),
    );
    let mut other = asset();
    other.connection = Some("analytics".to_string());
    let p = pipeline();
    let q = Query::new(QUERY);
    let a = asset();

    let start = tokio::time::Instant::now();
    let (on_warehouse, on_analytics) = tokio::join!(m.modify(&p, &a, &q), m.modify(&p, &other, &q));

    assert!(on_warehouse.unwrap().query.contains("dev_schema1.table1"));
    assert_eq!(on_analytics.unwrap().query, QUERY);
    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!(warehouse.fetches(), 1);
    assert_eq!(analytics.fetches(), 1);
}

#[tokio::test]
async fn test_failed_fetch_leaves_slot_empty() {
    let m = modifier_with(Arc::new(SummaryConnection::failing()), dev());
    assert!(m.modify(&pipeline(), &asset(), &Query::new(QUERY)).await.is_err());
    let slot = Arc::clone(&m.summaries.lock().await["postgres-default"]);
    assert!(slot.get().is_none());
}

#[tokio::test]
async fn test_registered_assets_become_rewrite_targets() {
    let conn = Arc::new(SummaryConnection::new(summary()));
    let m = modifier_with(conn.clone(), dev());
    let query = Query::new("SELECT * FROM schema3.events");

    let before = m.modify(&pipeline(), &asset(), &query).await.unwrap();
    assert_eq!(before.query, "SELECT * FROM schema3.events");

    m.register_asset_for_schema_cache(&pipeline(), &Asset::new("dev_schema3.events"))
        .await;
    m.register_asset_for_schema_cache(&pipeline(), &Asset::new("DEV_SCHEMA3.EVENTS"))
        .await;

    let after = m.modify(&pipeline(), &asset(), &query).await.unwrap();
    assert_eq!(after.query, "SELECT * FROM dev_schema3.events");
    assert_eq!(conn.fetches(), 1);

    let slot = Arc::clone(&m.summaries.lock().await["postgres-default"]);
    let cached = slot.get().unwrap().lock().await;
    let schema = cached
        .schemas
        .iter()
        .find(|s| s.name == "dev_schema3")
        .unwrap();
    assert_eq!(schema.tables.len(), 1);
}

#[tokio::test]
async fn test_register_without_cache_is_noop() {
    let conn = Arc::new(SummaryConnection::new(summary()));
    let m = modifier_with(conn.clone(), dev());
    m.register_asset_for_schema_cache(&pipeline(), &Asset::new("dev_schema3.events"))
        .await;
    assert_eq!(conn.fetches(), 0);
    assert!(m.summaries.lock().await.is_empty());
}

#[tokio::test]
async fn test_rewrite_against_duckdb() {
    let duck = Arc::new(DuckDbConnection::in_memory().unwrap());
    duck.run_query_without_result(&Query::new(
        "CREATE SCHEMA raw; CREATE SCHEMA dev_raw; \
         CREATE TABLE raw.events (id INT); CREATE TABLE raw.users (id INT); \
         CREATE TABLE dev_raw.events (id INT)",
    ))
    .await
    .unwrap();

    let m = DevEnvQueryModifier::new(
        Dialect::DuckDb,
        Arc::new(ConnectionManager::new().with("duck", duck)),
        dev(),
    );
    let asset = Asset::new("marts.report").with_type("duckdb.sql");
    let out = m
        .modify(
            &StaticPipeline::new("pipeline", "duck"),
            &asset,
            &Query::new("SELECT * FROM raw.events e JOIN raw.users u ON e.id = u.id"),
        )
        .await
        .unwrap();

    assert!(out.query.contains("FROM dev_raw.events"), "{}", out.query);
    assert!(out.query.contains("JOIN raw.users"), "{}", out.query);
}
