use super::*;
use crate::test_utils::*;
use matc_core::{Column, TimeGranularity};

fn render(asset: &Asset, query: &str) -> MaterializeResult<String> {
    materializer(registry(), false).render_sql(asset, query)
}

#[test]
fn test_validate_identifier() {
    assert!(validate_identifier("MY_SCHEMA.MY_TABLE", "table name").is_ok());
    assert!(validate_identifier("t$1#x", "table name").is_ok());
    let err = validate_identifier("t; DROP TABLE x", "table name").unwrap_err();
    assert_eq!(
        err.to_string(),
        "[M007] invalid Oracle table name: \"t; DROP TABLE x\" contains unsupported characters"
    );
    assert!(validate_identifier("1abc", "table name").is_err());
}

#[test]
fn test_view_accepts_create_replace() {
    for strategy in [S::None, S::CreateReplace] {
        assert_eq!(
            render(&view(strategy), "SELECT 1 FROM dual;").unwrap(),
            "CREATE OR REPLACE VIEW my.asset AS\nSELECT 1 FROM dual"
        );
    }
    assert!(matches!(
        render(&view(S::TruncateInsert), "SELECT 1").unwrap_err(),
        MaterializeError::UnsupportedStrategy { .. }
    ));
    let bad = Asset::new("bad name").with_materialization(matc_core::Materialization::view());
    assert!(matches!(
        render(&bad, "SELECT 1").unwrap_err(),
        MaterializeError::InvalidIdentifier { .. }
    ));
}

#[test]
fn test_create_replace_plsql_block() {
    assert_eq!(
        render(&table(S::CreateReplace), "SELECT 'a' AS x FROM dual").unwrap(),
        "BEGIN
   BEGIN
      EXECUTE IMMEDIATE 'DROP TABLE my.asset PURGE';
   EXCEPTION
      WHEN OTHERS THEN
         IF SQLCODE != -942 THEN
            RAISE;
         END IF;
   END;
   EXECUTE IMMEDIATE 'CREATE TABLE my.asset AS SELECT ''a'' AS x FROM dual';
END;"
    );
}

#[test]
fn test_create_replace_rejects_unsafe_name() {
    let asset = Asset::new("x'; DROP TABLE y; --")
        .with_materialization(matc_core::Materialization::table(S::CreateReplace));
    assert!(matches!(
        render(&asset, "SELECT 1").unwrap_err(),
        MaterializeError::InvalidIdentifier { .. }
    ));
}

#[test]
fn test_truncate_insert() {
    assert_eq!(
        render(&table(S::TruncateInsert), "SELECT 1 FROM dual;").unwrap(),
        "BEGIN
   EXECUTE IMMEDIATE 'TRUNCATE TABLE my.asset';
   INSERT INTO my.asset
SELECT 1 FROM dual
;
END;"
    );
}

#[test]
fn test_delete_insert_uses_exists() {
    let asset = with_key(table(S::DeleteInsert), "dt");
    assert_eq!(
        render(&asset, "SELECT * FROM src").unwrap(),
        "BEGIN
   DELETE FROM my.asset t WHERE EXISTS (
      SELECT 1 FROM (SELECT * FROM src) s WHERE s.dt = t.dt
   );
   INSERT INTO my.asset
SELECT * FROM src
;
END;"
    );

    let unsafe_key = with_key(table(S::DeleteInsert), "dt)--");
    assert!(matches!(
        render(&unsafe_key, "SELECT 1").unwrap_err(),
        MaterializeError::InvalidIdentifier { .. }
    ));
}

#[test]
fn test_time_interval() {
    let asset = with_granularity(with_key(table(S::TimeInterval), "dt"), TimeGranularity::Date);
    assert_eq!(
        render(&asset, "SELECT 1 FROM dual").unwrap(),
        "BEGIN
   DELETE FROM my.asset WHERE dt BETWEEN '{{start_date}}' AND '{{end_date}}';
   INSERT INTO my.asset
SELECT 1 FROM dual
;
END;"
    );
}

#[test]
fn test_merge_is_null_safe() {
    let asset = table(S::Merge).with_columns(merge_columns());
    assert_eq!(
        render(&asset, "SELECT * FROM src").unwrap(),
        "MERGE INTO my.asset target\n\
         USING (\nSELECT * FROM src\n) source ON ((target.id = source.id OR (target.id IS NULL AND source.id IS NULL)))\n\
         WHEN MATCHED THEN UPDATE SET target.name = source.name, target.price = GREATEST(target.price, source.price)\n\
         WHEN NOT MATCHED THEN INSERT (id, name, price, created_at) VALUES (source.id, source.name, source.price, source.created_at);"
    );
}

#[test]
fn test_unregistered_pairs() {
    assert!(matches!(
        render(&table(S::Ddl).with_columns(merge_columns()), "").unwrap_err(),
        MaterializeError::UnsupportedCombination { .. }
    ));
    assert!(matches!(
        render(&table(S::Scd2ByColumn).with_columns(scd2_columns()), "SELECT 1").unwrap_err(),
        MaterializeError::UnsupportedCombination { .. }
    ));
}

fn oracle_scd2_asset() -> Asset {
    with_key(table(S::Scd2ByTime), "ts").with_columns(vec![
        Column::new("id", "NUMBER").primary_key(),
        Column::new("ts", "TIMESTAMP"),
    ])
}

#[test]
fn test_scd2_by_time() {
    let sql = render(&oracle_scd2_asset(), "SELECT id, ts FROM src").unwrap();
    let expected = "BEGIN
UPDATE my.asset target
SET bruin_valid_until = LOCALTIMESTAMP, bruin_is_current = 0
WHERE target.bruin_is_current = 1
  AND NOT EXISTS (
    SELECT 1 FROM (SELECT id, ts FROM src) source
    WHERE (target.id = source.id OR (target.id IS NULL AND source.id IS NULL))
  )
  AND EXISTS (SELECT 1 FROM (SELECT id, ts FROM src) source_exists);

MERGE INTO (SELECT * FROM my.asset WHERE bruin_is_current = 1) target
USING (
  WITH s1 AS (
    SELECT id, ts FROM src
  )
  SELECT s1.*, 1 AS bruin_is_current_src
  FROM s1
  UNION ALL
  SELECT s1.*, 0 AS bruin_is_current_src
  FROM s1
  JOIN my.asset t1 ON ((t1.id = s1.id OR (t1.id IS NULL AND s1.id IS NULL)))
  WHERE t1.bruin_valid_from < CAST(s1.ts AS TIMESTAMP) AND t1.bruin_is_current = 1
) source
ON ((target.id = source.id OR (target.id IS NULL AND source.id IS NULL)) AND source.bruin_is_current_src = 1)
WHEN MATCHED THEN
  UPDATE SET
    target.bruin_valid_until = CAST(source.ts AS TIMESTAMP),
    target.bruin_is_current  = 0
  WHERE target.bruin_valid_from < CAST(source.ts AS TIMESTAMP)
WHEN NOT MATCHED THEN
  INSERT (id, ts, bruin_valid_from, bruin_valid_until, bruin_is_current)
  VALUES (source.id, source.ts, CAST(source.ts AS TIMESTAMP), TO_TIMESTAMP('9999-12-31 23:59:59', 'YYYY-MM-DD HH24:MI:SS'), 1);
END;";
    assert_eq!(sql, expected);
}

#[test]
fn test_scd2_by_time_validation() {
    let mut tz = oracle_scd2_asset();
    tz.columns[1].data_type = "TIMESTAMP WITH TIME ZONE".to_string();
    assert!(render(&tz, "SELECT 1")
        .unwrap_err()
        .to_string()
        .contains("TIMESTAMP WITH TIME ZONE is not supported"));

    let mut numeric = oracle_scd2_asset();
    numeric.columns[1].data_type = "NUMBER".to_string();
    assert!(render(&numeric, "SELECT 1")
        .unwrap_err()
        .to_string()
        .contains("incremental_key must be TIMESTAMP or DATE"));

    let missing = with_key(oracle_scd2_asset(), "updated_at");
    assert_eq!(
        render(&missing, "SELECT 1").unwrap_err().to_string(),
        "[M009] incremental_key 'updated_at' not found in column definitions"
    );

    let mut reserved = oracle_scd2_asset();
    reserved.columns.push(Column::new("bruin_is_current", "NUMBER"));
    assert!(matches!(
        render(&reserved, "SELECT 1").unwrap_err(),
        MaterializeError::ReservedColumn { .. }
    ));

    let mut no_pk = oracle_scd2_asset();
    no_pk.columns[0].primary_key = false;
    assert!(matches!(
        render(&no_pk, "SELECT 1").unwrap_err(),
        MaterializeError::MissingPrimaryKey { .. }
    ));
}

#[test]
fn test_scd2_full_refresh() {
    let m = materializer(registry(), true);
    let sql = m.render_sql(&oracle_scd2_asset(), "SELECT id, ts FROM src WHERE x = 'y'").unwrap();
    assert!(sql.contains("EXECUTE IMMEDIATE 'DROP TABLE my.asset PURGE';"));
    assert!(sql.contains(
        "EXECUTE IMMEDIATE 'CREATE TABLE my.asset AS SELECT
  src.*,
  CAST(src.ts AS TIMESTAMP) AS bruin_valid_from,
  TO_TIMESTAMP(''9999-12-31 23:59:59'', ''YYYY-MM-DD HH24:MI:SS'') AS bruin_valid_until,
  1 AS bruin_is_current
FROM (
SELECT id, ts FROM src WHERE x = ''y''
) src';"
    ));
}
