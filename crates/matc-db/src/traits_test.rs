use super::*;
use crate::test_utils::RecordingConnection;

fn manager() -> ConnectionManager {
    ConnectionManager::new()
        .with("warehouse", Arc::new(RecordingConnection::default()))
        .with("analytics", Arc::new(RecordingConnection::default()))
}

#[test]
fn test_connection_manager_lookup() {
    let connections = manager();
    assert_eq!(connections.len(), 2);
    assert!(!connections.is_empty());
    assert!(connections.connection("warehouse").is_some());
    assert!(connections.connection("missing").is_none());
    assert!(ConnectionManager::new().is_empty());
}

#[test]
fn test_static_pipeline_prefers_asset_connection() {
    let pipeline = StaticPipeline::new("daily", "warehouse");
    assert_eq!(pipeline.name(), "daily");

    let mut asset = Asset::new("raw.events");
    assert_eq!(pipeline.connection_name_for_asset(&asset).unwrap(), "warehouse");

    asset.connection = Some("analytics".to_string());
    assert_eq!(pipeline.connection_name_for_asset(&asset).unwrap(), "analytics");

    asset.connection = Some("  ".to_string());
    assert_eq!(pipeline.connection_name_for_asset(&asset).unwrap(), "warehouse");
}

#[test]
fn test_connection_for_asset_missing_connection() {
    let connections = manager();
    let pipeline = StaticPipeline::new("daily", "nowhere");
    let err = match connection_for_asset(&connections, &pipeline, &Asset::new("raw.events")) {
        Ok(_) => panic!("expected missing connection"),
        Err(e) => e,
    };
    assert_eq!(err.to_string(), "[D004] connection 'nowhere' does not exist");
}

#[test]
fn test_connection_for_asset_resolves() {
    let connections = manager();
    let pipeline = StaticPipeline::new("daily", "warehouse");
    let conn = connection_for_asset(&connections, &pipeline, &Asset::new("raw.events")).unwrap();
    assert_eq!(conn.db_type(), "recording");
    assert!(conn.as_table_exists_checker().is_none());
    assert!(conn.as_database_summarizer().is_none());
}
