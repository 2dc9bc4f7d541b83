//! End-to-end tests of the store façade over real backends.
//!
//! File and SQLite run everywhere. The document store uses the in-process
//! `mem://` engine. Postgres runs only when `TEST_POSTGRES_URL` is set.

use futures::future::join_all;
use plugstore::{json, BackendKind, StorageConfig, StorageService, Store, Value};
use tempfile::tempdir;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("plugstore=debug")
        .with_test_writer()
        .try_init();
}

fn file_service(dir: &std::path::Path) -> StorageService {
    StorageService::new(StorageConfig::new().with_data_dir(dir))
}

async fn check_contract(records: &Store) {
    records.set("user:1", json!({"streak": 3})).await;
    assert_eq!(records.get("user:1").await, Some(json!({"streak": 3})));

    let all = records.get_all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all["user:1"], json!({"streak": 3}));

    assert!(!records.has("user:2").await);
    assert_eq!(records.get_or_default("user:2", json!({})).await, json!({}));

    records.set("user:2", json!({"a": 0, "b": 2})).await;
    records.patch("user:2", json!({"a": 1})).await;
    assert_eq!(records.get("user:2").await, Some(json!({"a": 1, "b": 2})));

    records.delete("user:2").await;
    assert_eq!(records.get("user:2").await, None);
    assert!(!records.has("user:2").await);
}

async fn check_concurrent_writers(store: &Store, writers: usize) {
    let writes = (0..writers).map(|i| {
        let store = store.clone();
        async move { store.set(&format!("key:{i}"), json!({ "writer": i })).await }
    });
    join_all(writes).await;

    let all = store.get_all().await;
    assert_eq!(all.len(), writers);
    for i in 0..writers {
        assert_eq!(all[&format!("key:{i}")], json!({ "writer": i }));
    }
}

// =============================================================================
// File backend
// =============================================================================

#[tokio::test]
async fn test_file_end_to_end() {
    init_logging();
    let dir = tempdir().unwrap();
    let service = file_service(dir.path());

    let store = service.create_store("attendance").unwrap();
    let records = store.table("records").unwrap();

    records.set("user:1", json!({"streak": 3})).await;
    assert_eq!(records.get("user:1").await, Some(json!({"streak": 3})));
    assert_eq!(service.backend_kind().await.unwrap(), BackendKind::File);

    let path = dir.path().join("plugin_attendance_records.json");
    let on_disk: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk, json!({"user:1": {"streak": 3}}));

    assert!(!records.has("user:2").await);
    assert_eq!(records.get_or_default("user:2", json!({})).await, json!({}));
}

#[tokio::test]
async fn test_file_contract() {
    let dir = tempdir().unwrap();
    let service = file_service(dir.path());
    let records = service.create_store("attendance").unwrap().table("records").unwrap();

    check_contract(&records).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_file_concurrent_distinct_keys() {
    let dir = tempdir().unwrap();
    let service = file_service(dir.path());
    let store = service.create_store("activity").unwrap();

    check_concurrent_writers(&store, 50).await;
}

#[tokio::test]
async fn test_file_survives_restart() {
    let dir = tempdir().unwrap();

    {
        let service = file_service(dir.path());
        let store = service.create_store("birthday").unwrap();
        store.set("user:9", json!("12-24")).await;
        service.close().await;
    }

    let service = file_service(dir.path());
    let store = service.create_store("birthday").unwrap();
    assert_eq!(store.get("user:9").await, Some(json!("12-24")));
}

#[tokio::test]
async fn test_json_values_roundtrip() {
    let dir = tempdir().unwrap();
    let service = file_service(dir.path());
    let store = service.create_store("misc").unwrap();

    let values = [
        json!(null),
        json!(true),
        json!(-17),
        json!(3.25),
        json!("unicode ✓ \"quoted\""),
        json!([1, "two", [3], {"four": 4}]),
        json!({"nested": {"deep": {"list": [null, false]}}, "empty": {}}),
    ];

    for (i, value) in values.iter().enumerate() {
        store.set(&format!("v{i}"), value.clone()).await;
    }
    for (i, value) in values.iter().enumerate() {
        assert_eq!(store.get(&format!("v{i}")).await.as_ref(), Some(value));
    }
}

#[tokio::test]
async fn test_namespaces_share_one_adapter() {
    let dir = tempdir().unwrap();
    let service = file_service(dir.path());

    let a = service.create_store("alpha").unwrap();
    let b = service.create_store("beta").unwrap();
    a.set("k", json!("a")).await;
    b.set("k", json!("b")).await;

    assert_eq!(a.get("k").await, Some(json!("a")));
    assert_eq!(b.get("k").await, Some(json!("b")));
    assert!(dir.path().join("plugin_alpha.json").exists());
    assert!(dir.path().join("plugin_beta.json").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_across_stores() {
    let dir = tempdir().unwrap();
    let service = file_service(dir.path());

    let stores: Vec<Store> = (0..8)
        .map(|i| service.create_store(&format!("plugin{i}")).unwrap())
        .collect();
    let handles: Vec<_> = stores
        .iter()
        .cloned()
        .map(|store| tokio::spawn(async move { store.set("k", json!(1)).await }))
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(service.backend_kind().await.unwrap(), BackendKind::File);
    for store in &stores {
        assert_eq!(store.get("k").await, Some(json!(1)));
    }
}

#[test]
fn test_create_store_fails_fast() {
    let dir = tempdir().unwrap();
    let service = file_service(dir.path());

    assert!(service.create_store("").is_err());
    assert!(service.create_store("bad name!").is_err());
    assert!(service.create_store("my_plugin1").is_ok());

    let sub = service.create_store("attendance").unwrap().table("records").unwrap();
    assert!(sub.table("again").is_err());
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

// =============================================================================
// SQLite backend
// =============================================================================

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sqlite_contract() {
    let dir = tempdir().unwrap();
    let service = StorageService::new(
        StorageConfig::new()
            .with_sqlite_path(dir.path().join("host.db"))
            .with_data_dir(dir.path().join("files")),
    );
    let records = service.create_store("attendance").unwrap().table("records").unwrap();

    check_contract(&records).await;
    assert_eq!(service.backend_kind().await.unwrap(), BackendKind::Sqlite);
    service.close().await;
}

#[cfg(feature = "sqlite")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_concurrent_distinct_keys() {
    let dir = tempdir().unwrap();
    let service = StorageService::new(
        StorageConfig::new().with_sqlite_path(dir.path().join("host.db")),
    );
    let store = service.create_store("activity").unwrap();

    check_concurrent_writers(&store, 50).await;
    service.close().await;
}

// =============================================================================
// Document backend
// =============================================================================

#[cfg(feature = "document")]
#[tokio::test]
async fn test_document_contract() {
    let dir = tempdir().unwrap();
    let service = StorageService::new(
        StorageConfig::new()
            .with_document_url("mem://")
            .with_data_dir(dir.path()),
    );
    let records = service.create_store("attendance").unwrap().table("records").unwrap();

    check_contract(&records).await;
    assert_eq!(service.backend_kind().await.unwrap(), BackendKind::Document);
}

#[cfg(feature = "document")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_document_concurrent_distinct_keys() {
    let dir = tempdir().unwrap();
    let service = StorageService::new(
        StorageConfig::new()
            .with_document_url("mem://")
            .with_data_dir(dir.path()),
    );
    let store = service.create_store("activity").unwrap();

    check_concurrent_writers(&store, 50).await;
    assert_eq!(service.backend_kind().await.unwrap(), BackendKind::Document);
}

// =============================================================================
// Postgres backend (requires TEST_POSTGRES_URL)
// =============================================================================

#[cfg(feature = "postgres")]
#[tokio::test]
async fn test_postgres_contract() {
    let Ok(url) = std::env::var("TEST_POSTGRES_URL") else {
        eprintln!("Skipping test: TEST_POSTGRES_URL not set");
        return;
    };
    let service = StorageService::new(StorageConfig::new().with_postgres_url(url));
    let store = service.create_store("pgcontract").unwrap();
    let records = store.table(&format!("run_{}", std::process::id())).unwrap();

    check_contract(&records).await;
    assert_eq!(service.backend_kind().await.unwrap(), BackendKind::Postgres);
    service.close().await;
}
