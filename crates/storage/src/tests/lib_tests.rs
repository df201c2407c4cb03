use super::*;

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn missing_key_reads_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(storage.get("msAccessToken").await.expect("get"), None);
}

#[tokio::test]
async fn set_many_overwrites_existing_values() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .set_many(&[("a", "1"), ("b", "2")])
        .await
        .expect("first write");
    storage
        .set_many(&[("a", "3"), ("b", "4")])
        .await
        .expect("second write");

    assert_eq!(storage.get("a").await.expect("a").as_deref(), Some("3"));
    assert_eq!(storage.get("b").await.expect("b").as_deref(), Some("4"));
}

#[tokio::test]
async fn remove_many_deletes_only_named_keys() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .set_many(&[("a", "1"), ("b", "2"), ("c", "3")])
        .await
        .expect("write");
    storage.remove_many(&["a", "b"]).await.expect("remove");

    assert_eq!(storage.get("a").await.expect("a"), None);
    assert_eq!(storage.get("b").await.expect("b"), None);
    assert_eq!(storage.get("c").await.expect("c").as_deref(), Some("3"));
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("docgen_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("credentials.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn memory_store_mirrors_sqlite_semantics() {
    let store = MemoryStore::new();
    store.set("k", "v").await.expect("set");
    assert_eq!(store.get("k").await.expect("get").as_deref(), Some("v"));
    store.remove_many(&["k", "absent"]).await.expect("remove");
    assert!(store.snapshot().await.is_empty());
}

#[test]
fn sqlite_path_ignores_memory_and_query_suffix() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/credentials.db?mode=rwc"),
        Some(PathBuf::from("./data/credentials.db"))
    );
}
