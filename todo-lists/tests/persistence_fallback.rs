//! Rehydration and write-through persistence tests
//!
//! Unusable persisted state must never prevent an instance from starting:
//! it falls back to the configured default. Write failures leave the
//! in-memory state authoritative.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use listkeeper_testing::{InMemoryStorage, RecordingSyncBus};
use std::sync::Arc;
use std::time::Duration;
use todo_lists::{
    AppConfig, AppError, AppState, FileStorage, PersistError, PersistenceGateway, Theme, TodoApp,
    TodoItem,
};

const KEY: &str = "persist:basic-todolist-app-test";

async fn start_with(config: AppConfig, storage: &InMemoryStorage) -> TodoApp {
    TodoApp::start(
        config,
        Arc::new(storage.clone()),
        Arc::new(RecordingSyncBus::new()),
    )
    .await
    .expect("instance starts")
}

#[tokio::test]
async fn corrupted_payload_falls_back_to_the_default_state() {
    let storage = InMemoryStorage::new();
    storage.insert_raw(KEY, r#"{"theme": "dark", "todoLists": [{"name": 42}]"#);

    let app = start_with(AppConfig::default(), &storage).await;

    let state = app.snapshot().await;
    assert_eq!(state.theme, Theme::Dark);
    assert!(state.todo_lists.is_empty());
}

#[tokio::test]
async fn malformed_structure_falls_back_to_the_default_state() {
    let storage = InMemoryStorage::new();
    storage.insert_raw(
        KEY,
        r#"{"theme":"purple","todoLists":[],"_persist":{"version":1}}"#,
    );

    let app = start_with(AppConfig::default(), &storage).await;

    assert_eq!(app.snapshot().await, AppState::default());
}

#[tokio::test]
async fn version_mismatch_is_treated_as_absent() {
    let storage = InMemoryStorage::new();
    storage.insert_raw(
        KEY,
        r#"{"theme":"light","todoLists":[{"name":"Old","todos":[]}],"_persist":{"version":1}}"#,
    );
    let config = AppConfig {
        storage_version: 2,
        ..AppConfig::default()
    };

    let app = start_with(config, &storage).await;

    assert_eq!(app.snapshot().await, AppState::default());
    assert!(matches!(
        app.reload().await,
        Err(AppError::Persist(PersistError::VersionMismatch {
            found: 1,
            expected: 2
        }))
    ));
}

#[tokio::test]
async fn configured_default_is_used_when_nothing_is_stored() {
    let config = AppConfig {
        default_theme: Theme::Light,
        seed_sample: true,
        ..AppConfig::default()
    };

    let app = start_with(config, &InMemoryStorage::new()).await;

    let state = app.snapshot().await;
    assert_eq!(state.theme, Theme::Light);
    assert_eq!(state.todo_lists.len(), 1);
    assert_eq!(state.todo_lists[0].name, "TODO List #1");
}

#[tokio::test]
async fn unavailable_storage_still_starts_and_keeps_state_in_memory() {
    let storage = InMemoryStorage::new();
    storage.set_unavailable(true);

    let app = start_with(AppConfig::default(), &storage).await;
    app.add_list("Volatile").await.unwrap().wait().await;

    assert_eq!(app.list(0).await.unwrap().name, "Volatile");
    storage.set_unavailable(false);
    assert!(storage.is_empty());
}

#[tokio::test]
async fn quota_exceeded_keeps_the_last_good_record() {
    let storage = InMemoryStorage::new().with_quota(120);
    let app = start_with(AppConfig::default(), &storage).await;

    app.add_list("A").await.unwrap().wait().await;
    let last_good = storage.get_raw(KEY).unwrap();

    let long = TodoItem::new("a rather long title", "2024-01-01 09:00")
        .with_description("and a description to go with it");
    app.add_item(0, long)
        .await
        .unwrap()
        .wait()
        .await;

    assert_eq!(app.list(0).await.unwrap().todos.len(), 1);
    assert_eq!(storage.get_raw(KEY).unwrap(), last_good);
}

#[tokio::test]
async fn state_survives_a_restart_on_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    };

    let first = TodoApp::start(
        config.clone(),
        Arc::new(FileStorage::new(&config.data_dir)),
        Arc::new(RecordingSyncBus::new()),
    )
    .await
    .unwrap();
    first.add_list("Groceries").await.unwrap();
    first
        .add_item(0, TodoItem::new("Milk", "2024-01-01"))
        .await
        .unwrap();
    first.set_theme(Theme::Light).await.unwrap();
    first.shutdown(Duration::from_secs(2)).await.unwrap();
    let before = first.snapshot().await;
    drop(first);

    let second = TodoApp::start(
        config.clone(),
        Arc::new(FileStorage::new(&config.data_dir)),
        Arc::new(RecordingSyncBus::new()),
    )
    .await
    .unwrap();

    assert_eq!(second.snapshot().await, before);
}

#[tokio::test]
async fn resaving_a_loaded_state_is_byte_identical() {
    let storage = InMemoryStorage::new();
    let app = start_with(AppConfig::default(), &storage).await;
    app.add_list("Groceries").await.unwrap();
    app.add_item(0, TodoItem::new("Milk", "2024-01-01").with_description(""))
        .await
        .unwrap()
        .wait()
        .await;
    let raw = storage.get_raw(KEY).unwrap();

    let gateway = PersistenceGateway::new(Arc::new(storage.clone()), "basic-todolist-app-test", 1);
    let loaded = gateway.load().await.unwrap();
    gateway.save(&loaded).await.unwrap();

    assert_eq!(storage.get_raw(KEY).unwrap(), raw);
    assert_eq!(loaded, app.snapshot().await);
}
