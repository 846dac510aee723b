//! Database integration tests against in-memory and on-disk `SQLite`.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use qsticker_common::config::{
    Config, DatabaseConfig, OptimizeConfig, ProviderConfig, ServerConfig, StorageConfig,
    UpdateConfig,
};
use qsticker_db::repositories::{EmoticonRepository, EmoticonStore};
use qsticker_db::test_utils::{emoticon_fixture, TestDatabase};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

async fn repository() -> EmoticonRepository {
    let db = TestDatabase::new().await.unwrap();
    EmoticonRepository::new(Arc::new(db.into_connection()))
}

fn config_for(url: String) -> Config {
    Config {
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url,
            max_connections: 2,
            min_connections: 1,
        },
        storage: StorageConfig::default(),
        provider: ProviderConfig::default(),
        optimize: OptimizeConfig::default(),
        update: UpdateConfig {
            cron: "0 0 * * *".to_string(),
            range: 20,
            salt: "salt".to_string(),
            token: None,
            concurrency: 4,
            download_concurrency: 4,
        },
    }
}

#[tokio::test]
async fn test_insert_then_find() {
    let repo = repository().await;
    let pack = emoticon_fixture(203_291, "Cats");

    repo.insert(pack.clone()).await.unwrap();

    let found = repo.find_by_id(203_291).await.unwrap().unwrap();
    assert_eq!(found, pack);
    assert_eq!(found.image_list()[0].keyword, "hello");
}

#[tokio::test]
async fn test_insert_duplicate_id_fails() {
    let repo = repository().await;
    repo.insert(emoticon_fixture(1, "Cats")).await.unwrap();

    assert!(repo.insert(emoticon_fixture(1, "Dogs")).await.is_err());
}

#[tokio::test]
async fn test_delete_then_reinsert_replaces_row() {
    let repo = repository().await;
    repo.insert(emoticon_fixture(5, "Old")).await.unwrap();

    repo.delete(5).await.unwrap();
    assert!(repo.find_by_id(5).await.unwrap().is_none());

    repo.insert(emoticon_fixture(5, "New")).await.unwrap();
    assert_eq!(repo.find_by_id(5).await.unwrap().unwrap().name, "New");

    // Deleting an absent row is fine
    repo.delete(999).await.unwrap();
}

#[tokio::test]
async fn test_max_id() {
    let repo = repository().await;
    assert_eq!(repo.max_id().await.unwrap(), None);

    for id in [10, 300, 42] {
        repo.insert(emoticon_fixture(id, "Pack")).await.unwrap();
    }
    assert_eq!(repo.max_id().await.unwrap(), Some(300));

    let store: &dyn EmoticonStore = &repo;
    assert_eq!(store.max_id().await.unwrap(), Some(300));
}

#[tokio::test]
async fn test_search_and_count_with_keyword() {
    let repo = repository().await;
    for (id, name) in [(1, "Cat"), (2, "Dog"), (3, "Black cat"), (4, "Catfish")] {
        repo.insert(emoticon_fixture(id, name)).await.unwrap();
    }

    let results = repo.search(Some("cat"), 10, 0).await.unwrap();
    let ids: Vec<i64> = results.iter().map(|r| r.emoticon_id).collect();
    assert_eq!(ids, vec![4, 3, 1]);
    assert_eq!(repo.count(Some("cat")).await.unwrap(), 3);

    assert_eq!(repo.count(None).await.unwrap(), 4);
    assert_eq!(repo.count(Some("")).await.unwrap(), 4);

    let page = repo.search(None, 2, 2).await.unwrap();
    let ids: Vec<i64> = page.iter().map(|r| r.emoticon_id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn test_init_creates_directory_and_enables_wal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database").join("database.db");
    let config = config_for(format!("sqlite://{}?mode=rwc", path.display()));

    let db = qsticker_db::init(&config).await.unwrap();
    qsticker_db::migrate(&db).await.unwrap();
    assert!(path.exists());

    let row = db
        .query_one(Statement::from_string(
            DatabaseBackend::Sqlite,
            "PRAGMA journal_mode".to_string(),
        ))
        .await
        .unwrap()
        .unwrap();
    let mode: String = row.try_get("", "journal_mode").unwrap();
    assert_eq!(mode.to_lowercase(), "wal");

    qsticker_db::checkpoint(&db).await.unwrap();
}

#[tokio::test]
async fn test_find_detail_omits_metadata() {
    let repo = repository().await;
    let pack = emoticon_fixture(9, "Cats");
    repo.insert(pack.clone()).await.unwrap();

    let detail = repo.find_detail(9).await.unwrap().unwrap();
    assert_eq!(detail.name, "Cats");
    assert_eq!(detail.images, pack.images);

    assert!(repo.find_detail(10).await.unwrap().is_none());
}
