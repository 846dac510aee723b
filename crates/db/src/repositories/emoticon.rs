//! Emoticon repository.

use std::sync::Arc;

use crate::entities::{emoticon, Emoticon};
use async_trait::async_trait;
use qsticker_common::{AppError, AppResult};
use sea_orm::{
    sea_query::Expr, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Store operations the ingestion pipeline depends on.
#[async_trait]
pub trait EmoticonStore: Send + Sync {
    /// Find a pack by ID.
    async fn find_by_id(&self, emoticon_id: i64) -> AppResult<Option<emoticon::Model>>;

    /// Delete a pack. Deleting a missing row is not an error.
    async fn delete(&self, emoticon_id: i64) -> AppResult<()>;

    /// Insert a new pack.
    async fn insert(&self, model: emoticon::Model) -> AppResult<()>;

    /// Highest known pack ID, `None` when the table is empty.
    async fn max_id(&self) -> AppResult<Option<i64>>;
}

/// Emoticon repository for database operations.
#[derive(Clone)]
pub struct EmoticonRepository {
    db: Arc<DatabaseConnection>,
}

impl EmoticonRepository {
    /// Create a new emoticon repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a pack by ID.
    pub async fn find_by_id(&self, emoticon_id: i64) -> AppResult<Option<emoticon::Model>> {
        Emoticon::find_by_id(emoticon_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a pack by ID without loading its provider metadata.
    pub async fn find_detail(
        &self,
        emoticon_id: i64,
    ) -> AppResult<Option<emoticon::EmoticonDetail>> {
        Emoticon::find_by_id(emoticon_id)
            .select_only()
            .columns([
                emoticon::Column::EmoticonId,
                emoticon::Column::Name,
                emoticon::Column::Description,
                emoticon::Column::Icon,
                emoticon::Column::ArchiveUrl,
                emoticon::Column::ArchiveSize,
                emoticon::Column::Animated,
                emoticon::Column::Images,
            ])
            .into_model::<emoticon::EmoticonDetail>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a pack by ID.
    pub async fn delete(&self, emoticon_id: i64) -> AppResult<()> {
        Emoticon::delete_by_id(emoticon_id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Insert a pack.
    pub async fn insert(&self, model: emoticon::Model) -> AppResult<()> {
        let active = emoticon::ActiveModel {
            emoticon_id: Set(model.emoticon_id),
            name: Set(model.name),
            description: Set(model.description),
            icon: Set(model.icon),
            archive_url: Set(model.archive_url),
            archive_size: Set(model.archive_size),
            animated: Set(model.animated),
            images: Set(model.images),
            metadata: Set(model.metadata),
        };

        Emoticon::insert(active)
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Search packs by name, newest first.
    pub async fn search(
        &self,
        keyword: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<emoticon::EmoticonSummary>> {
        Emoticon::find()
            .select_only()
            .columns([
                emoticon::Column::EmoticonId,
                emoticon::Column::Name,
                emoticon::Column::Description,
                emoticon::Column::Icon,
                emoticon::Column::ArchiveUrl,
                emoticon::Column::ArchiveSize,
                emoticon::Column::Animated,
            ])
            .filter(name_filter(keyword))
            .order_by_desc(emoticon::Column::EmoticonId)
            .offset(offset)
            .limit(limit)
            .into_model::<emoticon::EmoticonSummary>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count packs matching a name search.
    pub async fn count(&self, keyword: Option<&str>) -> AppResult<u64> {
        Emoticon::find()
            .filter(name_filter(keyword))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Highest known pack ID.
    pub async fn max_id(&self) -> AppResult<Option<i64>> {
        let max = Emoticon::find()
            .select_only()
            .column_as(Expr::col(emoticon::Column::EmoticonId).max(), "max_id")
            .into_tuple::<Option<i64>>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(max.flatten())
    }
}

fn name_filter(keyword: Option<&str>) -> Condition {
    Condition::all().add_option(
        keyword
            .filter(|k| !k.is_empty())
            .map(|k| emoticon::Column::Name.like(format!("%{k}%"))),
    )
}

#[async_trait]
impl EmoticonStore for EmoticonRepository {
    async fn find_by_id(&self, emoticon_id: i64) -> AppResult<Option<emoticon::Model>> {
        Self::find_by_id(self, emoticon_id).await
    }

    async fn delete(&self, emoticon_id: i64) -> AppResult<()> {
        Self::delete(self, emoticon_id).await
    }

    async fn insert(&self, model: emoticon::Model) -> AppResult<()> {
        Self::insert(self, model).await
    }

    async fn max_id(&self) -> AppResult<Option<i64>> {
        Self::max_id(self).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    fn create_test_emoticon(emoticon_id: i64, name: &str) -> emoticon::Model {
        emoticon::Model {
            emoticon_id,
            name: name.to_string(),
            description: "A test pack".to_string(),
            icon: format!("https://cdn.test/{emoticon_id}/200x200.png"),
            archive_url: String::new(),
            archive_size: 0,
            animated: false,
            images: json!([]),
            metadata: json!({ "appData": { "name": name } }),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_returns_emoticon() {
        let pack = create_test_emoticon(203_291, "Cats");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([[pack.clone()]])
                .into_connection(),
        );

        let repo = EmoticonRepository::new(db);
        let found = repo.find_by_id(203_291).await.unwrap().unwrap();

        assert_eq!(found, pack);
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([Vec::<emoticon::Model>::new()])
                .into_connection(),
        );

        let repo = EmoticonRepository::new(db);
        assert!(repo.find_by_id(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_detail_returns_images() {
        let pack = create_test_emoticon(7, "Dogs");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([[pack.clone()]])
                .into_connection(),
        );

        let repo = EmoticonRepository::new(db);
        let detail = repo.find_detail(7).await.unwrap().unwrap();

        assert_eq!(detail.emoticon_id, 7);
        assert_eq!(detail.images, pack.images);
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_ok() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = EmoticonRepository::new(db);
        assert!(repo.delete(42).await.is_ok());
    }

    #[tokio::test]
    async fn test_count_returns_correct_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::Int(Some(7))
                }]])
                .into_connection(),
        );

        let repo = EmoticonRepository::new(db);
        assert_eq!(repo.count(Some("cat")).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_max_id_of_empty_table_is_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([[maplit::btreemap! {
                    "max_id" => sea_orm::Value::BigInt(None)
                }]])
                .into_connection(),
        );

        let repo = EmoticonRepository::new(db);
        assert_eq!(repo.max_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_search_returns_summaries() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([[
                    create_test_emoticon(3, "Black cat"),
                    create_test_emoticon(1, "Cat"),
                ]])
                .into_connection(),
        );

        let repo = EmoticonRepository::new(db);
        let results = repo.search(Some("cat"), 10, 0).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].emoticon_id, 3);
        assert_eq!(results[1].name, "Cat");
    }
}
