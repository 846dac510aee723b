//! Catalog service.

use qsticker_common::{is_remote_url, AppResult};
use qsticker_db::entities::emoticon::{EmoticonDetail, EmoticonSummary};
use qsticker_db::repositories::EmoticonRepository;
use serde::Serialize;

/// Packs per catalog page.
pub const PAGE_SIZE: u64 = 10;

/// One page of catalog results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogPage {
    /// Packs matching the search.
    pub count: u64,
    /// Number of pages at [`PAGE_SIZE`] per page.
    pub pages: u64,
    pub result: Vec<EmoticonSummary>,
}

/// Service for browsing archived packs.
#[derive(Clone)]
pub struct CatalogService {
    emoticon_repo: EmoticonRepository,
}

impl CatalogService {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(emoticon_repo: EmoticonRepository) -> Self {
        Self { emoticon_repo }
    }

    /// Get a pack, with local archive paths prefixed by `public_base`.
    pub async fn get(
        &self,
        emoticon_id: i64,
        public_base: &str,
    ) -> AppResult<Option<EmoticonDetail>> {
        let detail = self.emoticon_repo.find_detail(emoticon_id).await?;
        Ok(detail.map(|mut d| {
            d.archive_url = public_archive_url(&d.archive_url, public_base);
            d
        }))
    }

    /// Search packs by name, newest first. `page` starts at 1.
    pub async fn search(
        &self,
        keyword: Option<&str>,
        page: u64,
        public_base: &str,
    ) -> AppResult<CatalogPage> {
        let count = self.emoticon_repo.count(keyword).await?;
        let offset = page.saturating_sub(1).saturating_mul(PAGE_SIZE);
        let mut result = self
            .emoticon_repo
            .search(keyword, PAGE_SIZE, offset)
            .await?;

        for summary in &mut result {
            summary.archive_url = public_archive_url(&summary.archive_url, public_base);
        }

        Ok(CatalogPage {
            count,
            pages: count.div_ceil(PAGE_SIZE),
            result,
        })
    }
}

/// Absolute download URL for a stored archive URL.
///
/// External URLs pass through; storage paths are appended to `public_base`
/// (origin plus mount path, ending in `/`).
#[must_use]
pub fn public_archive_url(archive_url: &str, public_base: &str) -> String {
    if is_remote_url(archive_url) {
        archive_url.to_string()
    } else {
        format!("{public_base}{archive_url}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use qsticker_db::test_utils::emoticon_fixture;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    #[test]
    fn test_public_archive_url() {
        assert_eq!(
            public_archive_url("storage/ab/ab12.zip", "https://qs.test/base/"),
            "https://qs.test/base/storage/ab/ab12.zip"
        );
        assert_eq!(
            public_archive_url("https://mirror.test/1.zip", "https://qs.test/"),
            "https://mirror.test/1.zip"
        );
    }

    #[tokio::test]
    async fn test_search_builds_page() {
        let mut archived = emoticon_fixture(12, "Cat");
        archived.archive_url = "storage/ab/ab.zip".to_string();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::Int(Some(21))
                }]])
                .append_query_results([[archived]])
                .into_connection(),
        );

        let service = CatalogService::new(EmoticonRepository::new(db));
        let page = service
            .search(Some("cat"), 3, "http://localhost:3000/")
            .await
            .unwrap();

        assert_eq!(page.count, 21);
        assert_eq!(page.pages, 3);
        assert_eq!(page.result.len(), 1);
        assert_eq!(
            page.result[0].archive_url,
            "http://localhost:3000/storage/ab/ab.zip"
        );
    }

    #[tokio::test]
    async fn test_get_missing_pack() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([Vec::<qsticker_db::entities::emoticon::Model>::new()])
                .into_connection(),
        );

        let service = CatalogService::new(EmoticonRepository::new(db));
        assert!(service.get(1, "http://localhost/").await.unwrap().is_none());
    }
}
