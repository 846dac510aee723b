//! Catalog endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use qsticker_common::AppResult;
use qsticker_core::CatalogPage;
use serde::Deserialize;
use validator::Validate;

use crate::{extractors::PublicBase, middleware::AppState};

/// Pack details rarely change once archived.
const DETAIL_CACHE_CONTROL: &str = "public, max-age=3600";

/// Create catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_emoticons))
        .route("/{id}", get(get_emoticon))
}

/// Path of a single pack.
#[derive(Debug, Deserialize, Validate)]
pub struct EmoticonPath {
    #[validate(range(min = 1))]
    pub id: i64,
}

/// Catalog search query.
#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u64,
}

const fn default_page() -> u64 {
    1
}

/// Get one pack, including its image list.
async fn get_emoticon(
    State(state): State<AppState>,
    PublicBase(base): PublicBase,
    Path(path): Path<EmoticonPath>,
) -> AppResult<Response> {
    path.validate()?;

    let Some(detail) = state.catalog_service.get(path.id, &base).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    Ok(([(header::CACHE_CONTROL, DETAIL_CACHE_CONTROL)], Json(detail)).into_response())
}

/// Search packs by name, newest first.
async fn search_emoticons(
    State(state): State<AppState>,
    PublicBase(base): PublicBase,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<CatalogPage>> {
    query.validate()?;

    let page = state
        .catalog_service
        .search(query.keyword.as_deref(), query.page, &base)
        .await?;

    Ok(Json(page))
}
