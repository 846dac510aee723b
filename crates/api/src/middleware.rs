//! API middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use qsticker_core::{CatalogService, JobSender, ProviderClient, StatusLog};
use tracing::debug;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Read side of the catalog.
    pub catalog_service: CatalogService,
    /// Queue update batches are handed to.
    pub jobs: JobSender,
    /// Recent update outcomes.
    pub status_log: Arc<StatusLog>,
    /// Upstream client, used by the image proxy.
    pub provider: ProviderClient,
    /// Mount path, normalized to start and end with `/`.
    pub base_path: Arc<str>,
    /// Bearer token for update endpoints; `None` leaves them open.
    pub admin_token: Option<Arc<str>>,
}

/// Reject requests without the configured admin bearer token.
///
/// Rejections are a bare 403 with no body.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected) = state.admin_token.as_deref() {
        let presented = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        if presented != Some(expected) {
            debug!(path = %req.uri().path(), "Rejected update request with bad token");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    next.run(req).await
}
