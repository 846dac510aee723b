//! API endpoints.

mod emoticons;
mod update;

use axum::Router;

use crate::middleware::AppState;

pub use update::{parse_stringbool, TargetError, UpdateTarget, MAX_RANGE_SPAN};

/// Create the API router.
///
/// Update endpoints are guarded by [`crate::middleware::require_admin`],
/// which needs the state up front.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/emoticon", emoticons::router())
        .nest("/emoticon/update", update::router(state))
}
