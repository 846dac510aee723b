//! Pass-through proxy for provider preview images.
//!
//! `/parcel/{key}/{file}` maps onto the CDN: a 32-digit lowercase hex key
//! is an image MD5, a 6-digit key is a pack ID. Successful responses are
//! streamed back with CDN-internal headers removed and a long immutable
//! cache lifetime.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use qsticker_common::AppError;
use qsticker_core::{CdnUrls, ParcelFile};
use tracing::{debug, warn};

use crate::middleware::AppState;

/// Cache policy for content that never changes under its URL.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, immutable, max-age=604800";

/// Upstream headers that are not forwarded.
const STRIPPED_HEADERS: [&str; 9] = [
    "alt-svc",
    "server",
    "vary",
    "x-cache-lookup",
    "x-datasrc",
    "x-nws-log-uuid",
    "x-reqgue",
    "connection",
    "transfer-encoding",
];

/// Create proxy router.
pub fn router() -> Router<AppState> {
    Router::new().route("/parcel/{key}/{file}", get(parcel_image))
}

/// CDN URL for a proxied path, or `None` if the path is not proxyable.
#[must_use]
pub fn upstream_url(cdn: &CdnUrls, key: &str, file: &str) -> Option<String> {
    let file = ParcelFile::from_file_name(file)?;

    if key.len() == 32 && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Some(cdn.item(key, file));
    }

    // Pack IDs never start with 0, so the number round-trips to the same path
    if key.len() == 6 && !key.starts_with('0') && key.bytes().all(|b| b.is_ascii_digit()) {
        return key.parse().ok().map(|id| cdn.parcel_image(id, file));
    }

    None
}

async fn parcel_image(
    State(state): State<AppState>,
    Path((key, file)): Path<(String, String)>,
) -> Response {
    let Some(url) = upstream_url(state.provider.cdn(), &key, &file) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let upstream = match state.provider.http().get(&url).send().await {
        Ok(upstream) => upstream,
        Err(e) => {
            warn!(url = %url, error = %e, "Parcel proxy request failed");
            return AppError::ExternalService(e.to_string()).into_response();
        }
    };

    let status = upstream.status();
    if status == StatusCode::OK {
        let mut headers = upstream.headers().clone();
        for name in STRIPPED_HEADERS {
            headers.remove(name);
        }
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
        );

        let mut response = Body::from_stream(upstream.bytes_stream()).into_response();
        *response.headers_mut() = headers;
        return response;
    }

    debug!(url = %url, status = %status, "Parcel proxy upstream error");
    if status == StatusCode::NOT_FOUND {
        StatusCode::NOT_FOUND.into_response()
    } else if status.is_client_error() || status.is_server_error() {
        status.into_response()
    } else {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
