//! Request extractors.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::middleware::AppState;

/// Public URL prefix of this deployment as seen by the client,
/// e.g. `https://qs.example/base/`.
///
/// The scheme comes from `X-Forwarded-Proto` (default `http`) and the host
/// from the `Host` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicBase(pub String);

impl FromRequestParts<AppState> for PublicBase {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("http");

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| parts.uri.authority().map(|authority| authority.as_str()))
            .unwrap_or("localhost");

        Ok(Self(format!("{scheme}://{host}{}", state.base_path)))
    }
}
