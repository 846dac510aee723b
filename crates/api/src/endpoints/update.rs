//! Update trigger and status endpoints.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use qsticker_common::AppError;
use qsticker_core::FetchOutcome;
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;
use tracing::info;

use crate::{
    middleware::{require_admin, AppState},
    response::MessageResponse,
};

/// Largest allowed `to - from` for a range trigger.
pub const MAX_RANGE_SPAN: i64 = 50;

/// Create update router. Every route requires the admin token.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/status", get(update_status))
        .route("/{target}", post(trigger_update))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

/// What a trigger path asks to update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTarget {
    /// `/{id}`
    Single(i64),
    /// `/{from}-{to}`, both ends inclusive.
    Range { from: i64, to: i64 },
}

/// Rejected trigger path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TargetError {
    /// Neither `\d+` nor `\d+-\d+`.
    #[error("Not found")]
    Unrecognized,
    #[error("Invalid emoticon ID")]
    InvalidId,
    #[error("Invalid range")]
    InvalidRange,
    #[error("Only fetch up to {} emoticons at a time", MAX_RANGE_SPAN)]
    RangeTooWide,
}

impl IntoResponse for TargetError {
    fn into_response(self) -> Response {
        match self {
            Self::Unrecognized => StatusCode::NOT_FOUND.into_response(),
            _ => MessageResponse::new(self.to_string()).with_status(StatusCode::BAD_REQUEST),
        }
    }
}

fn parse_id(raw: &str) -> Result<i64, TargetError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TargetError::Unrecognized);
    }
    raw.parse().map_err(|_| TargetError::InvalidId)
}

impl FromStr for UpdateTarget {
    type Err = TargetError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let Some((from, to)) = raw.split_once('-') else {
            let id = parse_id(raw)?;
            if id < 1 {
                return Err(TargetError::InvalidId);
            }
            return Ok(Self::Single(id));
        };

        let (from, to) = (parse_id(from)?, parse_id(to)?);
        if from > to {
            return Err(TargetError::InvalidRange);
        }
        if to - from > MAX_RANGE_SPAN {
            return Err(TargetError::RangeTooWide);
        }
        if from < 1 {
            return Err(TargetError::InvalidId);
        }

        Ok(Self::Range { from, to })
    }
}

impl UpdateTarget {
    /// Every ID covered, ascending.
    #[must_use]
    pub fn ids(self) -> Vec<i64> {
        match self {
            Self::Single(id) => vec![id],
            Self::Range { from, to } => (from..=to).collect(),
        }
    }

    const fn accepted_message(self) -> &'static str {
        match self {
            Self::Single(_) => "Update task added",
            Self::Range { .. } => "Update tasks added",
        }
    }
}

/// Parse a query-string boolean such as `true`, `1`, `yes`, `off`.
#[must_use]
pub fn parse_stringbool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "y" | "enabled" => Some(true),
        "false" | "0" | "no" | "off" | "n" | "disabled" => Some(false),
        _ => None,
    }
}

fn stringbool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_stringbool(&raw)
        .ok_or_else(|| de::Error::invalid_value(de::Unexpected::Str(&raw), &"a boolean string"))
}

/// Trigger query.
#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    /// Re-archive packs that already have a stored archive.
    #[serde(default, deserialize_with = "stringbool")]
    pub force: bool,
}

/// Queue an update and answer without waiting for it.
async fn trigger_update(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Query(query): Query<UpdateQuery>,
) -> Result<MessageResponse, Response> {
    let target: UpdateTarget = raw.parse().map_err(IntoResponse::into_response)?;
    let ids = target.ids();
    info!(target = %raw, count = ids.len(), force = query.force, "Update requested");

    state
        .jobs
        .update(ids, query.force)
        .await
        .map_err(|e| AppError::Queue(e.to_string()).into_response())?;

    Ok(MessageResponse::new(target.accepted_message()))
}

/// Recent update outcomes, newest first.
async fn update_status(State(state): State<AppState>) -> Json<Vec<FetchOutcome>> {
    Json(state.status_log.snapshot().await)
}
