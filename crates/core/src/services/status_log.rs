//! Bounded log of recent update outcomes.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Number of outcomes kept.
pub const STATUS_LOG_CAPACITY: usize = 50;

/// Result of one update attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchResult {
    /// Downloaded, archived and stored.
    Fetched,
    /// Already archived, nothing done.
    Unchanged,
    /// Some step of the attempt returned an error.
    Failed,
}

impl std::fmt::Display for FetchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetched => write!(f, "fetched"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A logged update attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub time: DateTime<Utc>,
    pub emoticon_id: i64,
    pub result: FetchResult,
}

impl FetchOutcome {
    /// An outcome completed now.
    #[must_use]
    pub fn now(emoticon_id: i64, result: FetchResult) -> Self {
        Self {
            time: Utc::now(),
            emoticon_id,
            result,
        }
    }
}

/// Most-recent-first log of update outcomes, kept in memory only.
#[derive(Debug, Default)]
pub struct StatusLog {
    entries: RwLock<VecDeque<FetchOutcome>>,
}

impl StatusLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome, evicting the oldest beyond capacity.
    pub async fn append(&self, outcome: FetchOutcome) {
        let mut entries = self.entries.write().await;
        entries.push_front(outcome);
        entries.truncate(STATUS_LOG_CAPACITY);
    }

    /// All retained outcomes, most recent first.
    pub async fn snapshot(&self) -> Vec<FetchOutcome> {
        self.entries.read().await.iter().cloned().collect()
    }
}
