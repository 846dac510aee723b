//! In-memory stand-ins for the pipeline's collaborators.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use qsticker_common::{AppError, AppResult};
use qsticker_db::entities::emoticon::{self, EmoticonImage};
use qsticker_db::repositories::EmoticonStore;
use serde_json::json;

use super::archiver::PackArchiver;
use super::provider::{EmoticonRecord, PackFetcher};
use crate::IngestError;

#[derive(Default)]
pub struct FakeStore {
    rows: Mutex<HashMap<i64, emoticon::Model>>,
}

impl FakeStore {
    pub fn get(&self, emoticon_id: i64) -> Option<emoticon::Model> {
        self.rows.lock().unwrap().get(&emoticon_id).cloned()
    }

    pub fn put(&self, model: emoticon::Model) {
        self.rows.lock().unwrap().insert(model.emoticon_id, model);
    }
}

#[async_trait]
impl EmoticonStore for FakeStore {
    async fn find_by_id(&self, emoticon_id: i64) -> AppResult<Option<emoticon::Model>> {
        Ok(self.get(emoticon_id))
    }

    async fn delete(&self, emoticon_id: i64) -> AppResult<()> {
        self.rows.lock().unwrap().remove(&emoticon_id);
        Ok(())
    }

    async fn insert(&self, model: emoticon::Model) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&model.emoticon_id) {
            return Err(AppError::Database("UNIQUE constraint failed".to_string()));
        }
        rows.insert(model.emoticon_id, model);
        Ok(())
    }

    async fn max_id(&self) -> AppResult<Option<i64>> {
        Ok(self.rows.lock().unwrap().keys().max().copied())
    }
}

/// Fetcher producing `Pack {id}` records and tracking overlap.
#[derive(Default)]
pub struct FakeFetcher {
    pub calls: AtomicUsize,
    pub peak: AtomicUsize,
    in_flight: AtomicUsize,
    delay: Option<Duration>,
    failing: HashSet<i64>,
}

impl FakeFetcher {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn failing(ids: &[i64]) -> Self {
        Self {
            failing: ids.iter().copied().collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PackFetcher for FakeFetcher {
    async fn fetch(&self, emoticon_id: i64) -> Result<EmoticonRecord, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&emoticon_id) {
            return Err(IngestError::NotFound(emoticon_id));
        }

        Ok(EmoticonRecord {
            emoticon_id,
            name: format!("Pack {emoticon_id}"),
            description: String::new(),
            icon: format!("https://cdn.test/{emoticon_id}/200x200.png"),
            archive_url: String::new(),
            archive_size: 0,
            animated: false,
            images: vec![EmoticonImage {
                keyword: "hi".to_string(),
                src: "https://cdn.test/hi.png".to_string(),
                preview: "https://cdn.test/hi.png".to_string(),
            }],
            metadata: json!({ "id": emoticon_id }),
        })
    }
}

/// Archiver writing a fixed payload to the destination.
#[derive(Default)]
pub struct FakeArchiver {
    failing: HashSet<i64>,
}

impl FakeArchiver {
    pub const CONTENT: &'static [u8] = b"PK\x05\x06 fake archive";

    pub fn failing(ids: &[i64]) -> Self {
        Self {
            failing: ids.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl PackArchiver for FakeArchiver {
    async fn archive(&self, record: &EmoticonRecord, destination: &Path) -> Result<(), IngestError> {
        if self.failing.contains(&record.emoticon_id) {
            return Err(IngestError::Tool {
                tool: "oxipng".to_string(),
                reason: "exit status: 1".to_string(),
            });
        }
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, Self::CONTENT).await?;
        Ok(())
    }
}
