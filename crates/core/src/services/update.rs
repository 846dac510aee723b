//! Update orchestration.
//!
//! Each requested ID goes through
//! `pending -> unchanged | fetching -> archiving -> fetched | failed`.
//! At most `update.concurrency` IDs are in flight across all batches, and
//! every attempt leaves exactly one entry in the [`StatusLog`].

use std::sync::Arc;

use futures::future::join_all;
use qsticker_common::{is_remote_url, ArchiveStorage};
use qsticker_db::repositories::EmoticonStore;
use tokio::sync::Semaphore;
use tracing::{error, info, instrument};

use super::archiver::PackArchiver;
use super::provider::PackFetcher;
use super::status_log::{FetchOutcome, FetchResult, StatusLog};
use crate::IngestError;

/// Runs fetch-archive-store workflows under a shared concurrency limit.
#[derive(Clone)]
pub struct UpdateService {
    store: Arc<dyn EmoticonStore>,
    fetcher: Arc<dyn PackFetcher>,
    archiver: Arc<dyn PackArchiver>,
    storage: ArchiveStorage,
    salt: String,
    limiter: Arc<Semaphore>,
    status: Arc<StatusLog>,
}

impl UpdateService {
    /// Create a new update service.
    #[must_use]
    pub fn new(
        store: Arc<dyn EmoticonStore>,
        fetcher: Arc<dyn PackFetcher>,
        archiver: Arc<dyn PackArchiver>,
        storage: ArchiveStorage,
        salt: String,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            archiver,
            storage,
            salt,
            limiter: Arc::new(Semaphore::new(concurrency.max(1))),
            status: Arc::new(StatusLog::new()),
        }
    }

    /// The log every attempt is recorded in.
    #[must_use]
    pub fn status_log(&self) -> Arc<StatusLog> {
        self.status.clone()
    }

    /// Update every ID, resolving once all attempts have finished.
    ///
    /// Completion order is unspecified. Failures are contained per ID.
    pub async fn update_many(&self, ids: Vec<i64>, force: bool) -> Vec<FetchOutcome> {
        join_all(ids.into_iter().map(|id| self.update_one(id, force))).await
    }

    /// Update a single ID once a slot is free.
    pub async fn update_one(&self, emoticon_id: i64, force: bool) -> FetchOutcome {
        let result = match self.limiter.acquire().await {
            Ok(_permit) => match self.run(emoticon_id, force).await {
                Ok(result) => result,
                Err(e) => {
                    error!(emoticon_id, error = %e, "Emoticon update failed");
                    FetchResult::Failed
                }
            },
            Err(e) => {
                error!(emoticon_id, error = %e, "Update limiter closed");
                FetchResult::Failed
            }
        };

        info!(emoticon_id, result = %result, "Emoticon update finished");
        let outcome = FetchOutcome::now(emoticon_id, result);
        self.status.append(outcome.clone()).await;
        outcome
    }

    #[instrument(skip(self), level = "debug")]
    async fn run(&self, emoticon_id: i64, force: bool) -> Result<FetchResult, IngestError> {
        if !force {
            if let Some(existing) = self.store.find_by_id(emoticon_id).await? {
                if is_remote_url(&existing.archive_url)
                    || self.storage.exists(&existing.archive_url).await
                {
                    return Ok(FetchResult::Unchanged);
                }
            }
        }

        // The old row is gone even if the fetch below fails
        self.store.delete(emoticon_id).await?;

        let mut record = self.fetcher.fetch(emoticon_id).await?;

        let archive_url = self
            .storage
            .archive_path(&self.salt, emoticon_id, &record.name);
        let destination = self.storage.resolve(&archive_url);
        self.archiver.archive(&record, &destination).await?;

        let size = tokio::fs::metadata(&destination).await?.len();
        record.archive_url = archive_url;
        record.archive_size = i64::try_from(size).unwrap_or(i64::MAX);

        self.store.insert(record.into_model()).await?;
        Ok(FetchResult::Fetched)
    }
}
