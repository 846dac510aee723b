//! Scheduled update sweeps.

#![allow(missing_docs)]

use std::sync::Arc;

use chrono::Local;
use qsticker_common::config::UpdateConfig;
use qsticker_core::JobSender;
use qsticker_db::repositories::EmoticonStore;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Cron expression, five or six fields, in local time.
    pub cron: String,
}

impl From<&UpdateConfig> for SchedulerConfig {
    fn from(config: &UpdateConfig) -> Self {
        Self {
            cron: config.cron.clone(),
        }
    }
}

/// Job executor trait for scheduled jobs.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run one update sweep, returning the enqueued ID range if any.
    async fn update_sweep(
        &self,
    ) -> Result<Option<(i64, i64)>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Enqueues `[max - range, max + range]` around the highest stored ID.
#[derive(Clone)]
pub struct UpdateSweep {
    store: Arc<dyn EmoticonStore>,
    jobs: JobSender,
    range: i64,
}

impl UpdateSweep {
    #[must_use]
    pub fn new(store: Arc<dyn EmoticonStore>, jobs: JobSender, range: i64) -> Self {
        Self { store, jobs, range }
    }
}

#[async_trait::async_trait]
impl JobExecutor for UpdateSweep {
    async fn update_sweep(
        &self,
    ) -> Result<Option<(i64, i64)>, Box<dyn std::error::Error + Send + Sync>> {
        let Some(max) = self.store.max_id().await? else {
            return Ok(None);
        };

        let (from, to) = update_window(max, self.range);
        self.jobs.update((from..=to).collect(), false).await?;
        Ok(Some((from, to)))
    }
}

/// Prepend a seconds field to five-field cron expressions.
#[must_use]
pub fn normalize_cron(expr: &str) -> String {
    let expr = expr.trim();
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

/// The ID window swept around `max`. IDs start at 1.
#[must_use]
pub fn update_window(max: i64, range: i64) -> (i64, i64) {
    let range = range.max(0);
    (max.saturating_sub(range).max(1), max.saturating_add(range))
}

/// Build the sweep job. The cron expression is evaluated in local time.
fn sweep_job<E: JobExecutor + 'static>(
    cron: &str,
    executor: Arc<E>,
) -> Result<Job, JobSchedulerError> {
    Job::new_async_tz(cron, Local, move |_uuid, _lock| {
        let executor = executor.clone();
        Box::pin(async move {
            match executor.update_sweep().await {
                Ok(Some((from, to))) => {
                    tracing::info!(from, to, "Scheduled emoticon update enqueued");
                }
                Ok(None) => {
                    tracing::info!("No emoticons stored yet, skipping scheduled update");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Scheduled emoticon update failed");
                }
            }
        })
    })
}

/// Start the cron scheduler. The returned handle must be kept alive.
pub async fn start_scheduler<E: JobExecutor + 'static>(
    config: SchedulerConfig,
    executor: Arc<E>,
) -> Result<JobScheduler, JobSchedulerError> {
    let cron = normalize_cron(&config.cron);
    let scheduler = JobScheduler::new().await?;

    scheduler.add(sweep_job(&cron, executor)?).await?;
    scheduler.start().await?;
    tracing::info!(cron = %cron, "Update scheduler started");

    Ok(scheduler)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use qsticker_core::Job as QueueJob;
    use qsticker_db::repositories::EmoticonRepository;
    use qsticker_db::test_utils::{emoticon_fixture, TestDatabase};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn store_with(ids: &[i64]) -> Arc<dyn EmoticonStore> {
        let db = TestDatabase::new().await.unwrap();
        let repo = EmoticonRepository::new(Arc::new(db.into_connection()));
        for &id in ids {
            repo.insert(emoticon_fixture(id, "Pack")).await.unwrap();
        }
        Arc::new(repo)
    }

    #[test]
    fn test_normalize_cron() {
        assert_eq!(normalize_cron("0 0 * * *"), "0 0 0 * * *");
        assert_eq!(normalize_cron(" */5 * * * * "), "0 */5 * * * *");
        assert_eq!(normalize_cron("30 0 0 * * *"), "30 0 0 * * *");
    }

    #[test]
    fn test_update_window() {
        assert_eq!(update_window(1000, 20), (980, 1020));
        assert_eq!(update_window(5, 20), (1, 25));
        assert_eq!(update_window(5, -3), (5, 5));
    }

    #[tokio::test]
    async fn test_sweep_enqueues_window_without_force() {
        let (tx, mut rx) = mpsc::channel(4);
        let sweep = UpdateSweep::new(store_with(&[100, 250]).await, JobSender::from(tx), 2);

        let window = sweep.update_sweep().await.unwrap();

        assert_eq!(window, Some((248, 252)));
        assert_eq!(
            rx.recv().await.unwrap(),
            QueueJob::Update {
                ids: vec![248, 249, 250, 251, 252],
                force: false,
            }
        );
    }

    #[tokio::test]
    async fn test_sweep_skips_empty_store() {
        let (tx, mut rx) = mpsc::channel(4);
        let sweep = UpdateSweep::new(store_with(&[]).await, JobSender::from(tx), 20);

        assert_eq!(sweep.update_sweep().await.unwrap(), None);
        assert!(rx.try_recv().is_err());
    }

    struct CountingExecutor {
        runs: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl JobExecutor for CountingExecutor {
        async fn update_sweep(
            &self,
        ) -> Result<Option<(i64, i64)>, Box<dyn std::error::Error + Send + Sync>> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scheduler_fires_on_cron() {
        let executor = Arc::new(CountingExecutor {
            runs: AtomicUsize::new(0),
        });
        let config = SchedulerConfig {
            cron: "* * * * * *".to_string(),
        };

        let mut scheduler = start_scheduler(config, executor.clone()).await.unwrap();
        for _ in 0..40 {
            if executor.runs.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        scheduler.shutdown().await.unwrap();

        assert!(executor.runs.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_sweep_runs_on_local_time() {
        let hour = (Local::now().hour() + 2) % 24;
        let executor = Arc::new(CountingExecutor {
            runs: AtomicUsize::new(0),
        });

        let mut scheduler = JobScheduler::new().await.unwrap();
        let id = scheduler
            .add(sweep_job(&format!("0 0 {hour} * * *"), executor).unwrap())
            .await
            .unwrap();
        let next = scheduler.next_tick_for_job(id).await.unwrap().unwrap();

        let local = next.with_timezone(&Local);
        assert_eq!((local.hour(), local.minute()), (hour, 0));
    }
}
