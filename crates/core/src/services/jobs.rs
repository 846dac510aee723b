//! Job processing service for background tasks.
//!
//! This module provides a simple in-memory job queue. HTTP handlers and the
//! scheduler enqueue update batches and return immediately; the processor
//! runs each batch on its own task while [`UpdateService`] bounds the total
//! number of IDs in flight.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::update::UpdateService;

/// Channel buffer size for jobs.
const JOB_BUFFER_SIZE: usize = 1000;

/// Job types that can be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Fetch and archive a batch of emoticon packs.
    Update { ids: Vec<i64>, force: bool },
}

/// Job sender for enqueueing jobs.
#[derive(Clone)]
pub struct JobSender {
    sender: mpsc::Sender<Job>,
}

impl JobSender {
    /// Enqueue a job for processing.
    pub async fn enqueue(&self, job: Job) -> Result<(), &'static str> {
        self.sender.send(job).await.map_err(|_| "Job queue is closed")
    }

    /// Enqueue an update batch.
    pub async fn update(&self, ids: Vec<i64>, force: bool) -> Result<(), &'static str> {
        self.enqueue(Job::Update { ids, force }).await
    }
}

impl From<mpsc::Sender<Job>> for JobSender {
    fn from(sender: mpsc::Sender<Job>) -> Self {
        Self { sender }
    }
}

/// Job processing service.
pub struct JobService {
    sender: mpsc::Sender<Job>,
    receiver: mpsc::Receiver<Job>,
}

impl JobService {
    /// Create a new job service.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(JOB_BUFFER_SIZE);
        Self { sender, receiver }
    }

    /// Get a job sender for enqueueing jobs.
    #[must_use]
    pub fn sender(&self) -> JobSender {
        JobSender {
            sender: self.sender.clone(),
        }
    }

    /// Start the job processor.
    /// This consumes the receiver and spawns a task per job.
    pub fn start(self, update: Arc<UpdateService>) {
        let Self { receiver, .. } = self;

        tokio::spawn(async move {
            info!("Job worker starting");
            run_job_processor(receiver, update).await;
            info!("Job worker stopped");
        });
    }
}

impl Default for JobService {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the job processor until every sender is dropped.
async fn run_job_processor(mut receiver: mpsc::Receiver<Job>, update: Arc<UpdateService>) {
    while let Some(job) = receiver.recv().await {
        let update = update.clone();
        tokio::spawn(async move {
            process_job(job, &update).await;
        });
    }
}

/// Process a single job.
async fn process_job(job: Job, update: &UpdateService) {
    match job {
        Job::Update { ids, force } => {
            debug!(count = ids.len(), force, "Processing update batch");
            let outcomes = update.update_many(ids, force).await;
            debug!(count = outcomes.len(), "Update batch finished");
        }
    }
}
