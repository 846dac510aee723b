//! Background scheduling for qsticker.
//!
//! A cron job periodically sweeps a window of emoticon IDs around the
//! highest known one and hands the batch to the in-memory job queue.

pub mod scheduler;

pub use scheduler::{
    normalize_cron, start_scheduler, update_window, JobExecutor, SchedulerConfig, UpdateSweep,
};
