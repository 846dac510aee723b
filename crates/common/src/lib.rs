//! Common utilities and shared types for qsticker.
//!
//! This crate provides foundational components used across all qsticker crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Storage**: Content-addressed archive paths and on-disk checks
//!
//! # Example
//!
//! ```no_run
//! use qsticker_common::{ArchiveStorage, Config};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let storage = ArchiveStorage::new(config.storage.root.clone());
//!     let path = storage.archive_path(&config.update.salt, 203_291, "Cats");
//!     println!("Archive goes to: {path}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use storage::{ArchiveStorage, STORAGE_DIR, is_remote_url};
