//! Business logic services.

#![allow(missing_docs)]

pub mod archiver;
pub mod catalog;
pub mod jobs;
pub mod media;
pub mod optimizer;
pub mod provider;
pub mod status_log;
pub mod update;

#[cfg(test)]
pub(crate) mod testing;

pub use archiver::{PackArchiver, ZipArchiver};
pub use catalog::{public_archive_url, CatalogPage, CatalogService, PAGE_SIZE};
pub use jobs::{Job, JobSender, JobService};
pub use media::ImageFormat;
pub use optimizer::{ImageKind, ImageOptimizer};
pub use provider::{
    is_md5, CdnUrls, EmoticonMetadata, EmoticonRecord, PackFetcher, ParcelFile, ProviderClient,
};
pub use status_log::{FetchOutcome, FetchResult, StatusLog, STATUS_LOG_CAPACITY};
pub use update::UpdateService;
