//! Core business logic for qsticker.
//!
//! The ingestion pipeline lives here: [`ProviderClient`] fetches pack
//! metadata, [`ZipArchiver`] downloads and packages the images, and
//! [`UpdateService`] ties both to the store under a global concurrency limit.

pub mod error;
pub mod services;

pub use error::IngestError;
pub use services::*;
