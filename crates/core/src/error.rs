//! Errors raised while ingesting a single emoticon pack.

use qsticker_common::AppError;
use thiserror::Error;

/// Failure of one fetch or archive attempt.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The provider has no pack with this ID.
    #[error("emoticon {0} not found upstream")]
    NotFound(i64),

    /// Transport failure or unexpected upstream status.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream data could not be understood.
    #[error("parse error: {0}")]
    Parse(String),

    /// An external optimizer could not be run or exited unsuccessfully.
    #[error("{tool} failed: {reason}")]
    Tool { tool: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisting the result failed.
    #[error("store error: {0}")]
    Store(#[from] AppError),
}

impl IngestError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Io(std::io::Error::other(err))
    }
}

impl From<tempfile::PersistError> for IngestError {
    fn from(err: tempfile::PersistError) -> Self {
        Self::Io(err.error)
    }
}
