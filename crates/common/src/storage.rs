//! Archive storage layout.
//!
//! Archives live under `<root>/storage/<xx>/<hash>.zip`, where `hash` is a
//! salted HMAC of the emoticon identity and `xx` its first two hex digits.
//! Stored archive URLs are the root-relative path, e.g. `storage/ab/ab12...zip`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use hmac::{Hmac, Mac};
use regex::Regex;
use sha2::Sha256;

/// Directory under the storage root that holds archives.
pub const STORAGE_DIR: &str = "storage";

#[allow(clippy::expect_used)]
static REMOTE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://").expect("valid regex"));

/// Whether an archive URL points at an external host rather than local storage.
#[must_use]
pub fn is_remote_url(url: &str) -> bool {
    REMOTE_URL_RE.is_match(url)
}

/// Local archive storage.
#[derive(Debug, Clone)]
pub struct ArchiveStorage {
    root: PathBuf,
}

impl ArchiveStorage {
    /// Create storage rooted at `root`.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory served as `/storage`.
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(STORAGE_DIR)
    }

    /// Root-relative archive path for an emoticon, always `/`-separated.
    #[allow(clippy::expect_used)] // HMAC accepts any key size, this cannot fail
    #[must_use]
    pub fn archive_path(&self, salt: &str, emoticon_id: i64, name: &str) -> String {
        type HmacSha256 = Hmac<Sha256>;

        let mut mac =
            HmacSha256::new_from_slice(salt.as_bytes()).expect("HMAC can take key of any size");
        mac.update(format!("{emoticon_id}#{name}").as_bytes());
        let hash = hex::encode(mac.finalize().into_bytes());

        format!("{STORAGE_DIR}/{}/{hash}.zip", &hash[..2])
    }

    /// Filesystem location of a root-relative archive path.
    #[must_use]
    pub fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    /// Whether a stored archive URL is still backed by a file on disk.
    ///
    /// Empty URLs (never archived) count as missing.
    pub async fn exists(&self, relative: &str) -> bool {
        if relative.is_empty() {
            return false;
        }
        tokio::fs::metadata(self.resolve(relative))
            .await
            .is_ok_and(|meta| meta.is_file())
    }
}
