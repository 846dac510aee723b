//! Pack archiver.
//!
//! Downloads the icon and every image of a pack, optimizes each one as
//! soon as its download finishes, and writes a ZIP of file entries only,
//! laid out as
//!
//! ```text
//! {id} - {name}/
//!     icon.png
//!     emoticon/{keyword}.{gif|png}
//!     metadata.json
//! ```
//!
//! The archive is assembled next to its destination and renamed into place
//! only once complete.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::media::ImageFormat;
use super::optimizer::{ImageKind, ImageOptimizer};
use super::provider::EmoticonRecord;
use crate::IngestError;

/// Writes a record's images into an archive at `destination`.
#[async_trait]
pub trait PackArchiver: Send + Sync {
    /// Build the archive. On error `destination` is left untouched.
    async fn archive(&self, record: &EmoticonRecord, destination: &Path) -> Result<(), IngestError>;
}

/// One file to download into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEntry {
    name: String,
    url: String,
    kind: ImageKind,
}

struct DownloadedEntry {
    name: String,
    file: TempPath,
}

/// ZIP archiver backed by HTTP downloads.
#[derive(Clone)]
pub struct ZipArchiver {
    http: reqwest::Client,
    optimizer: ImageOptimizer,
    download_concurrency: usize,
}

impl ZipArchiver {
    #[must_use]
    pub fn new(http: reqwest::Client, optimizer: ImageOptimizer, download_concurrency: usize) -> Self {
        Self {
            http,
            optimizer,
            download_concurrency: download_concurrency.max(1),
        }
    }

    async fn fetch_entry(
        &self,
        emoticon_id: i64,
        entry: PendingEntry,
    ) -> Result<DownloadedEntry, IngestError> {
        let file = tempfile::Builder::new()
            .prefix("qsticker-")
            .tempfile()?
            .into_temp_path();

        debug!(emoticon_id, url = %entry.url, path = %file.display(), "Downloading image");
        download(&self.http, &entry.url, &file).await?;

        let before = tokio::fs::metadata(&file).await?.len();
        if self.optimizer.optimize(entry.kind, &file).await? {
            let after = tokio::fs::metadata(&file).await?.len();
            let change = if before == 0 {
                0.0
            } else {
                (after as f64 / before as f64 - 1.0) * 100.0
            };
            info!(
                emoticon_id,
                entry = %entry.name,
                before,
                after,
                change = %format!("{change:.2}%"),
                "Optimized image"
            );
        }

        Ok(DownloadedEntry {
            name: entry.name,
            file,
        })
    }
}

#[async_trait]
impl PackArchiver for ZipArchiver {
    async fn archive(&self, record: &EmoticonRecord, destination: &Path) -> Result<(), IngestError> {
        let emoticon_id = record.emoticon_id;
        let root = sanitize_name(&format!("{emoticon_id} - {}", record.name));
        let metadata = serde_json::to_vec_pretty(&record.metadata)
            .map_err(|e| IngestError::parse(format!("cannot encode metadata: {e}")))?;

        let downloaded: Vec<DownloadedEntry> = stream::iter(pending_entries(record))
            .map(|entry| self.fetch_entry(emoticon_id, entry))
            .buffered(self.download_concurrency)
            .try_collect()
            .await?;

        let dest = destination.to_path_buf();
        tokio::task::spawn_blocking(move || write_zip(&dest, &root, &downloaded, &metadata))
            .await
            .map_err(|e| IngestError::Io(std::io::Error::other(e)))??;

        let size = tokio::fs::metadata(destination).await?.len();
        info!(emoticon_id, path = %destination.display(), size, "Saved archive");
        Ok(())
    }
}

async fn download(http: &reqwest::Client, url: &str, path: &Path) -> Result<(), IngestError> {
    let response = http.get(url).send().await?.error_for_status()?;

    let mut out = tokio::fs::File::create(path).await?;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        out.write_all(&chunk?).await?;
    }
    out.flush().await?;
    Ok(())
}

/// Icon first, then every image in provider order with a unique entry name.
fn pending_entries(record: &EmoticonRecord) -> Vec<PendingEntry> {
    let format = ImageFormat::for_pack(record.animated);
    let kind = if record.animated {
        ImageKind::Animated
    } else {
        ImageKind::Static
    };

    let mut used = HashSet::new();
    let mut entries = Vec::with_capacity(record.images.len() + 1);
    entries.push(PendingEntry {
        name: "icon.png".to_string(),
        url: record.icon.clone(),
        kind: ImageKind::Icon,
    });

    for image in &record.images {
        let stem = unique_stem(&mut used, &sanitize_name(&image.keyword));
        entries.push(PendingEntry {
            name: format!("emoticon/{stem}.{}", format.extension()),
            url: image.src.clone(),
            kind,
        });
    }
    entries
}

/// Make a name safe to use as a single path component.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();

    match cleaned {
        "" => "image".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned.to_string(),
    }
}

fn unique_stem(used: &mut HashSet<String>, stem: &str) -> String {
    if used.insert(stem.to_string()) {
        return stem.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{stem} ({n})");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn write_zip(
    destination: &Path,
    root: &str,
    entries: &[DownloadedEntry],
    metadata: &[u8],
) -> Result<(), IngestError> {
    let dir = destination.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "archive destination has no parent directory",
        )
    })?;
    std::fs::create_dir_all(dir)?;

    let mut part = tempfile::Builder::new()
        .prefix(".")
        .suffix(".zip.part")
        .tempfile_in(dir)?;

    {
        let mut zip = ZipWriter::new(part.as_file_mut());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in entries {
            zip.start_file(format!("{root}/{}", entry.name), options)?;
            let mut source = std::fs::File::open(&entry.file)?;
            std::io::copy(&mut source, &mut zip)?;
        }
        zip.start_file(format!("{root}/metadata.json"), options)?;
        zip.write_all(metadata)?;
        zip.finish()?;
    }

    part.persist(destination)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use qsticker_db::entities::emoticon::EmoticonImage;
    use serde_json::json;

    fn record(animated: bool, keywords: &[&str]) -> EmoticonRecord {
        EmoticonRecord {
            emoticon_id: 42,
            name: "Cats".to_string(),
            description: String::new(),
            icon: "https://cdn.test/icon.png".to_string(),
            archive_url: String::new(),
            archive_size: 0,
            animated,
            images: keywords
                .iter()
                .enumerate()
                .map(|(i, k)| EmoticonImage {
                    keyword: (*k).to_string(),
                    src: format!("https://cdn.test/{i}"),
                    preview: format!("https://cdn.test/{i}.png"),
                })
                .collect(),
            metadata: json!({}),
        }
    }

    #[test]
    fn test_pending_entries_static_pack() {
        let entries = pending_entries(&record(false, &["hi", "bye"]));

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["icon.png", "emoticon/hi.png", "emoticon/bye.png"]);
        assert_eq!(entries[0].kind, ImageKind::Icon);
        assert_eq!(entries[1].kind, ImageKind::Static);
        assert_eq!(entries[2].url, "https://cdn.test/1");
    }

    #[test]
    fn test_pending_entries_animated_pack() {
        let entries = pending_entries(&record(true, &["hi"]));

        assert_eq!(entries[0].kind, ImageKind::Icon);
        assert_eq!(entries[1].name, "emoticon/hi.gif");
        assert_eq!(entries[1].kind, ImageKind::Animated);
    }

    #[test]
    fn test_duplicate_keywords_get_distinct_names() {
        let entries = pending_entries(&record(false, &["ok", "ok", "ok", "ok (1)"]));

        let names: Vec<&str> = entries.iter().skip(1).map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            ["emoticon/ok.png", "emoticon/ok (1).png", "emoticon/ok (2).png", "emoticon/ok (1) (1).png"]
        );
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("  "), "image");
        assert_eq!(sanitize_name(".."), "__");
        assert_eq!(sanitize_name("42 - Cats"), "42 - Cats");
    }
}
