//! Upstream provider client.
//!
//! Pack metadata comes from `{metadata_base}/vipEmoji_item_{id}/xydata.json`.
//! Images are served by the CDN under a path sharded by the first two hex
//! digits of each image's MD5: `{cdn_base}/item/{md5[0..2]}/{md5}/{file}`.

use std::time::Duration;

use async_trait::async_trait;
use qsticker_common::config::ProviderConfig;
use qsticker_db::entities::emoticon::{self, EmoticonImage};
use rand::seq::SliceRandom;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::media::is_animated_gif;
use crate::IngestError;

/// Image variants the CDN serves for every MD5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParcelFile {
    Png126,
    Png200,
    Png300,
    Gif200,
    Gif300,
}

impl ParcelFile {
    /// CDN file name of this variant.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Png126 => "126x126.png",
            Self::Png200 => "200x200.png",
            Self::Png300 => "300x300.png",
            Self::Gif200 => "raw200.gif",
            Self::Gif300 => "raw300.gif",
        }
    }

    /// Parse a CDN file name.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            "126x126.png" => Some(Self::Png126),
            "200x200.png" => Some(Self::Png200),
            "300x300.png" => Some(Self::Png300),
            "raw200.gif" => Some(Self::Gif200),
            "raw300.gif" => Some(Self::Gif300),
            _ => None,
        }
    }
}

/// Whether `s` looks like an image MD5 (32 hex digits).
#[must_use]
pub fn is_md5(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// URL builder for the image CDN.
#[derive(Debug, Clone)]
pub struct CdnUrls {
    base: String,
}

impl CdnUrls {
    #[must_use]
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// URL of one variant of a pack image.
    #[must_use]
    pub fn item(&self, md5: &str, file: ParcelFile) -> String {
        let shard = md5.get(..2).unwrap_or(md5);
        format!("{}/item/{shard}/{md5}/{}", self.base, file.file_name())
    }

    /// URL of a pack's icon.
    #[must_use]
    pub fn pack_icon(&self, emoticon_id: i64) -> String {
        self.parcel_image(emoticon_id, ParcelFile::Png200)
    }

    /// URL of a pack-level image, sharded by the last digit of the ID.
    #[must_use]
    pub fn parcel_image(&self, emoticon_id: i64, file: ParcelFile) -> String {
        format!(
            "{}/img/parcel/{}/{emoticon_id}/{}",
            self.base,
            emoticon_id % 10,
            file.file_name()
        )
    }
}

/// Typed view over the provider's `xydata.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmoticonMetadata {
    #[serde(default)]
    pub app_data: Option<AppData>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub data: PackData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppData {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackData {
    pub base_info: Vec<BaseInfo>,
    pub md5_info: Vec<Md5Info>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseInfo {
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Md5Info {
    /// Keyword shown for the image.
    pub name: String,
    pub md5: String,
}

impl EmoticonMetadata {
    /// Parse and validate raw provider metadata.
    pub fn parse(raw: &Value) -> Result<Self, IngestError> {
        let metadata = Self::deserialize(raw)
            .map_err(|e| IngestError::parse(format!("malformed metadata: {e}")))?;

        if metadata.data.base_info.is_empty() {
            return Err(IngestError::parse("metadata has no baseInfo"));
        }
        if metadata.data.md5_info.is_empty() {
            return Err(IngestError::parse("metadata has no images"));
        }
        if let Some(bad) = metadata.data.md5_info.iter().find(|i| !is_md5(&i.md5)) {
            return Err(IngestError::parse(format!("invalid image md5 {:?}", bad.md5)));
        }

        Ok(metadata)
    }

    fn base_info(&self) -> &BaseInfo {
        // Non-empty after `parse`
        &self.data.base_info[0]
    }
}

/// A pack as built from provider metadata, before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct EmoticonRecord {
    pub emoticon_id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    /// Empty until archived.
    pub archive_url: String,
    pub archive_size: i64,
    pub animated: bool,
    pub images: Vec<EmoticonImage>,
    /// Verbatim provider response.
    pub metadata: Value,
}

impl EmoticonRecord {
    /// Build a record from validated metadata and the animation probe result.
    #[must_use]
    pub fn build(
        emoticon_id: i64,
        raw: Value,
        metadata: &EmoticonMetadata,
        animated: bool,
        cdn: &CdnUrls,
    ) -> Self {
        let src = if animated {
            ParcelFile::Gif300
        } else {
            ParcelFile::Png300
        };
        let images = metadata
            .data
            .md5_info
            .iter()
            .map(|info| EmoticonImage {
                keyword: info.name.clone(),
                src: cdn.item(&info.md5, src),
                preview: cdn.item(&info.md5, ParcelFile::Png300),
            })
            .collect();
        let base = metadata.base_info();

        Self {
            emoticon_id,
            name: base.name.clone(),
            description: base.desc.clone(),
            icon: cdn.pack_icon(emoticon_id),
            archive_url: String::new(),
            archive_size: 0,
            animated,
            images,
            metadata: raw,
        }
    }

    /// Convert into a row for the store.
    #[must_use]
    pub fn into_model(self) -> emoticon::Model {
        emoticon::Model {
            emoticon_id: self.emoticon_id,
            name: self.name,
            description: self.description,
            icon: self.icon,
            archive_url: self.archive_url,
            archive_size: self.archive_size,
            animated: self.animated,
            images: serde_json::to_value(self.images).unwrap_or_else(|_| Value::Array(Vec::new())),
            metadata: self.metadata,
        }
    }
}

/// Source of pack records.
#[async_trait]
pub trait PackFetcher: Send + Sync {
    /// Fetch and classify a pack.
    async fn fetch(&self, emoticon_id: i64) -> Result<EmoticonRecord, IngestError>;
}

/// HTTP client for the provider's metadata service and image CDN.
#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    metadata_base: String,
    cdn: CdnUrls,
}

impl ProviderClient {
    /// Create a client from configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, IngestError> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            metadata_base: config.metadata_base.trim_end_matches('/').to_string(),
            cdn: CdnUrls::new(&config.cdn_base),
        })
    }

    /// The underlying HTTP client.
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// CDN URL builder.
    #[must_use]
    pub const fn cdn(&self) -> &CdnUrls {
        &self.cdn
    }

    #[must_use]
    pub fn metadata_url(&self, emoticon_id: i64) -> String {
        format!(
            "{}/vipEmoji_item_{emoticon_id}/xydata.json",
            self.metadata_base
        )
    }

    /// Download raw metadata for a pack.
    pub async fn fetch_metadata(&self, emoticon_id: i64) -> Result<Value, IngestError> {
        let response = self.http.get(self.metadata_url(emoticon_id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IngestError::NotFound(emoticon_id));
        }
        let body = response.error_for_status()?.bytes().await?;

        serde_json::from_slice(&body)
            .map_err(|e| IngestError::parse(format!("metadata is not JSON: {e}")))
    }

    /// Download the `raw200.gif` variant of an image and check it for animation.
    pub async fn probe_animation(&self, md5: &str) -> Result<bool, IngestError> {
        let url = self.cdn.item(md5, ParcelFile::Gif200);
        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        is_animated_gif(&body)
    }
}

#[async_trait]
impl PackFetcher for ProviderClient {
    async fn fetch(&self, emoticon_id: i64) -> Result<EmoticonRecord, IngestError> {
        let raw = self.fetch_metadata(emoticon_id).await?;
        let metadata = EmoticonMetadata::parse(&raw)?;

        let probe = metadata
            .data
            .md5_info
            .choose(&mut rand::thread_rng())
            .map(|info| info.md5.clone())
            .ok_or_else(|| IngestError::parse("metadata has no images"))?;
        let animated = self.probe_animation(&probe).await?;

        debug!(emoticon_id, probe = %probe, animated, "Classified pack");

        let record = EmoticonRecord::build(emoticon_id, raw, &metadata, animated, &self.cdn);
        info!(
            emoticon_id,
            name = %record.name,
            images = record.images.len(),
            animated,
            "Fetched emoticon metadata"
        );
        Ok(record)
    }
}
