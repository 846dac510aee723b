//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Archive and static file storage.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upstream provider endpoints.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// External image optimizers.
    #[serde(default)]
    pub optimize: OptimizeConfig,
    /// Ingestion scheduling and limits.
    pub update: UpdateConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path prefix the application is mounted under, e.g. `/` or `/qsticker/`.
    #[serde(default = "default_base")]
    pub base: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base: default_base(),
        }
    }
}

impl ServerConfig {
    /// Base path normalized to start and end with `/`.
    #[must_use]
    pub fn base_path(&self) -> String {
        let trimmed = self.base.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `storage/` (archives) and `public/` (frontend build).
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the metadata service; `vipEmoji_item_{id}/xydata.json` is appended.
    #[serde(default = "default_metadata_base")]
    pub metadata_base: String,
    /// Base URL of the image CDN; `item/..` and `img/parcel/..` are appended.
    #[serde(default = "default_cdn_base")]
    pub cdn_base: String,
    /// User agent sent with every upstream request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Overall request timeout. Unset means requests may wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            metadata_base: default_metadata_base(),
            cdn_base: default_cdn_base(),
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

/// Optimizer configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizeConfig {
    /// Lossless PNG optimization.
    #[serde(default)]
    pub png: PngOptimizeConfig,
    /// GIF optimization.
    #[serde(default)]
    pub gif: GifOptimizeConfig,
}

/// PNG optimizer settings (`oxipng`).
#[derive(Debug, Clone, Deserialize)]
pub struct PngOptimizeConfig {
    /// Whether static images are optimized.
    #[serde(default)]
    pub enable: bool,
    /// Pass the tool's verbose flags through.
    #[serde(default)]
    pub verbose: bool,
    /// Executable to invoke.
    #[serde(default = "default_png_program")]
    pub program: String,
}

impl Default for PngOptimizeConfig {
    fn default() -> Self {
        Self {
            enable: false,
            verbose: false,
            program: default_png_program(),
        }
    }
}

/// GIF optimizer settings (`gifsicle`).
#[derive(Debug, Clone, Deserialize)]
pub struct GifOptimizeConfig {
    /// Whether animated images are optimized.
    #[serde(default)]
    pub enable: bool,
    /// Pass the tool's verbose flag through.
    #[serde(default)]
    pub verbose: bool,
    /// Lossy compression pass.
    #[serde(default)]
    pub lossy: GifLossy,
    /// Executable to invoke.
    #[serde(default = "default_gif_program")]
    pub program: String,
}

impl Default for GifOptimizeConfig {
    fn default() -> Self {
        Self {
            enable: false,
            verbose: false,
            lossy: GifLossy::default(),
            program: default_gif_program(),
        }
    }
}

/// Lossy GIF compression: a plain switch or an explicit level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GifLossy {
    /// `false` disables the pass, `true` uses the tool's default level.
    Enabled(bool),
    /// Explicit lossiness level.
    Level(u32),
}

impl Default for GifLossy {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl GifLossy {
    /// Command-line flag for this setting, if any.
    #[must_use]
    pub fn flag(&self) -> Option<String> {
        match self {
            Self::Enabled(false) => None,
            Self::Enabled(true) => Some("--lossy".to_string()),
            Self::Level(level) => Some(format!("--lossy={level}")),
        }
    }
}

/// Ingestion configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateConfig {
    /// Cron expression for the periodic update window, in local time.
    #[serde(default = "default_cron")]
    pub cron: String,
    /// Half-width of the window around the highest known emoticon ID.
    #[serde(default = "default_range")]
    pub range: i64,
    /// Secret used to derive archive file names.
    pub salt: String,
    /// Bearer token guarding the update endpoints. Unset or empty disables the check.
    #[serde(default)]
    pub token: Option<String>,
    /// Maximum emoticons processed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Maximum image downloads per archive at the same time.
    #[serde(default = "default_concurrency")]
    pub download_concurrency: usize,
}

impl UpdateConfig {
    /// The configured admin token, ignoring empty values.
    #[must_use]
    pub fn admin_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

fn default_base() -> String {
    "/".to_string()
}

fn default_database_url() -> String {
    "sqlite://database/database.db?mode=rwc".to_string()
}

const fn default_max_connections() -> u32 {
    8
}

const fn default_min_connections() -> u32 {
    1
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_metadata_base() -> String {
    "https://gxh.vip.qq.com/qqshow/admindata/comdata".to_string()
}

fn default_cdn_base() -> String {
    "https://i.gtimg.cn/club/item/parcel".to_string()
}

fn default_user_agent() -> String {
    format!("qsticker/{}", env!("CARGO_PKG_VERSION"))
}

fn default_png_program() -> String {
    "oxipng".to_string()
}

fn default_gif_program() -> String {
    "gifsicle".to_string()
}

fn default_cron() -> String {
    "0 0 * * *".to_string()
}

const fn default_range() -> i64 {
    20
}

const fn default_concurrency() -> usize {
    4
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.{toml,yaml,..}`
    /// 2. `config/{environment}.{toml,yaml,..}` (based on `QSTICKER_ENV`)
    /// 3. `config.{toml,yaml,..}` in the working directory
    /// 4. Environment variables with `QSTICKER__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("QSTICKER_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("QSTICKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("QSTICKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
