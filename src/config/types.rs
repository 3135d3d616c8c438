use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Main configuration structure for Dokkan-Archive
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawl session behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Ceiling on inserted or updated cards per session
    pub max_new_items: u32,

    /// Highest list page that will be visited
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Number of detail pages fetched in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Minimum time between any two requests (milliseconds)
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Continue from the persisted frontier when one exists
    #[serde(default = "default_true")]
    pub resume: bool,

    /// Re-fetch cards that are already in the index
    #[serde(default)]
    pub forced_refresh: bool,

    /// Hard timeout for one request attempt (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per item before a transient failure becomes permanent
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// First session-level pause after the source blocks us (milliseconds, doubles)
    #[serde(default = "default_block_pause_ms")]
    pub block_pause_ms: u64,

    /// Consecutive blocks tolerated before the session stops
    #[serde(default = "default_max_block_pauses")]
    pub max_block_pauses: u32,
}

impl CrawlerConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn block_pause(&self) -> Duration {
        Duration::from_millis(self.block_pause_ms)
    }
}

fn default_max_pages() -> u32 {
    500
}

fn default_concurrency() -> u32 {
    4
}

fn default_rate_limit_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_block_pause_ms() -> u64 {
    60_000
}

fn default_max_block_pauses() -> u32 {
    3
}

/// How pages are retrieved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Plain HTTP GET of the page
    #[default]
    Static,
    /// Page rendered by an external rendering service
    Rendered,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Rendered => write!(f, "rendered"),
        }
    }
}

/// The catalog being harvested
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceConfig {
    /// Site root, e.g. `https://dokkaninfo.com`
    pub base_url: String,

    /// Path and query of the card listing
    #[serde(default = "default_list_path")]
    pub list_path: String,

    #[serde(default)]
    pub strategy: FetchStrategy,

    /// Rendering service endpoint, required for the rendered strategy
    #[serde(default)]
    pub render_endpoint: Option<String>,
}

fn default_list_path() -> String {
    "/cards?sort=open_at".to_string()
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    pub crawler_name: String,
    pub crawler_version: String,
    pub contact_url: String,
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite dataset
    pub database_path: String,

    /// Path of the JSON export written by `--export`
    #[serde(default = "default_export_path")]
    pub export_path: String,

    /// Directory that downloaded card art is written to
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    #[serde(default)]
    pub download_assets: bool,
}

fn default_export_path() -> String {
    "./cards.json".to_string()
}

fn default_assets_dir() -> String {
    "./assets".to_string()
}
