//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Input and output file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Incremental "new this week" settings
    #[serde(default)]
    pub weekly: WeeklyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.paths.sources_file.as_os_str().is_empty() {
            return Err(AppError::validation("paths.sources_file is empty"));
        }
        if self.paths.snapshot_file.as_os_str().is_empty() {
            return Err(AppError::validation("paths.snapshot_file is empty"));
        }
        if self.paths.state_file.as_os_str().is_empty() {
            return Err(AppError::validation("paths.state_file is empty"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pause after every request in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Consult robots.txt before fetching
    #[serde(default = "defaults::respect_robots")]
    pub respect_robots: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            respect_robots: defaults::respect_robots(),
        }
    }
}

/// File locations used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON list of crawl sources
    #[serde(default = "defaults::sources_file")]
    pub sources_file: PathBuf,

    /// Snapshot of the normalized campaigns of the last run
    #[serde(default = "defaults::snapshot_file")]
    pub snapshot_file: PathBuf,

    /// Persistent first/last-seen state
    #[serde(default = "defaults::state_file")]
    pub state_file: PathBuf,

    /// Directory for the weekly helper outputs
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sources_file: defaults::sources_file(),
            snapshot_file: defaults::snapshot_file(),
            state_file: defaults::state_file(),
            output_dir: defaults::output_dir(),
        }
    }
}

/// Settings for the weekly new/expired report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyConfig {
    /// How far back a first-seen date still counts as new
    #[serde(default = "defaults::window_days")]
    pub window_days: u32,
}

impl Default for WeeklyConfig {
    fn default() -> Self {
        Self {
            window_days: defaults::window_days(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/124.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn request_delay() -> u64 {
        800
    }
    pub fn respect_robots() -> bool {
        true
    }

    // Path defaults
    pub fn sources_file() -> PathBuf {
        PathBuf::from("configs/sources.json")
    }
    pub fn snapshot_file() -> PathBuf {
        PathBuf::from("output/campaigns.json")
    }
    pub fn state_file() -> PathBuf {
        PathBuf::from("output/state.json")
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("output")
    }

    // Weekly defaults
    pub fn window_days() -> u32 {
        7
    }
}
