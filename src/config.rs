use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Crawl configuration, loaded from `config.toml` when present. Passed
/// explicitly into the pipeline at construction; there is no global state.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub events_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Worker pool size for the team-list fan-out.
    pub team_concurrency: usize,
    /// Per-request timeout. A slow team page resolves as a skip, it must
    /// not stall the pool.
    pub timeout_seconds: u64,
    /// Politeness delay before each request.
    pub delay_ms: u64,
    /// Total attempts per URL (1 = no retry).
    pub retry_attempts: u32,
    /// Base backoff, doubled after each failed attempt.
    pub retry_backoff_ms: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rk9.gg".to_string(),
            events_path: "/events/pokemon".to_string(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            team_concurrency: 16,
            timeout_seconds: 30,
            delay_ms: 100,
            retry_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            crawl: CrawlConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}

impl SiteConfig {
    pub fn events_url(&self) -> String {
        format!("{}{}", self.base_url, self.events_path)
    }

    pub fn roster_url(&self, external_ref: &str) -> String {
        format!("{}/roster/{}", self.base_url, external_ref)
    }

    pub fn team_list_url(&self, team_list_ref: &str) -> String {
        format!("{}/teamlist/public/{}", self.base_url, team_list_ref)
    }

    /// Qualifies a site-relative asset path into an absolute URL.
    pub fn absolute_url(&self, src: &str) -> String {
        if src.starts_with("http://") || src.starts_with("https://") {
            src.to_string()
        } else {
            format!("{}{}", self.base_url, src)
        }
    }
}
