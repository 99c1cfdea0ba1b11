use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::auth::Token;

const CONFIG_NAME: &str = "gitlab-ci-bar";
const EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Configuration file structure for gitlab-ci-bar.
///
/// Read once at startup and never mutated afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Commit author email that marks a pipeline as "mine"
    #[serde(default)]
    pub self_identity: Option<String>,

    /// GitLab instances to poll
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,

    /// Request and window parameters
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstanceConfig {
    /// GitLab instance base URL
    pub url: String,

    /// Personal access token with `read_api` scope
    pub private_token: Token,

    /// Display name to project ID (or `group/project` path), in display order
    #[serde(default)]
    pub projects: IndexMap<String, ProjectRef>,
}

/// Backend identifier of a project: numeric ID or full path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectRef {
    Id(u64),
    Path(String),
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectRef::Id(id) => write!(f, "{id}"),
            ProjectRef::Path(path) => f.write_str(path),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Only pipelines updated within this many days are shown
    #[serde(default = "default_window_days")]
    pub window_days: i64,

    /// Page size for both pipeline and job listings
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    /// Timeout applied to every HTTP request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for connection errors, 429 and 5xx responses
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Number of projects fetched at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// BitBar/xbar plugin text
    #[default]
    Bar,
    Json,
    Table,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_window_days() -> i64 {
    7
}

fn default_per_page() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    4
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./gitlab-ci-bar.{toml,json,yaml,yml}
    /// 3. <user config dir>/gitlab-ci-bar/config.{toml,json,yaml,yml}
    ///
    /// Returns default configuration (no instances) if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            let config = Self::load_from_path(path)?;
            config.validate()?;
            return Ok(config);
        }

        for candidate in Self::candidates() {
            if candidate.exists() {
                let config = Self::load_from_path(&candidate)?;
                config.validate()?;
                return Ok(config);
            }
        }

        log::warn!("No configuration file found, no instances will be polled");
        Ok(Self::default())
    }

    fn candidates() -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!("{CONFIG_NAME}.{ext}")))
            .collect();

        if let Some(dir) = dirs::config_dir() {
            let dir = dir.join(CONFIG_NAME);
            candidates.extend(EXTENSIONS.iter().map(|ext| dir.join(format!("config.{ext}"))));
        }

        candidates
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        log::debug!("Loading configuration from {}", path.display());

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Checks values that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        for instance in &self.instances {
            Url::parse(&instance.url)
                .with_context(|| format!("Invalid instance URL: {}", instance.url))?;
            if instance.private_token.is_empty() {
                bail!("Instance {} has an empty private-token", instance.url);
            }
        }

        let fetch = &self.fetch;
        if !(1..=100).contains(&fetch.per_page) {
            bail!("fetch.per-page must be between 1 and 100, got {}", fetch.per_page);
        }
        if fetch.concurrency == 0 {
            bail!("fetch.concurrency must be at least 1");
        }
        if fetch.timeout_secs == 0 {
            bail!("fetch.timeout-secs must be at least 1");
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&fetch.window_days) {
            bail!(
                "fetch.window-days must be between 0 and {MAX_WINDOW_DAYS}, got {}",
                fetch.window_days
            );
        }

        Ok(())
    }
}
