//! Runtime configuration loaded from TOML.
//!
//! The candidate list is data, not code: new generator layouts are supported by
//! adding a template here (or in the user's config file) without touching the resolver.

use crate::error::Result;
use anyhow::{Context, bail};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "STDDOC_MCP_CONFIG";

/// Placeholder substituted with the requested release in candidate templates.
pub const VERSION_PLACEHOLDER: &str = "{version}";

const APP_DIR: &str = "stddoc-mcp";

/// Known search-index locations, highest priority first.
const DEFAULT_CANDIDATES: &[&str] = &[
    "search-index.js",
    "search-index{version}.js",
    "search-index-{version}.js",
    "search-index-std.js",
    "search-index-std-{version}.js",
    "search-index-{version}-std.js",
    "std/search-index.js",
    "std/search-index{version}.js",
    "std/search-index-{version}.js",
    "search-index/std.js",
    "search-index/std-{version}.js",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Documentation root; candidate templates and item URLs are relative to it.
    pub doc_root: String,
    /// Release the index is requested for.
    pub version: String,
    /// Relative index locations in probe order.
    pub candidates: Vec<String>,
    pub probe_timeout_ms: u64,
    pub fetch_timeout_secs: u64,
    pub max_payload_bytes: u64,
    /// Number of decoded indices kept in memory.
    pub cache_capacity: usize,
    /// Where favorites and recent items are persisted.
    pub storage_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            doc_root: "https://doc.rust-lang.org/".to_string(),
            version: "1.92.0".to_string(),
            candidates: DEFAULT_CANDIDATES.iter().map(|c| (*c).to_string()).collect(),
            probe_timeout_ms: 3_000,
            fetch_timeout_secs: 30,
            max_payload_bytes: 32 * 1024 * 1024,
            cache_capacity: 8,
            storage_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from `$STDDOC_MCP_CONFIG`, then the user config dir,
    /// falling back to defaults when neither exists.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
            && path.exists()
        {
            return Self::from_file(&path);
        }

        tracing::debug!("No config file found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).context("Failed to parse config")?;
        if !config.doc_root.ends_with('/') {
            config.doc_root.push('/');
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let root = Url::parse(&self.doc_root)
            .with_context(|| format!("doc_root '{}' is not a valid URL", self.doc_root))?;
        if !matches!(root.scheme(), "http" | "https") {
            bail!("doc_root '{}' must be an http(s) URL", self.doc_root);
        }

        if self.candidates.is_empty() {
            bail!("At least one index candidate is required");
        }
        for candidate in &self.candidates {
            if candidate.trim().is_empty() {
                bail!("Index candidates must not be empty");
            }
            if candidate.starts_with('/') || candidate.contains("://") {
                bail!("Index candidate '{}' must be a relative path", candidate);
            }
        }

        if self.probe_timeout_ms == 0 || self.fetch_timeout_secs == 0 {
            bail!("Timeouts must be non-zero");
        }
        if self.max_payload_bytes == 0 {
            bail!("max_payload_bytes must be non-zero");
        }
        if self.cache_capacity == 0 {
            bail!("cache_capacity must be non-zero");
        }
        Ok(())
    }

    /// Parsed documentation root. Only fails if the config was never validated.
    pub fn doc_root_url(&self) -> Result<Url> {
        Url::parse(&self.doc_root)
            .with_context(|| format!("doc_root '{}' is not a valid URL", self.doc_root))
    }

    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Storage directory, defaulting to the user data dir.
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR)))
    }
}
