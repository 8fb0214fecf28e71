//! Configuration loading for blogsearch.

use std::path::PathBuf;

use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "BLOGSEARCH_CONFIG";

/// Top-level configuration loaded from config.toml.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Where posts are read from.
#[derive(Debug, Deserialize)]
pub struct ContentConfig {
    /// Directory of posts, or a `.json` export of post records.
    #[serde(default = "default_content_dir")]
    pub dir: String,
    #[serde(default)]
    pub include_drafts: bool,
}

/// Where the search snapshot is written and read.
#[derive(Debug, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_snapshot")]
    pub snapshot: String,
}

fn default_content_dir() -> String {
    "./content/blog".to_string()
}

fn default_snapshot() -> String {
    "./public/search-index.json".to_string()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: default_content_dir(),
            include_drafts: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            snapshot: default_snapshot(),
        }
    }
}

impl Config {
    /// Load config from `$BLOGSEARCH_CONFIG`, then
    /// ~/.config/blogsearch/config.toml, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::from_file(&path);
        }

        Ok(Config::default())
    }

    /// Parse a specific config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        ProjectDirs::from("", "", "blogsearch").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Resolved content location.
    #[must_use]
    pub fn content_dir(&self) -> PathBuf {
        expand_tilde(&self.content.dir)
    }

    /// Resolved snapshot location.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        expand_tilde(&self.search.snapshot)
    }
}

/// Expand ~ to the user's home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(base_dirs) = BaseDirs::new()
    {
        return base_dirs.home_dir().join(rest);
    }
    PathBuf::from(path)
}
