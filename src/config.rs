//! Configuration system for xport.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `~/.config/xport/config.toml`
//! 3. **Environment variables** - `XPORT_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [paths]
//! db = "~/.local/share/xport/xport.db"
//! media_dir = "~/.local/share/xport/media"
//!
//! [import]
//! batch_size = 10
//! on_duplicate = "new"
//! processor = "block"
//! delay_secs = 0
//!
//! [output]
//! format = "text"
//! colors = true
//! ```

use crate::processor::OnDuplicate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Main configuration structure for xport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path-related configuration.
    pub paths: PathsConfig,
    /// Import behavior configuration.
    pub import: ImportSettings,
    /// Output formatting configuration.
    pub output: OutputConfig,
}

/// Path configuration for database and media locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Path to the `SQLite` database file.
    /// Environment variable: `XPORT_DB`
    pub db: Option<PathBuf>,

    /// Directory sideloaded media is written to.
    /// Environment variable: `XPORT_MEDIA_DIR`
    pub media_dir: Option<PathBuf>,

    /// Default archive path (for repeated imports).
    pub archive: Option<PathBuf>,
}

/// Import behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Tweets attempted per batch.
    /// Environment variable: `XPORT_BATCH_SIZE`
    pub batch_size: usize,

    /// Duplicate policy: `new`, `update` or `skip`. Anything else is read
    /// as `new`.
    /// Environment variable: `XPORT_ON_DUPLICATE`
    pub on_duplicate: String,

    /// Processor selector.
    /// Environment variable: `XPORT_PROCESSOR`
    pub processor: String,

    /// Seconds to wait between batches when driving repeated runs.
    pub delay_secs: u64,

    /// Mirror base URL for photo fetches.
    /// Environment variable: `XPORT_MEDIA_BASE_URL`
    pub media_base_url: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format: text, json, json-pretty.
    pub format: String,

    /// Enable colored output.
    pub colors: bool,

    /// Suppress non-essential output (progress bars, etc.).
    pub quiet: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: crate::action::DEFAULT_BATCH_SIZE,
            on_duplicate: OnDuplicate::New.as_str().to_string(),
            processor: crate::block::BlockProcessor::SELECTOR.to_string(),
            delay_secs: 0,
            media_base_url: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            colors: true,
            quiet: false,
        }
    }
}

impl ImportSettings {
    /// The configured duplicate policy, leniently parsed.
    #[must_use]
    pub fn policy(&self) -> OnDuplicate {
        OnDuplicate::parse_lenient(&self.on_duplicate)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. User config file (~/.config/xport/config.toml)
    /// 3. Compiled defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load from user config file
        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        // Override from environment variables
        config.apply_env_overrides();

        debug!("Configuration loaded: {:?}", config);
        config
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &PathBuf) -> Option<Self> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded config from: {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load the user configuration file from the standard location.
    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("xport").join("config.toml"))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // Path overrides
        if let Ok(db) = std::env::var("XPORT_DB") {
            self.paths.db = Some(PathBuf::from(db));
        }
        if let Ok(media_dir) = std::env::var("XPORT_MEDIA_DIR") {
            self.paths.media_dir = Some(PathBuf::from(media_dir));
        }
        if let Ok(archive) = std::env::var("XPORT_ARCHIVE") {
            self.paths.archive = Some(PathBuf::from(archive));
        }

        // Import overrides
        if let Ok(batch) = std::env::var("XPORT_BATCH_SIZE") {
            if let Ok(n) = batch.parse() {
                self.import.batch_size = n;
            }
        }
        if let Ok(policy) = std::env::var("XPORT_ON_DUPLICATE") {
            self.import.on_duplicate = policy;
        }
        if let Ok(processor) = std::env::var("XPORT_PROCESSOR") {
            self.import.processor = processor;
        }
        if let Ok(base) = std::env::var("XPORT_MEDIA_BASE_URL") {
            self.import.media_base_url = Some(base);
        }

        // Output overrides
        if let Ok(format) = std::env::var("XPORT_FORMAT") {
            self.output.format = format;
        }
        if std::env::var("XPORT_NO_COLOR").is_ok() || std::env::var("NO_COLOR").is_ok() {
            self.output.colors = false;
        }
        if std::env::var("XPORT_QUIET").is_ok() {
            self.output.quiet = true;
        }
    }

    /// Merge another config into this one (other takes precedence).
    fn merge(&mut self, other: Self) {
        // Paths
        if other.paths.db.is_some() {
            self.paths.db = other.paths.db;
        }
        if other.paths.media_dir.is_some() {
            self.paths.media_dir = other.paths.media_dir;
        }
        if other.paths.archive.is_some() {
            self.paths.archive = other.paths.archive;
        }

        // Import (always override if present in other)
        self.import.batch_size = other.import.batch_size;
        self.import.on_duplicate = other.import.on_duplicate;
        self.import.processor = other.import.processor;
        self.import.delay_secs = other.import.delay_secs;
        if other.import.media_base_url.is_some() {
            self.import.media_base_url = other.import.media_base_url;
        }

        // Output
        self.output.format = other.output.format;
        self.output.colors = other.output.colors;
        self.output.quiet = other.output.quiet;
    }

    /// Get the database path, using defaults if not configured.
    pub fn db_path(&self) -> PathBuf {
        self.paths.db.clone().unwrap_or_else(crate::default_db_path)
    }

    /// Get the media directory, using defaults if not configured.
    pub fn media_dir(&self) -> PathBuf {
        self.paths
            .media_dir
            .clone()
            .unwrap_or_else(crate::default_media_dir)
    }

    /// Save the current configuration to the user config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the parent directory cannot be created, or the file cannot be written.
    pub fn save(&self) -> std::io::Result<()> {
        let config_path = Self::user_config_path().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            )
        })?;

        // Create parent directory if needed
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(&config_path, content)?;
        info!("Saved config to: {}", config_path.display());
        Ok(())
    }

    /// Generate a default configuration file content.
    #[must_use]
    pub fn default_config_content() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.import.batch_size, 10);
        assert_eq!(config.import.on_duplicate, "new");
        assert_eq!(config.import.processor, "block");
        assert!(config.output.colors);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.import.batch_size, parsed.import.batch_size);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.import.batch_size = 50;
        other.paths.db = Some(PathBuf::from("/custom/path"));

        base.merge(other);

        assert_eq!(base.import.batch_size, 50);
        assert_eq!(base.paths.db, Some(PathBuf::from("/custom/path")));
    }

    #[test]
    fn test_policy_parses_leniently() {
        let mut config = Config::default();
        config.import.on_duplicate = "bogus".to_string();
        assert_eq!(config.import.policy(), OnDuplicate::New);

        config.import.on_duplicate = "SKIP".to_string();
        assert_eq!(config.import.policy(), OnDuplicate::Skip);
    }

    #[test]
    fn test_default_config_content() {
        let content = Config::default_config_content();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[import]"));
        assert!(content.contains("[output]"));
    }
}
