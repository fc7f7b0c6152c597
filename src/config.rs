//! Configuration file parser for ~/.config/rss-aggregator/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos.
use crate::i18n::{Locale, UnknownLocale};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),

    #[error(transparent)]
    Locale(#[from] UnknownLocale),

    #[error("HOME environment variable not set")]
    NoHome,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between the end of one refresh cycle and the start of the next.
    pub refresh_interval_secs: u64,

    /// Per-request timeout for feed fetches, in seconds.
    pub request_timeout_secs: u64,

    /// Largest accepted feed document, in bytes.
    pub max_feed_bytes: usize,

    /// User-Agent header sent with every fetch.
    pub user_agent: String,

    /// Locale for user-facing messages ("en" or "ru").
    pub locale: String,

    /// Feed URLs subscribed to at startup.
    pub feeds: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5,
            request_timeout_secs: 30,
            max_feed_bytes: crate::feed::DEFAULT_MAX_FEED_SIZE,
            user_agent: concat!("rss-aggregator/", env!("CARGO_PKG_VERSION")).to_string(),
            locale: "en".to_string(),
            feeds: Vec::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "refresh_interval_secs",
        "request_timeout_secs",
        "max_feed_bytes",
        "user_agent",
        "locale",
        "feeds",
    ];

    /// Default location of the config file (`~/.config/rss-aggregator/config.toml`).
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var_os("HOME").ok_or(ConfigError::NoHome)?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("rss-aggregator")
            .join("config.toml"))
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            interval_secs = config.refresh_interval_secs,
            feeds = config.feeds.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.max_feed_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_feed_bytes must be greater than 0".to_string(),
            ));
        }
        self.locale()?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn locale(&self) -> Result<Locale, ConfigError> {
        Ok(self.locale.parse()?)
    }
}

// ============================================================================
// Tests
// ============================================================================
