//! Configuration management for the sticker merge bot.
//!
//! The bot reads a single configuration file at `~/.sticker-merge/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `BOT_TOKEN` / `STICKER_BOT_TOKEN` → telegram.bot_token
//! - `STICKER_API_BASE` → telegram.api_base
//! - `STICKER_LOG_LEVEL` → observability.log_level
//! - `STICKER_LOG_FORMAT` → observability.log_format

use crate::error::{Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Hard cap on items per destination collection.
pub const MAX_PER_DESTINATION: usize = 120;

/// Default number of items shown per summary page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".sticker-merge"),
        |dirs| dirs.home_dir().join(".sticker-merge"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Telegram
// ============================================================================

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Usernames or numeric user ids allowed to talk to the bot ("*" for anyone)
    #[serde(default = "default_allowed_users")]
    pub allowed_users: Vec<String>,

    /// Bot API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Long-poll timeout passed to getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Seconds without updates before a user's session worker is stopped
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_users: default_allowed_users(),
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout(),
            session_idle_secs: default_session_idle(),
        }
    }
}

fn default_allowed_users() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_session_idle() -> u64 {
    1800
}

// ============================================================================
// Merge
// ============================================================================

/// Merge behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Maximum items per destination collection
    #[serde(default = "default_max_per_destination")]
    pub max_per_destination: usize,

    /// Items per page in the source summary
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Host used when rendering destination links
    #[serde(default = "default_link_host")]
    pub link_host: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_per_destination: default_max_per_destination(),
            page_size: default_page_size(),
            link_host: default_link_host(),
        }
    }
}

fn default_max_per_destination() -> usize {
    MAX_PER_DESTINATION
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_link_host() -> String {
    "t.me".to_string()
}

// ============================================================================
// Observability
// ============================================================================

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        match Self::load_from(&config_path()) {
            Err(e) if e.is_not_found() => {
                tracing::info!("Config file not found, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str::<Self>(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("STICKER_BOT_TOKEN").or_else(|| lookup("BOT_TOKEN")) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(base) = lookup("STICKER_API_BASE") {
            self.telegram.api_base = base;
        }
        if let Some(level) = lookup("STICKER_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("STICKER_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Bot token, if configured and non-empty.
    pub fn bot_token(&self) -> Option<&str> {
        self.telegram
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}
