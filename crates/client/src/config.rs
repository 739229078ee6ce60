// Tunables for a sync session.
//
// Global config: `~/.chatsync/config.toml`
// Environment overrides: `CHATSYNC_*` (see `apply_env_fn`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pagination::{DEFAULT_INITIAL_LIMIT, DEFAULT_PAGE_LIMIT};
use crate::scroll::{ScrollDelays, DEFAULT_NEAR_BOTTOM_THRESHOLD_PX, DEFAULT_NEAR_TOP_THRESHOLD_PX};

const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;
const DEFAULT_CLIENT_NAME: &str = "DefaultUser";

/// Root directory for chatsync state: `~/.chatsync/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".chatsync"))
}

/// Path to the global config file: `~/.chatsync/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Backward page size.
    pub page_limit: usize,
    /// Initial and full-refresh page size.
    pub initial_limit: usize,
    /// Page backward when the scroll offset is at or above this many pixels
    /// from the top.
    pub near_top_threshold_px: f64,
    /// Auto-follow while strictly closer than this to the bottom.
    pub near_bottom_threshold_px: f64,
    /// Interval between `check_new_messages` nudges.
    pub heartbeat_interval_ms: u64,
    pub live_scroll_delay_ms: u64,
    pub history_scroll_delay_ms: u64,
    pub empty_history_scroll_delay_ms: u64,
    /// Sender name that marks a message as our own.
    pub client_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let delays = ScrollDelays::default();
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            initial_limit: DEFAULT_INITIAL_LIMIT,
            near_top_threshold_px: DEFAULT_NEAR_TOP_THRESHOLD_PX,
            near_bottom_threshold_px: DEFAULT_NEAR_BOTTOM_THRESHOLD_PX,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            live_scroll_delay_ms: delays.live.as_millis() as u64,
            history_scroll_delay_ms: delays.history.as_millis() as u64,
            empty_history_scroll_delay_ms: delays.empty_history.as_millis() as u64,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        }
    }
}

impl SyncConfig {
    /// Load `~/.chatsync/config.toml` with environment overrides applied.
    /// Falls back to defaults when the file is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match global_config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        base.apply_env_fn(|key| std::env::var(key))
    }

    /// Load from a specific path and validate.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from an environment lookup.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `CHATSYNC_PAGE_LIMIT` | `page_limit` |
    /// | `CHATSYNC_INITIAL_LIMIT` | `initial_limit` |
    /// | `CHATSYNC_HEARTBEAT_INTERVAL_MS` | `heartbeat_interval_ms` |
    /// | `CHATSYNC_CLIENT_NAME` | `client_name` |
    pub fn apply_env_fn<F>(mut self, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        if let Ok(value) = env("CHATSYNC_PAGE_LIMIT") {
            self.page_limit = parse_env("CHATSYNC_PAGE_LIMIT", &value)?;
        }
        if let Ok(value) = env("CHATSYNC_INITIAL_LIMIT") {
            self.initial_limit = parse_env("CHATSYNC_INITIAL_LIMIT", &value)?;
        }
        if let Ok(value) = env("CHATSYNC_HEARTBEAT_INTERVAL_MS") {
            self.heartbeat_interval_ms = parse_env("CHATSYNC_HEARTBEAT_INTERVAL_MS", &value)?;
        }
        if let Ok(value) = env("CHATSYNC_CLIENT_NAME") {
            self.client_name = value;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 {
            return Err(ConfigError::Invalid("page_limit must be at least 1".into()));
        }
        if self.initial_limit == 0 {
            return Err(ConfigError::Invalid("initial_limit must be at least 1".into()));
        }
        if !(self.near_top_threshold_px >= 0.0) || !(self.near_bottom_threshold_px >= 0.0) {
            return Err(ConfigError::Invalid("scroll thresholds must be non-negative".into()));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid("heartbeat_interval_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn scroll_delays(&self) -> ScrollDelays {
        ScrollDelays {
            live: Duration::from_millis(self.live_scroll_delay_ms),
            history: Duration::from_millis(self.history_scroll_delay_ms),
            empty_history: Duration::from_millis(self.empty_history_scroll_delay_ms),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key} has invalid value `{value}`")))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
