use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::AppError;

pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const YOUTUBE_KEY_ENV: &str = "TUBESYNC_YOUTUBE_API_KEY";

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tubesync")
}

pub fn get_config_file_path() -> PathBuf {
    get_config_dir().join("config.json")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remaining seconds below which the tracker advances to the next entry.
    pub near_end_threshold_secs: f64,
    /// How long automatic scans and advances stay suppressed after a navigation.
    pub manual_override_ms: u64,
    /// Delay before the single retry of a deferred scan.
    pub defer_retry_ms: u64,
    /// Settle delay between a trigger and the scan it causes.
    pub scan_delay_ms: u64,
    pub sample_interval_ms: u64,
    pub advance_cooldown_ms: u64,
    pub request_timeout_secs: u64,
    pub page_call_timeout_ms: u64,
    pub search_limit: u8,
    pub spotify_api_base: String,
    pub youtube_api_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_api_key: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            near_end_threshold_secs: 1.2,
            manual_override_ms: 5000,
            defer_retry_ms: 1000,
            scan_delay_ms: 500,
            sample_interval_ms: 1000,
            advance_cooldown_ms: 5000,
            request_timeout_secs: 10,
            page_call_timeout_ms: 3000,
            search_limit: 5,
            spotify_api_base: SPOTIFY_API_BASE.to_string(),
            youtube_api_base: YOUTUBE_API_BASE.to_string(),
            youtube_api_key: None,
        }
    }
}

impl SyncConfig {
    /// Load from the default config file, falling back to defaults when it
    /// does not exist. The API key env var wins over the file.
    pub fn load() -> Result<Self, AppError> {
        let mut config = Self::load_from(&get_config_file_path())?;
        if let Ok(key) = std::env::var(YOUTUBE_KEY_ENV) {
            if !key.trim().is_empty() {
                config.youtube_api_key = Some(key.trim().to_string());
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config: SyncConfig = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn manual_override_window(&self) -> Duration {
        Duration::from_millis(self.manual_override_ms)
    }

    pub fn defer_retry_delay(&self) -> Duration {
        Duration::from_millis(self.defer_retry_ms)
    }

    pub fn scan_delay(&self) -> Duration {
        Duration::from_millis(self.scan_delay_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    pub fn advance_cooldown(&self) -> Duration {
        Duration::from_millis(self.advance_cooldown_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn page_call_timeout(&self) -> Duration {
        Duration::from_millis(self.page_call_timeout_ms)
    }
}
