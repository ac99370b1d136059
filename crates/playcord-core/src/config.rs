use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use playcord_detect::PlayerEndpoint;

use crate::error::CoreError;
use crate::vlcrc::VlcSettings;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Bounds for the steady-state polling interval, in seconds.
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 1;
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 15;

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub player: PlayerConfig,
    pub discord: DiscordConfig,
    pub reconnect: ReconnectConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub host: String,
    pub http_port: u16,
    pub http_password: String,
    pub http_enabled: bool,
    pub read_vlcrc: bool,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub enabled: bool,
    pub client_id: String,
    pub large_image: String,
    pub playing_image: String,
    pub paused_image: String,
    pub large_text: String,
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    pub strategy: BackoffStrategy,
    pub delay_secs: u64,
    pub max_delay_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub update_interval_secs: u64,
    pub fast_check_count: u32,
    pub fast_check_interval_ms: u64,
}

impl PlayerConfig {
    pub fn endpoint(&self) -> PlayerEndpoint {
        PlayerEndpoint {
            host: self.host.clone(),
            port: self.http_port,
            password: self.http_password.clone(),
            enabled: self.http_enabled,
            timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

impl DiscordConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl SyncConfig {
    /// Steady-state tick interval, clamped to 1..=15 seconds.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(
            self.update_interval_secs
                .clamp(MIN_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS),
        )
    }

    pub fn fast_check_interval(&self) -> Duration {
        Duration::from_millis(self.fast_check_interval_ms)
    }
}

impl AppConfig {
    /// Load config: user file (if exists) merged over built-in defaults.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let user_str = std::fs::read_to_string(path)?;
        Self::from_toml(&user_str)
    }

    /// Parse a (possibly partial) TOML document over the defaults.
    pub fn from_toml(user_str: &str) -> Result<Self, CoreError> {
        let mut merged: toml::Value =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| CoreError::Config(e.to_string()))?;
        let user: toml::Value =
            toml::from_str(user_str).map_err(|e| CoreError::Config(e.to_string()))?;
        merge(&mut merged, user);
        merged
            .try_into()
            .map_err(|e: toml::de::Error| CoreError::Config(e.to_string()))
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override player settings with whatever VLC's own config carries.
    pub fn apply_vlcrc(&mut self, settings: &VlcSettings) {
        if let Some(port) = settings.http_port {
            self.player.http_port = port;
        }
        if let Some(password) = &settings.http_password {
            self.player.http_password = password.clone();
        }
        if let Some(enabled) = settings.http_enabled {
            self.player.http_enabled = enabled;
        }
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory for rolling log files.
    pub fn log_dir() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "playcord")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

/// Recursively overlay `user` tables onto `base`.
fn merge(base: &mut toml::Value, user: toml::Value) {
    match (base, user) {
        (toml::Value::Table(base), toml::Value::Table(user)) => {
            for (key, value) in user {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, user) => *base = user,
    }
}
