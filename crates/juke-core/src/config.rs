use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub acquire: AcquireConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// YouTube Data API v3 key. `YOUTUBE_API_KEY` in the environment wins.
    #[serde(default)]
    pub key: String,
    /// Items per listing page; the API caps this at 50.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root folder holding one subfolder per acquired playlist.
    #[serde(default = "platform::default_playlists_dir")]
    pub playlists_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    /// Fade ramp length in seconds, clamped to [0, 10] by the player.
    #[serde(default = "default_fade_secs")]
    pub fade_secs: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquireConfig {
    /// Concurrent download workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Retries per listing page before the pipeline gives up on pagination.
    #[serde(default = "default_page_retries")]
    pub page_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            page_size: default_page_size(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            playlists_dir: platform::default_playlists_dir(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            fade_secs: default_fade_secs(),
        }
    }
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            page_retries: default_page_retries(),
        }
    }
}

fn default_page_size() -> u32 {
    50
}

fn default_volume() -> f32 {
    0.5
}

fn default_fade_secs() -> f32 {
    2.0
}

fn default_concurrency() -> usize {
    4
}

fn default_page_retries() -> u32 {
    2
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// The listing API key, preferring the environment over the config file.
    pub fn api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var("YOUTUBE_API_KEY") {
            if !key.is_empty() {
                return Some(key);
            }
        }
        if self.api.key.is_empty() {
            None
        } else {
            Some(self.api.key.clone())
        }
    }
}
