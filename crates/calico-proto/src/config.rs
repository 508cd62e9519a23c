use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub ratings: RatingsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// HLS manifest of the live stream.
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,
    /// MIME type a native sink must understand to take the manifest directly.
    #[serde(default = "default_native_mime")]
    pub native_mime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_metadata_url")]
    pub url: String,
    #[serde(default = "default_cover_url")]
    pub cover_url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Appended to the album name on the now-playing album line.
    #[serde(default = "default_album_suffix")]
    pub album_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingsConfig {
    /// Base of the ratings REST API, without trailing slash.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Delay before the rating message line is cleared.
    #[serde(default = "default_message_clear_ms")]
    pub message_clear_ms: u64,
}

/// Options handed to the adaptive-streaming engine on attach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_true")]
    pub enable_worker: bool,
    #[serde(default = "default_true")]
    pub low_latency: bool,
    #[serde(default = "default_back_buffer_secs")]
    pub back_buffer_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Prefer binaries on PATH over ones bundled beside the executable.
    #[serde(default)]
    pub use_system_deps: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            manifest_url: default_manifest_url(),
            native_mime: default_native_mime(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            url: default_metadata_url(),
            cover_url: default_cover_url(),
            poll_interval_secs: default_poll_interval_secs(),
            album_suffix: default_album_suffix(),
        }
    }
}

impl MetadataConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            message_clear_ms: default_message_clear_ms(),
        }
    }
}

impl RatingsConfig {
    pub fn message_clear(&self) -> Duration {
        Duration::from_millis(self.message_clear_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            enable_worker: true,
            low_latency: true,
            back_buffer_secs: default_back_buffer_secs(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            use_system_deps: false,
        }
    }
}

const CDN_BASE: &str = "https://d3d4yli4hf5bmh.cloudfront.net";

fn default_manifest_url() -> String {
    format!("{}/hls/live.m3u8", CDN_BASE)
}

fn default_native_mime() -> String {
    "application/vnd.apple.mpegurl".to_string()
}

fn default_metadata_url() -> String {
    format!("{}/metadatav2.json", CDN_BASE)
}

fn default_cover_url() -> String {
    format!("{}/cover.jpg", CDN_BASE)
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_album_suffix() -> String {
    "(Original Motion Picture Soundtrack)".to_string()
}

fn default_api_base() -> String {
    "http://localhost:5001/api".to_string()
}

fn default_message_clear_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_back_buffer_secs() -> u64 {
    90
}

fn default_volume() -> f32 {
    0.5
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing {}", config_path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.ratings.api_base = config.ratings.api_base.trim_end_matches('/').to_string();
        config.player.volume = config.player.volume.clamp(0.0, 1.0);
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
}
