//! Uploader configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/mediadrop/uploader.toml`
//! - Windows: `%APPDATA%/mediadrop/uploader.toml`
//!
//! `MEDIADROP_API_KEY` overrides the stored API key.

use std::path::{Path, PathBuf};

use mediadrop_intake::ImageThumbnailer;
use mediadrop_protocol::{
    DEFAULT_API_BASE, DEFAULT_PIPELINE, PROCESS_PATH, STAGING_PATH, STATUS_PATH, endpoint,
};
use mediadrop_transfer::DEFAULT_CHUNK_SIZE;
use mediadrop_upload::{ApiConfig, OrchestratorConfig};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `api_key`.
pub const API_KEY_ENV: &str = "MEDIADROP_API_KEY";

/// Uploader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Value of the `Authorization` header for API calls.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_staging_url")]
    pub staging_url: String,

    #[serde(default = "default_process_url")]
    pub process_url: String,

    #[serde(default = "default_status_url")]
    pub status_url: String,

    /// Processing pipeline requested on finalize.
    #[serde(default = "default_pipeline")]
    pub pipeline: String,

    /// Part size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Thumbnails are `1/divisor` of the original dimensions.
    #[serde(default = "default_thumbnail_divisor")]
    pub thumbnail_divisor: u32,

    /// JPEG quality of thumbnails (1-100).
    #[serde(default = "default_thumbnail_quality")]
    pub thumbnail_quality: u8,
}

fn default_staging_url() -> String {
    endpoint(DEFAULT_API_BASE, STAGING_PATH)
}

fn default_process_url() -> String {
    endpoint(DEFAULT_API_BASE, PROCESS_PATH)
}

fn default_status_url() -> String {
    endpoint(DEFAULT_API_BASE, STATUS_PATH)
}

fn default_pipeline() -> String {
    DEFAULT_PIPELINE.into()
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_thumbnail_divisor() -> u32 {
    2
}

fn default_thumbnail_quality() -> u8 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            staging_url: default_staging_url(),
            process_url: default_process_url(),
            status_url: default_status_url(),
            pipeline: default_pipeline(),
            chunk_size: default_chunk_size(),
            thumbnail_divisor: default_thumbnail_divisor(),
            thumbnail_quality: default_thumbnail_quality(),
        }
    }
}

impl Config {
    /// Loads configuration from `path` (or the platform default), creating
    /// a default file if none exists, then applies the environment override.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };
        let config = Self::load_from(&path)?;
        Ok(config.with_api_key_override(std::env::var(API_KEY_ENV).ok()))
    }

    /// Reads `path`, writing a default config there if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // The file holds the API key.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Replaces the API key when `key` is set and non-empty.
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.api_key = key;
        }
        self
    }

    /// Rejects settings the upload pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be greater than zero");
        anyhow::ensure!(
            self.thumbnail_divisor > 0,
            "thumbnail_divisor must be greater than zero"
        );
        anyhow::ensure!(
            (1..=100).contains(&self.thumbnail_quality),
            "thumbnail_quality must be between 1 and 100"
        );
        Ok(())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            api_key: self.api_key.clone(),
            staging_url: self.staging_url.clone(),
            process_url: self.process_url.clone(),
            status_url: self.status_url.clone(),
            pipeline: self.pipeline.clone(),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            chunk_size: self.chunk_size,
        }
    }

    pub fn thumbnailer(&self) -> ImageThumbnailer {
        ImageThumbnailer {
            divisor: self.thumbnail_divisor,
            quality: self.thumbnail_quality,
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("mediadrop")
            .join("uploader.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("mediadrop").join("uploader.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/mediadrop/uploader.toml"))
    }
}
