//! Gallery configuration.
//!
//! Handles loading and validating the optional `imageme.toml` file in the
//! gallery root. Every key has a default, so the file is sparse: override just
//! the values you want.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! index_filename = "imageme.html"  # Generated page name in every directory
//! images_per_row = 3               # Gallery columns
//!
//! [thumbnails]
//! enabled = true                   # false disables the enhanced pass
//! width = 800                      # Thumbnail width in pixels
//! grace_period_ms = 500            # Wait for the enhanced pass before cleanup
//!
//! [server]
//! bind = "0.0.0.0"
//! port = 8000                      # The positional CLI argument wins
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::classify;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the optional config file in the gallery root.
pub const CONFIG_FILENAME: &str = "imageme.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `imageme.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// File name of the page generated in every directory.
    pub index_filename: String,
    /// Number of gallery cells per table row.
    pub images_per_row: usize,
    /// Thumbnail (enhanced pass) settings.
    pub thumbnails: ThumbnailConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            index_filename: "imageme.html".to_string(),
            images_per_row: 3,
            thumbnails: ThumbnailConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.index_filename.as_str();
        if name.is_empty() || name == "." || name == ".." {
            return Err(ConfigError::Validation(
                "index_filename must be a file name".into(),
            ));
        }
        if name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "index_filename must not contain path separators".into(),
            ));
        }
        if classify::is_image_filename(name) {
            return Err(ConfigError::Validation(
                "index_filename must not look like an image".into(),
            ));
        }
        if self.images_per_row == 0 {
            return Err(ConfigError::Validation(
                "images_per_row must be at least 1".into(),
            ));
        }
        if self.thumbnails.width == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.width must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailConfig {
    /// When false the codec is never probed and only the fast pass runs.
    pub enabled: bool,
    /// Target thumbnail width in pixels; height follows the aspect ratio.
    pub width: u32,
    /// How long shutdown waits for a running enhanced pass before cleanup.
    pub grace_period_ms: u64,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 800,
            grace_period_ms: 500,
        }
    }
}

impl ThumbnailConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Load `imageme.toml` from the gallery root, falling back to defaults when
/// the file does not exist.
pub fn load_config(root: &Path) -> Result<GalleryConfig, ConfigError> {
    let path = root.join(CONFIG_FILENAME);
    if !path.exists() {
        return Ok(GalleryConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<GalleryConfig, ConfigError> {
    let config: GalleryConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}
