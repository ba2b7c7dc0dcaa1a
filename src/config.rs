//! Client configuration.
//!
//! Resolution order, later wins: built-in defaults, TOML file,
//! `RPS_SERVICE_URL` environment variable, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::capture::DEFAULT_JPEG_QUALITY;

/// Environment variable overriding the service address.
pub const SERVICE_URL_ENV: &str = "RPS_SERVICE_URL";

/// Configuration for the game client.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the gesture recognition service.
    #[serde(default = "default_service_url")]
    service_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,

    /// Video device node, or an image file or directory, the camera reads from.
    #[serde(default = "default_camera_source")]
    camera_source: PathBuf,

    /// JPEG quality for transmitted frames (1-100).
    #[serde(default = "default_jpeg_quality")]
    jpeg_quality: u8,

    /// Where tracing output goes while the terminal UI owns the screen.
    #[serde(default = "default_log_file")]
    log_file: PathBuf,
}

fn default_service_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_camera_source() -> PathBuf {
    PathBuf::from("/dev/video0")
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_log_file() -> PathBuf {
    PathBuf::from("rps_vision.log")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            request_timeout_secs: default_request_timeout_secs(),
            camera_source: default_camera_source(),
            jpeg_quality: default_jpeg_quality(),
            log_file: default_log_file(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text. Missing keys take defaults.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        info!(service_url = %config.service_url, "Config loaded");
        Ok(config)
    }

    /// Loads `path` if it exists, defaults otherwise, then applies the
    /// environment override.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };
        if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            debug!(url = %url, "Service URL from environment");
            config.service_url = url;
        }
        Ok(config)
    }

    /// Overrides the service URL.
    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    /// Overrides the camera source.
    pub fn with_camera_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.camera_source = source.into();
        self
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[instrument(skip(self))]
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::new(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::new(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
