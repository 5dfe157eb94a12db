//! Capture and session configuration.

use super::Orientation;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the frame source.
///
/// Dimensions and orientation are fixed for the lifetime of a preview;
/// the decode loop and preprocessor are built against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame orientation in degrees (0, 90, 180 or 270).
    pub orientation: Orientation,
    /// Target frames per second delivered by the source.
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            orientation: Orientation::Deg0,
            fps: 30,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Decode loop tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sleep between polls when no frame is available yet, in
    /// microseconds. Zero yields the thread instead of sleeping.
    pub idle_backoff_us: u64,
}

/// Demo run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Give up after this many seconds without a result (0 = run until
    /// interrupted).
    pub timeout_secs: u64,
    /// Attempt count after which the scripted decoder reports a hit
    /// (0 = never).
    pub decode_after: u64,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            decode_after: 500,
            metrics_port: 9090,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: FileConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.capture.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CaptureConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [capture]
            width = 1280
            height = 720
            orientation = 90
            fps = 15

            [session]
            idle_backoff_us = 250
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.capture.width, 1280);
        assert_eq!(config.capture.orientation, Orientation::Deg90);
        assert_eq!(config.session.idle_backoff_us, 250);
        // Missing section falls back to defaults
        assert_eq!(config.output.metrics_port, 9090);
    }

    #[test]
    fn test_bad_orientation_rejected() {
        let toml = r#"
            [capture]
            width = 640
            height = 480
            orientation = 45
            fps = 30
        "#;
        assert!(toml::from_str::<FileConfig>(toml).is_err());
    }
}
