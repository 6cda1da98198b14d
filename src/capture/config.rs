//! Camera capture configuration.
//!
//! Capture itself belongs to the host platform. These settings drive the
//! [`MockCamera`](super::MockCamera) used by the demo driver, tests and
//! benchmarks.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration for camera capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Peak amplitude of synthetic sensor noise per channel.
    pub noise_amplitude: u8,
    /// Rows at the top of the frame driven to full brightness.
    pub saturated_rows: u32,
    /// Fixed noise seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            noise_amplitude: 4,
            saturated_rows: 0,
            seed: None,
        }
    }
}

impl CaptureConfig {
    /// Default settings at `width` x `height`.
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
    fn test_frame_rate_bounds() {
        let mut config = CaptureConfig::with_dimensions(64, 48);
        config.fps = 240;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFrameRate)
        ));
    }
}
