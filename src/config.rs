//! Pipeline configuration.
//!
//! Out-of-range values are never fatal: [`CollectorConfig::clamped`] and
//! [`ExtractorConfig::clamped`] pull each field back to the nearest valid
//! value and log a warning. Only unreadable or malformed files are errors.

use crate::capture::CaptureConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest supported Von Neumann quantization width.
pub const MAX_BITS_PER_VALUE: u8 = 8;

/// Largest supported ABC recursion depth (3^10 values per output element).
pub const MAX_RECURSION_LEVELS: u8 = 10;

/// Smallest extractor buffer, in bytes.
pub const MIN_BUFFER_CAPACITY: usize = 64;

/// Configuration errors.
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

/// Production extraction algorithms.
///
/// The one-bit reference encoder is deliberately absent: it performs no
/// bias correction and can only be constructed explicitly in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmKind {
    /// Recursive Von Neumann encoder.
    #[default]
    VonNeumann,
    /// Recursive `a * b + c` extractor over GF(8).
    Gf8Abc,
}

impl std::str::FromStr for AlgorithmKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "von-neumann" | "vn" => Ok(Self::VonNeumann),
            "gf8-abc" | "abc" => Ok(Self::Gf8Abc),
            other => Err(format!(
                "unknown algorithm '{}' (expected von-neumann or gf8-abc)",
                other
            )),
        }
    }
}

/// Acceptable range for the mean of a difference sample.
///
/// A sample whose mean falls outside `[low, high)` is treated as camera
/// motion or a lighting change rather than sensor noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanRange {
    pub low: f64,
    pub high: f64,
}

impl MeanRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Half-open containment check.
    #[inline]
    pub fn contains(&self, mean: f64) -> bool {
        self.low <= mean && mean < self.high
    }
}

impl Default for MeanRange {
    fn default() -> Self {
        Self::new(-0.1, 0.1)
    }
}

/// Collector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Bytes per finished block.
    pub block_size_bytes: usize,
    /// Frames ignored at session start while the camera settles.
    pub skip_frames: u64,
    /// Acceptable sample mean.
    pub mean_range: MeanRange,
    /// Window offset between the two halves of a batch.
    pub sample_delta: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            block_size_bytes: 1024 * 1024,
            skip_frames: 10,
            mean_range: MeanRange::default(),
            sample_delta: 8,
        }
    }
}

impl CollectorConfig {
    /// Returns a copy with every field inside its valid range.
    pub fn clamped(mut self) -> Self {
        if self.block_size_bytes == 0 {
            tracing::warn!("block_size_bytes must be positive, using 1");
            self.block_size_bytes = 1;
        }

        let MeanRange { low, high } = self.mean_range;
        if !low.is_finite() || !high.is_finite() {
            tracing::warn!(low, high, "non-finite mean range, using default");
            self.mean_range = MeanRange::default();
        } else if low > high {
            tracing::warn!(low, high, "mean range bounds reversed, swapping");
            self.mean_range = MeanRange::new(high, low);
        }

        self
    }
}

/// Extractor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Active algorithm.
    pub algorithm: AlgorithmKind,
    /// Von Neumann quantization width, 1-8.
    pub bits_per_value: u8,
    /// ABC recursion depth.
    pub recursion_levels: u8,
    /// Chi-square ceiling for finished blocks, 0 disables the gate.
    pub chi_square_limit: f64,
    /// Initial output buffer size in bytes.
    pub buffer_capacity: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::VonNeumann,
            bits_per_value: 2,
            recursion_levels: 5,
            chi_square_limit: 0.0,
            buffer_capacity: 4 * 1024 * 1024,
        }
    }
}

impl ExtractorConfig {
    /// Returns a copy with every field inside its valid range.
    pub fn clamped(mut self) -> Self {
        let bits = self.bits_per_value.clamp(1, MAX_BITS_PER_VALUE);
        if bits != self.bits_per_value {
            tracing::warn!(requested = self.bits_per_value, used = bits, "bits_per_value clamped");
            self.bits_per_value = bits;
        }

        let levels = self.recursion_levels.clamp(1, MAX_RECURSION_LEVELS);
        if levels != self.recursion_levels {
            tracing::warn!(
                requested = self.recursion_levels,
                used = levels,
                "recursion_levels clamped"
            );
            self.recursion_levels = levels;
        }

        if !self.chi_square_limit.is_finite() || self.chi_square_limit < 0.0 {
            tracing::warn!(
                requested = self.chi_square_limit,
                "invalid chi_square_limit, gate disabled"
            );
            self.chi_square_limit = 0.0;
        }

        if self.buffer_capacity < MIN_BUFFER_CAPACITY {
            tracing::warn!(
                requested = self.buffer_capacity,
                used = MIN_BUFFER_CAPACITY,
                "buffer_capacity clamped"
            );
            self.buffer_capacity = MIN_BUFFER_CAPACITY;
        }

        self
    }
}

/// Output configuration for the command-line driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Run until interrupted instead of stopping after `block_count` blocks.
    pub continuous: bool,
    /// Blocks to deliver before stopping.
    pub block_count: u32,
    /// Frames to capture before giving up, 0 for no limit.
    pub frame_limit: u64,
    /// Directory receiving finished blocks.
    pub directory: PathBuf,
    /// Also write a CSV histogram companion for each block.
    pub write_csv: bool,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            block_count: 3,
            frame_limit: 0,
            directory: PathBuf::from("blocks"),
            write_csv: false,
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
    pub collector: CollectorConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.as_ref().display(), "Configuration loaded");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.capture.validate()?;
        Ok(config.clamped())
    }

    /// Clamps the collector and extractor sections.
    pub fn clamped(self) -> Self {
        Self {
            collector: self.collector.clamped(),
            extractor: self.extractor.clamped(),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileConfig::default();
        assert_eq!(config.collector.block_size_bytes, 1024 * 1024);
        assert_eq!(config.collector.skip_frames, 10);
        assert_eq!(config.collector.sample_delta, 8);
        assert_eq!(config.extractor.algorithm, AlgorithmKind::VonNeumann);
        assert_eq!(config.extractor.bits_per_value, 2);
        assert_eq!(config.extractor.chi_square_limit, 0.0);
    }

    #[test]
    fn test_mean_range_is_half_open() {
        let range = MeanRange::default();
        assert!(range.contains(0.0));
        assert!(range.contains(-0.1));
        assert!(!range.contains(0.1));
        assert!(!range.contains(2.5));
    }

    #[test]
    fn test_extractor_values_clamped() {
        let config = ExtractorConfig {
            bits_per_value: 12,
            recursion_levels: 0,
            chi_square_limit: -5.0,
            buffer_capacity: 1,
            ..Default::default()
        }
        .clamped();

        assert_eq!(config.bits_per_value, 8);
        assert_eq!(config.recursion_levels, 1);
        assert_eq!(config.chi_square_limit, 0.0);
        assert_eq!(config.buffer_capacity, MIN_BUFFER_CAPACITY);
    }

    #[test]
    fn test_collector_values_clamped() {
        let config = CollectorConfig {
            block_size_bytes: 0,
            mean_range: MeanRange::new(0.5, -0.5),
            ..Default::default()
        }
        .clamped();

        assert_eq!(config.block_size_bytes, 1);
        assert_eq!(config.mean_range, MeanRange::new(-0.5, 0.5));
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
            [collector]
            block_size_bytes = 4096
            mean_range = { low = -0.5, high = 0.5 }

            [extractor]
            algorithm = "gf8-abc"
            recursion_levels = 3
            chi_square_limit = 330.0
        "#;

        let config = FileConfig::from_toml(text).unwrap();
        assert_eq!(config.collector.block_size_bytes, 4096);
        assert_eq!(config.collector.skip_frames, 10);
        assert_eq!(config.collector.mean_range, MeanRange::new(-0.5, 0.5));
        assert_eq!(config.extractor.algorithm, AlgorithmKind::Gf8Abc);
        assert_eq!(config.extractor.recursion_levels, 3);
        assert_eq!(config.extractor.chi_square_limit, 330.0);
    }

    #[test]
    fn test_parse_clamps_out_of_range() {
        let config = FileConfig::from_toml("[extractor]\nbits_per_value = 20\n").unwrap();
        assert_eq!(config.extractor.bits_per_value, 8);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            FileConfig::from_toml("[extractor]\nalgorithm = \"one-bit\"\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("vn".parse::<AlgorithmKind>().unwrap(), AlgorithmKind::VonNeumann);
        assert_eq!("gf8-abc".parse::<AlgorithmKind>().unwrap(), AlgorithmKind::Gf8Abc);
        assert!("one-bit".parse::<AlgorithmKind>().is_err());
    }
}
