//! Camera abstraction for frame capture.
//!
//! Real capture lives in the host application; this trait is the seam it
//! plugs into. [`MockCamera`] synthesises a static scene overlaid with
//! per-pixel sensor noise so the extraction pipeline can run anywhere.

use super::{frame::pack_rgb, CaptureConfig, Frame};
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for camera implementations.
///
/// This abstraction allows swapping between real camera hardware
/// and mock implementations for testing.
pub trait Camera {
    /// Opens and initializes the camera with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Captures a single frame.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases resources.
    fn close(&mut self);
}

/// Mock camera producing a fixed scene plus random sensor noise.
///
/// Pixel differences between two captures are the noise alone, so the
/// difference samples are zero-centered unless [`MockCamera::set_brightness`]
/// moves the scene between captures.
#[derive(Debug)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    sequence: u64,
    rng: ChaCha8Rng,
    brightness: i32,
}

impl MockCamera {
    /// Creates a mock camera seeded from the OS.
    pub fn new() -> Self {
        Self::from_rng(ChaCha8Rng::from_entropy())
    }

    /// Creates a mock camera with reproducible noise.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_rng(rng: ChaCha8Rng) -> Self {
        Self {
            config: None,
            sequence: 0,
            rng,
            brightness: 0,
        }
    }

    /// Shifts every pixel of subsequent frames by `offset`, simulating a
    /// lighting change or camera movement.
    pub fn set_brightness(&mut self, offset: i32) {
        self.brightness = offset;
    }

    fn noise(&mut self, amplitude: u8) -> i32 {
        if amplitude == 0 {
            return 0;
        }
        let span = 2 * u32::from(amplitude) + 1;
        let a = (self.rng.next_u32() % span) as i32 - i32::from(amplitude);
        let b = (self.rng.next_u32() % span) as i32 - i32::from(amplitude);
        a + b
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

fn scene(x: u32, y: u32, channel: u32) -> i32 {
    40 + ((x * 3 + y * 2 + channel * 50) % 160) as i32
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        if let Some(seed) = config.seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!("MockCamera opened with config: {:?}", config);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.clone().ok_or(CameraError::NotInitialized)?;

        let mut pixels = Vec::with_capacity((config.width * config.height) as usize);
        for y in 0..config.height {
            for x in 0..config.width {
                if y < config.saturated_rows {
                    pixels.push(pack_rgb(255, 255, 255));
                    continue;
                }
                let mut rgb = [0u8; 3];
                for (channel, value) in rgb.iter_mut().enumerate() {
                    let level = scene(x, y, channel as u32)
                        + self.brightness
                        + self.noise(config.noise_amplitude);
                    *value = level.clamp(0, 255) as u8;
                }
                pixels.push(pack_rgb(rgb[0], rgb[1], rgb[2]));
            }
        }

        self.sequence += 1;
        Ok(Frame::new(pixels, config.width, config.height, self.sequence))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        self.config = None;
        tracing::info!("MockCamera closed");
    }
}
