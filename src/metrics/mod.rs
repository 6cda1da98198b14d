//! Prometheus metrics exporter for collector monitoring.
//!
//! This module exposes collector progress in Prometheus format, optionally
//! served over HTTP when the `metrics` feature is enabled.
//!
//! # Metrics Exposed
//!
//! ## Frame Metrics
//! - `true_entropy_frames_processed_total` - Frames received
//! - `true_entropy_rejected_samples_total` - Samples rejected for camera motion
//! - `true_entropy_corrupt_pixels_percent` - Zero-run artifacts in the latest frame
//!
//! ## Extraction Metrics
//! - `true_entropy_window_samples` - Samples pending in the decorrelation window
//! - `true_entropy_buffered_bytes` - Bytes waiting in the extractor buffer
//!
//! ## Block Metrics
//! - `true_entropy_bytes_generated_total` - Bytes delivered
//! - `true_entropy_blocks_delivered_total` - Blocks accepted
//! - `true_entropy_blocks_rejected_total` - Blocks discarded by the chi-square gate
//! - `true_entropy_last_chi_square` - Chi-square of the latest block
//!
//! # Example
//!
//! ```no_run
//! use true_entropy::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     frames_processed: 120,
//!     blocks_delivered: 2,
//!     last_chi_square: 248.7,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
