//! Metrics collection and registry.

use crate::collector::CollectorStatus;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of collector state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Frames received, warm-up included.
    pub frames_processed: u64,
    /// Samples rejected for camera motion.
    pub rejected_samples: u64,
    /// Samples pending in the decorrelation window.
    pub window_len: usize,
    /// Completed bytes waiting in the extractor buffer.
    pub buffered_bytes: usize,
    /// Bytes delivered in accepted blocks.
    pub bytes_generated: u64,
    /// Blocks delivered.
    pub blocks_delivered: u64,
    /// Blocks discarded by the chi-square gate.
    pub blocks_rejected: u64,
    /// Chi-square of the most recent block.
    pub last_chi_square: f64,
    /// Percentage of pixels removed as zero-run artifacts.
    pub corrupt_pixels: f64,
}

impl MetricsSnapshot {
    /// Creates a snapshot from the collector's status.
    pub fn from_status(status: &CollectorStatus) -> Self {
        Self {
            frames_processed: status.frames_processed,
            rejected_samples: status.rejected_samples,
            window_len: status.window_len,
            buffered_bytes: status.buffered_bytes,
            bytes_generated: status.bytes_generated,
            blocks_delivered: status.blocks_delivered,
            blocks_rejected: status.blocks_rejected,
            last_chi_square: status.last_chi_square,
            corrupt_pixels: status.corrupt_pixels,
        }
    }
}

/// Prometheus metrics registry for entropy monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // Frame metrics
    frames_processed: IntCounter,
    rejected_samples: IntCounter,
    corrupt_pixels: Gauge,

    // Extraction metrics
    window_samples: IntGauge,
    buffered_bytes: IntGauge,

    // Block metrics
    bytes_generated: IntCounter,
    blocks_delivered: IntCounter,
    blocks_rejected: IntCounter,
    last_chi_square: Gauge,
}

/// Raises a counter to `target`; counters never move backwards.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all entropy metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_processed = IntCounter::new(
            "true_entropy_frames_processed_total",
            "Total frames received by the collector",
        )?;
        let rejected_samples = IntCounter::new(
            "true_entropy_rejected_samples_total",
            "Samples rejected for an out-of-range mean (camera motion)",
        )?;
        let corrupt_pixels = Gauge::new(
            "true_entropy_corrupt_pixels_percent",
            "Percentage of pixels removed as zero-run artifacts in the latest frame",
        )?;

        let window_samples = IntGauge::new(
            "true_entropy_window_samples",
            "Samples pending in the decorrelation window",
        )?;
        let buffered_bytes = IntGauge::new(
            "true_entropy_buffered_bytes",
            "Completed bytes waiting in the extractor buffer",
        )?;

        let bytes_generated = IntCounter::new(
            "true_entropy_bytes_generated_total",
            "Bytes delivered in accepted blocks",
        )?;
        let blocks_delivered = IntCounter::new(
            "true_entropy_blocks_delivered_total",
            "Blocks that passed the chi-square gate",
        )?;
        let blocks_rejected = IntCounter::new(
            "true_entropy_blocks_rejected_total",
            "Blocks discarded by the chi-square gate",
        )?;
        let last_chi_square = Gauge::new(
            "true_entropy_last_chi_square",
            "Chi-square statistic of the most recent block",
        )?;

        registry.register(Box::new(frames_processed.clone()))?;
        registry.register(Box::new(rejected_samples.clone()))?;
        registry.register(Box::new(corrupt_pixels.clone()))?;
        registry.register(Box::new(window_samples.clone()))?;
        registry.register(Box::new(buffered_bytes.clone()))?;
        registry.register(Box::new(bytes_generated.clone()))?;
        registry.register(Box::new(blocks_delivered.clone()))?;
        registry.register(Box::new(blocks_rejected.clone()))?;
        registry.register(Box::new(last_chi_square.clone()))?;

        Ok(Self {
            registry,
            frames_processed,
            rejected_samples,
            corrupt_pixels,
            window_samples,
            buffered_bytes,
            bytes_generated,
            blocks_delivered,
            blocks_rejected,
            last_chi_square,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        advance(&self.frames_processed, snapshot.frames_processed);
        advance(&self.rejected_samples, snapshot.rejected_samples);
        self.corrupt_pixels.set(snapshot.corrupt_pixels);

        self.window_samples.set(snapshot.window_len as i64);
        self.buffered_bytes.set(snapshot.buffered_bytes as i64);

        advance(&self.bytes_generated, snapshot.bytes_generated);
        advance(&self.blocks_delivered, snapshot.blocks_delivered);
        advance(&self.blocks_rejected, snapshot.blocks_rejected);
        self.last_chi_square.set(snapshot.last_chi_square);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
