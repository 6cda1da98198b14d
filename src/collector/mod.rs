//! Frame-to-block orchestration.
//!
//! The [`Collector`] consumes frames in arrival order, differences each
//! one against its predecessor, rejects samples disturbed by camera motion,
//! and feeds decorrelated batches to its [`Extractor`] until a block of the
//! configured size is buffered.

mod window;
mod worker;

pub use window::DecorrelationWindow;
pub use worker::{lock_collector, spawn_worker, CollectorEvent, SharedCollector};

use crate::capture::Frame;
use crate::config::CollectorConfig;
use crate::extraction::{ExtractionError, Extractor, Sample, TemporalDifferencer};
use serde::Serialize;
use std::time::Instant;

/// Point-in-time view of collector progress.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectorStatus {
    /// Algorithm driving the extractor.
    pub algorithm: &'static str,
    /// Frames received, warm-up frames included.
    pub frames_processed: u64,
    /// Samples dropped for an out-of-range mean.
    pub rejected_samples: u64,
    /// Samples waiting in the decorrelation window.
    pub window_len: usize,
    /// Completed bytes buffered in the extractor.
    pub buffered_bytes: usize,
    /// Bytes handed out in accepted blocks.
    pub bytes_generated: u64,
    pub blocks_delivered: u64,
    pub blocks_rejected: u64,
    /// Chi-square of the last retrieved block.
    pub last_chi_square: f64,
    /// Largest zero-run removal percentage among the latest samples.
    pub corrupt_pixels: f64,
}

/// Drives extraction from a stream of frames.
pub struct Collector {
    extractor: Extractor,
    config: CollectorConfig,
    differencer: TemporalDifferencer,
    window: DecorrelationWindow,
    frame_counter: u64,
    rejected_samples: u64,
    bytes_generated: u64,
    blocks_delivered: u64,
    blocks_rejected: u64,
    last_chi_square: f64,
    corrupt_pixels: f64,
}

impl Collector {
    pub fn new(config: CollectorConfig, extractor: Extractor) -> Self {
        let config = config.clamped();
        tracing::info!(
            block_size = config.block_size_bytes,
            skip_frames = config.skip_frames,
            delta = config.sample_delta,
            algorithm = extractor.algorithm().name(),
            "Collector ready"
        );
        Self {
            window: DecorrelationWindow::new(config.sample_delta),
            extractor,
            config,
            differencer: TemporalDifferencer::new(),
            frame_counter: 0,
            rejected_samples: 0,
            bytes_generated: 0,
            blocks_delivered: 0,
            blocks_rejected: 0,
            last_chi_square: 0.0,
            corrupt_pixels: 0.0,
        }
    }

    /// Processes one frame.
    ///
    /// Warm-up frames are counted and dropped; the first frame after warm-up
    /// only primes differencing. An [`ExtractionError::IncompatibleFrames`]
    /// error means this pair was skipped; the collector stays usable.
    ///
    /// While a block is ready nothing is encoded and accepted samples pile
    /// up in the window, up to three full-frame samples per call. Callers
    /// driving the collector directly must drain with
    /// [`get_entropy`](Self::get_entropy) whenever
    /// [`block_ready`](Self::block_ready) holds, or memory grows without
    /// bound.
    pub fn collect(&mut self, frame: Frame) -> Result<(), ExtractionError> {
        let started = Instant::now();
        self.frame_counter += 1;

        if self.frame_counter <= self.config.skip_frames {
            tracing::trace!(frame = self.frame_counter, "Warm-up frame skipped");
            return Ok(());
        }

        let samples = match self.differencer.difference(frame) {
            Some(result) => result?,
            None => {
                tracing::debug!(frame = self.frame_counter, "Differencing primed");
                return Ok(());
            }
        };

        self.corrupt_pixels = samples
            .iter()
            .map(Sample::zero_runs_removed)
            .fold(0.0, f64::max);

        for sample in samples {
            if self.config.mean_range.contains(sample.mean()) {
                self.window.push(sample);
            } else {
                self.rejected_samples += 1;
                tracing::debug!(
                    frame = self.frame_counter,
                    mean = sample.mean(),
                    "Sample rejected, camera motion suspected"
                );
            }
        }

        self.assemble();

        tracing::debug!(
            frame = self.frame_counter,
            window = self.window.len(),
            buffered = self.extractor.position(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Frame processed"
        );
        Ok(())
    }

    /// Feeds batches until the window runs dry or a block is buffered.
    fn assemble(&mut self) {
        let batch_size = self.extractor.minimal_batch_size();
        while !self.block_ready() {
            match self.window.take_batch(batch_size) {
                Some(batch) => {
                    self.extractor.collect_entropy(&batch);
                }
                None => break,
            }
        }
    }

    /// Returns true once a full block is buffered.
    pub fn block_ready(&self) -> bool {
        self.extractor.position() >= self.config.block_size_bytes
    }

    /// Drains one block.
    ///
    /// Returns an empty vector when no block is ready or when the block
    /// failed validation and was discarded.
    pub fn get_entropy(&mut self) -> Vec<u8> {
        if !self.block_ready() {
            return Vec::new();
        }

        let data = match self.extractor.get_entropy(self.config.block_size_bytes) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Block retrieval failed");
                return Vec::new();
            }
        };

        self.last_chi_square = self.extractor.last_chi_square();
        if data.is_empty() {
            self.blocks_rejected += 1;
        } else {
            self.bytes_generated += data.len() as u64;
            self.blocks_delivered += 1;
            tracing::info!(
                bytes = data.len(),
                chi_square = self.last_chi_square,
                total = self.bytes_generated,
                "Block delivered"
            );
        }
        data
    }

    /// Clears window, differencing state, counters and the extractor.
    pub fn reset(&mut self) {
        self.window.reconfigure(self.config.sample_delta);
        self.differencer.reset();
        self.extractor.reset();
        self.frame_counter = 0;
        self.rejected_samples = 0;
        self.bytes_generated = 0;
        self.blocks_delivered = 0;
        self.blocks_rejected = 0;
        self.last_chi_square = 0.0;
        self.corrupt_pixels = 0.0;
        tracing::info!("Collector reset");
    }

    /// Applies a new configuration and resets.
    pub fn reconfigure(&mut self, config: CollectorConfig) {
        self.config = config.clamped();
        self.reset();
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn status(&self) -> CollectorStatus {
        CollectorStatus {
            algorithm: self.extractor.algorithm().name(),
            frames_processed: self.frame_counter,
            rejected_samples: self.rejected_samples,
            window_len: self.window.len(),
            buffered_bytes: self.extractor.position(),
            bytes_generated: self.bytes_generated,
            blocks_delivered: self.blocks_delivered,
            blocks_rejected: self.blocks_rejected,
            last_chi_square: self.last_chi_square,
            corrupt_pixels: self.corrupt_pixels,
        }
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn extractor_mut(&mut self) -> &mut Extractor {
        &mut self.extractor
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("config", &self.config)
            .field("extractor", &self.extractor)
            .field("window", &self.window.len())
            .field("frames", &self.frame_counter)
            .finish()
    }
}
