//! Bit harvesting and bias removal.
//!
//! This module turns pairs of camera frames into packed entropy bytes:
//! frames are differenced per color channel, samples are read in
//! decorrelating orders, batches go through a bias-removal algorithm and
//! the output bits are packed into a buffer that finished blocks are
//! drained from.

pub mod algorithm;
mod bitstream;
mod block;
mod sample;
mod spatial;
mod temporal;

pub use algorithm::{EncodedBits, ExtractAlgorithm};
pub use bitstream::BitBuffer;
pub use block::EntropyBlock;
pub use sample::{Sample, SampleStats, DEFAULT_ZERO_RUN_THRESHOLD, HISTOGRAM_SLOTS};
pub use spatial::SampleOrder;
pub use temporal::{difference, TemporalDifferencer};

use crate::analysis::{statistics, QualityThresholds, ThresholdViolation};
use crate::config::ExtractorConfig;

/// Errors raised while extracting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("incompatible frames: {left:?} vs {right:?} (width, height, pixels)")]
    IncompatibleFrames {
        left: (u32, u32, usize),
        right: (u32, u32, usize),
    },

    #[error("insufficient input: need at least {needed} elements, got {got}")]
    InsufficientInput { needed: usize, got: usize },

    #[error("insufficient data: requested {requested} bytes, {available} available")]
    InsufficientData { requested: usize, available: usize },
}

/// Bias-removal stage with its output buffer and quality gate.
pub struct Extractor {
    buffer: BitBuffer,
    algorithm: ExtractAlgorithm,
    thresholds: QualityThresholds,
    config: ExtractorConfig,
    last_chi_square: f64,
    last_violation: Option<ThresholdViolation>,
    /// Reused batch storage for `collect_entropy`.
    tuple: Vec<i32>,
}

impl Extractor {
    /// Creates an extractor running the configured algorithm.
    pub fn new(config: ExtractorConfig) -> Self {
        let config = config.clamped();
        let algorithm = ExtractAlgorithm::from_config(&config);
        Self::build(config, algorithm)
    }

    /// Creates an extractor around an explicit algorithm, e.g.
    /// [`ExtractAlgorithm::reference_one_bit`].
    pub fn with_algorithm(config: ExtractorConfig, algorithm: ExtractAlgorithm) -> Self {
        Self::build(config.clamped(), algorithm)
    }

    fn build(config: ExtractorConfig, algorithm: ExtractAlgorithm) -> Self {
        tracing::info!(
            algorithm = algorithm.name(),
            chi_square_limit = config.chi_square_limit,
            buffer_capacity = config.buffer_capacity,
            "Extractor ready"
        );
        Self {
            buffer: BitBuffer::with_capacity(config.buffer_capacity),
            thresholds: QualityThresholds::new(config.chi_square_limit),
            tuple: Vec::with_capacity(algorithm.minimal_batch_size()),
            algorithm,
            config,
            last_chi_square: 0.0,
            last_violation: None,
        }
    }

    pub fn algorithm(&self) -> &ExtractAlgorithm {
        &self.algorithm
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Samples per batch wanted by the active algorithm.
    pub fn minimal_batch_size(&self) -> usize {
        self.algorithm.minimal_batch_size()
    }

    /// Completed bytes waiting in the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.buffer.position()
    }

    /// Bits already used in the current partial byte.
    #[inline]
    pub fn bit_position(&self) -> u8 {
        self.buffer.bit_position()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Filters and encodes one batch, appending any output to the buffer.
    pub fn encode(&mut self, batch: &[i32]) -> EncodedBits {
        let filtered = self.algorithm.filter_samples(batch);
        let encoded = self.algorithm.encode(&filtered);
        self.buffer.push_bits(encoded.bits(), encoded.width());
        encoded
    }

    /// Feeds a batch of samples through the algorithm.
    ///
    /// Sample `j` of the batch is read in [`SampleOrder::for_position`]`(j)`
    /// and one tuple is encoded per index of the shortest sample. Returns
    /// the number of bits produced.
    pub fn collect_entropy(&mut self, samples: &[Sample]) -> usize {
        let count = samples.iter().map(Sample::len).min().unwrap_or(0);
        let mut tuple = std::mem::take(&mut self.tuple);
        let mut produced = 0usize;

        for i in 0..count {
            tuple.clear();
            tuple.extend(
                samples
                    .iter()
                    .enumerate()
                    .map(|(pos, s)| s.get(i, SampleOrder::for_position(pos))),
            );
            produced += usize::from(self.encode(&tuple).width());
        }

        self.tuple = tuple;
        tracing::trace!(samples = samples.len(), count, produced, "Batch encoded");
        produced
    }

    /// Chi-square of the first `count` completed bytes.
    pub fn chi_square(&self, count: usize) -> f64 {
        let completed = self.buffer.completed();
        statistics::chi_square(&completed[..count.min(completed.len())])
    }

    /// Removes the first `count` bytes from the buffer.
    ///
    /// The bytes are returned when they pass the chi-square gate and
    /// discarded otherwise, in which case the result is empty and
    /// [`Extractor::last_violation`] says why.
    pub fn get_entropy(&mut self, count: usize) -> Result<Vec<u8>, ExtractionError> {
        let available = self.buffer.position();
        if count > available {
            return Err(ExtractionError::InsufficientData {
                requested: count,
                available,
            });
        }

        let chi = self.chi_square(count);
        self.last_chi_square = chi;
        let data = self.buffer.take_front(count);

        match self.thresholds.check_chi_square(chi) {
            Ok(()) => {
                self.last_violation = None;
                Ok(data)
            }
            Err(violation) => {
                tracing::warn!(bytes = count, %violation, "Block rejected");
                self.last_violation = Some(violation);
                Ok(Vec::new())
            }
        }
    }

    /// Chi-square of the most recently drained block.
    pub fn last_chi_square(&self) -> f64 {
        self.last_chi_square
    }

    /// Why the most recently drained block was rejected, if it was.
    pub fn last_violation(&self) -> Option<&ThresholdViolation> {
        self.last_violation.as_ref()
    }

    /// Zeroes the buffer and reloads the algorithm and limit.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.algorithm = match self.algorithm {
            ExtractAlgorithm::OneBit(_) => ExtractAlgorithm::reference_one_bit(),
            _ => ExtractAlgorithm::from_config(&self.config),
        };
        self.thresholds = QualityThresholds::new(self.config.chi_square_limit);
        self.last_chi_square = 0.0;
        self.last_violation = None;
        tracing::info!(algorithm = self.algorithm.name(), "Extractor reset");
    }

    /// Applies a new configuration and resets.
    pub fn reconfigure(&mut self, config: ExtractorConfig) {
        self.config = config.clamped();
        if self.buffer.capacity() != self.config.buffer_capacity {
            self.buffer = BitBuffer::with_capacity(self.config.buffer_capacity);
        }
        self.reset();
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("algorithm", &self.algorithm.name())
            .field("buffer", &self.buffer)
            .field("chi_square_limit", &self.thresholds.chi_square_limit)
            .field("last_chi_square", &self.last_chi_square)
            .finish()
    }
}
