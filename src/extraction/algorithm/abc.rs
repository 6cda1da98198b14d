//! GF(8) `a * b + c` extractor.
//!
//! Non-zero noise values are mapped into the field and queued. Once
//! `3^levels` elements are pending they are reduced triple by triple down
//! to one element, which contributes three output bits. Elements beyond a
//! full block stay queued for the next output.

use super::EncodedBits;
use crate::config::MAX_RECURSION_LEVELS;
use crate::gf8;

/// Values combined into one batch by the collector.
pub const ABC_MINIMAL_BATCH: usize = 12;

/// Maps a raw non-zero noise value into GF(8).
///
/// Positive values keep their low three bits; non-positive values are
/// shifted by 249 first so that `-1 -> 0` and `-2 -> 7`.
#[inline]
pub fn quantize(value: i32) -> u8 {
    if value > 0 {
        (value % 8) as u8
    } else {
        ((249 + value).abs() % 8) as u8
    }
}

#[derive(Debug, Clone)]
pub struct AbcExtractor {
    recursion_levels: u8,
    required: usize,
    pending: Vec<u8>,
}

impl AbcExtractor {
    /// `recursion_levels` is clamped to `1..=10`.
    pub fn new(recursion_levels: u8) -> Self {
        let levels = recursion_levels.clamp(1, MAX_RECURSION_LEVELS);
        let required = 3usize.pow(u32::from(levels));
        Self {
            recursion_levels: levels,
            required,
            pending: Vec::with_capacity(required + ABC_MINIMAL_BATCH),
        }
    }

    pub fn recursion_levels(&self) -> u8 {
        self.recursion_levels
    }

    /// Field elements consumed per output.
    pub fn required(&self) -> usize {
        self.required
    }

    /// Field elements waiting for the next output.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn minimal_batch_size(&self) -> usize {
        ABC_MINIMAL_BATCH
    }

    /// Queues `values` and emits three bits when a full block is pending.
    pub fn encode(&mut self, values: &[i32]) -> EncodedBits {
        self.pending
            .extend(values.iter().filter(|&&v| v != 0).map(|&v| quantize(v)));

        if self.pending.len() < self.required {
            return EncodedBits::EMPTY;
        }

        match gf8::reduce(&self.pending[..self.required]) {
            Ok(element) => {
                self.pending.drain(..self.required);
                EncodedBits::new(u32::from(element), 3)
            }
            Err(e) => {
                tracing::warn!(error = %e, "GF(8) reduction failed");
                EncodedBits::EMPTY
            }
        }
    }

    /// Drops all pending elements.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
