//! Naive sign encoder: one output bit per value, `1` for positive noise.
//!
//! Kept as a baseline for comparing raw bias against the corrected
//! algorithms.

use super::EncodedBits;

/// Values read per call.
const WIDTH: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct OneBitEncoder;

impl OneBitEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn minimal_batch_size(&self) -> usize {
        WIDTH
    }

    /// Bit `i` is set when `values[i] > 0`. Only the first eight values
    /// are read.
    pub fn encode(&self, values: &[i32]) -> EncodedBits {
        let used = &values[..values.len().min(WIDTH)];
        let bits = used
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v > 0)
            .fold(0u32, |acc, (i, _)| acc | (1 << i));
        EncodedBits::new(bits, used.len() as u8)
    }
}
