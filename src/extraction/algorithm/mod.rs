//! Bias-removal algorithms.
//!
//! Every algorithm consumes a batch of raw noise values (one value per
//! sample slot) and returns a variable number of output bits. A zero-width
//! result is normal: the batch simply carried no extractable bits yet.

mod abc;
mod one_bit;
mod von_neumann;

pub use abc::{quantize as abc_quantize, AbcExtractor, ABC_MINIMAL_BATCH};
pub use one_bit::OneBitEncoder;
pub use von_neumann::VonNeumannEncoder;

use crate::config::{AlgorithmKind, ExtractorConfig};
use std::borrow::Cow;

/// Up to 32 output bits, least significant bit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodedBits {
    bits: u32,
    width: u8,
}

impl EncodedBits {
    /// No output.
    pub const EMPTY: EncodedBits = EncodedBits { bits: 0, width: 0 };

    /// Creates an output of `width` bits; bits above `width` are cleared.
    pub fn new(bits: u32, width: u8) -> Self {
        let width = width.min(32);
        let bits = if width == 32 {
            bits
        } else {
            bits & ((1u32 << width) - 1)
        };
        Self { bits, width }
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0
    }
}

/// The active extraction strategy.
#[derive(Debug, Clone)]
pub enum ExtractAlgorithm {
    /// Recursive Von Neumann lookup encoder.
    VonNeumann(VonNeumannEncoder),
    /// Recursive `a * b + c` over GF(8).
    Gf8Abc(AbcExtractor),
    /// Naive sign-bit encoder. Reference only, never selected by configuration.
    OneBit(OneBitEncoder),
}

impl ExtractAlgorithm {
    /// Builds the configured production algorithm.
    pub fn from_config(config: &ExtractorConfig) -> Self {
        match config.algorithm {
            AlgorithmKind::VonNeumann => {
                Self::VonNeumann(VonNeumannEncoder::new(config.bits_per_value))
            }
            AlgorithmKind::Gf8Abc => Self::Gf8Abc(AbcExtractor::new(config.recursion_levels)),
        }
    }

    /// The uncorrected one-bit encoder, for demonstrating raw bias.
    pub fn reference_one_bit() -> Self {
        Self::OneBit(OneBitEncoder::new())
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VonNeumann(_) => "von-neumann",
            Self::Gf8Abc(_) => "gf8-abc",
            Self::OneBit(_) => "one-bit",
        }
    }

    /// Number of samples combined into one batch.
    pub fn minimal_batch_size(&self) -> usize {
        match self {
            Self::VonNeumann(vn) => vn.minimal_batch_size(),
            Self::Gf8Abc(abc) => abc.minimal_batch_size(),
            Self::OneBit(one) => one.minimal_batch_size(),
        }
    }

    /// Drops raw values the algorithm cannot use.
    pub fn filter_samples<'a>(&self, batch: &'a [i32]) -> Cow<'a, [i32]> {
        match self {
            Self::VonNeumann(_) => Cow::Borrowed(batch),
            Self::Gf8Abc(_) | Self::OneBit(_) => drop_zeros(batch),
        }
    }

    /// Encodes one filtered batch.
    pub fn encode(&mut self, batch: &[i32]) -> EncodedBits {
        match self {
            Self::VonNeumann(vn) => vn.encode(batch),
            Self::Gf8Abc(abc) => abc.encode(batch),
            Self::OneBit(one) => one.encode(batch),
        }
    }
}

/// Removes exact zeros, borrowing when there are none.
pub(crate) fn drop_zeros(batch: &[i32]) -> Cow<'_, [i32]> {
    if batch.contains(&0) {
        Cow::Owned(batch.iter().copied().filter(|&v| v != 0).collect())
    } else {
        Cow::Borrowed(batch)
    }
}
