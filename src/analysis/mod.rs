//! Entropy testing and quality gating.
//!
//! This module provides the statistical tests run on extracted bytes.
//! These are sanity checks, not cryptographic proofs of entropy.

pub mod statistics;
mod threshold;

pub use statistics::{chi_square, BlockStatistics};
pub use threshold::{QualityThresholds, ThresholdViolation};
