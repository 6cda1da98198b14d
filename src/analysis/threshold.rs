//! Quality thresholds for fail-closed block delivery.
//!
//! A block whose chi-square statistic exceeds the configured limit is
//! dropped instead of being handed to the consumer.

/// Quality thresholds for entropy blocks.
#[derive(Debug, Clone)]
pub struct QualityThresholds {
    /// Maximum acceptable chi-square statistic; `0` disables the gate.
    pub chi_square_limit: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            chi_square_limit: 0.0,
        }
    }
}

impl QualityThresholds {
    /// Limit known to pass healthy camera output while catching gross bias.
    pub const RECOMMENDED_CHI_SQUARE_LIMIT: f64 = 330.0;

    pub fn new(chi_square_limit: f64) -> Self {
        Self { chi_square_limit }
    }

    /// Thresholds with the gate switched on at the recommended limit.
    pub fn recommended() -> Self {
        Self::new(Self::RECOMMENDED_CHI_SQUARE_LIMIT)
    }

    /// Returns true if the gate is active.
    pub fn is_enabled(&self) -> bool {
        self.chi_square_limit > 0.0
    }

    /// Checks an already computed statistic.
    pub fn check_chi_square(&self, observed: f64) -> Result<(), ThresholdViolation> {
        if self.is_enabled() && observed > self.chi_square_limit {
            return Err(ThresholdViolation::ChiSquareExceeded {
                observed,
                threshold: self.chi_square_limit,
            });
        }
        Ok(())
    }
}

/// Threshold violation types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdViolation {
    #[error("chi-square {observed:.2} exceeds threshold {threshold:.2}")]
    ChiSquareExceeded { observed: f64, threshold: f64 },
}
