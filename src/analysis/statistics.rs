//! Statistical tests for entropy quality.
//!
//! These tests are sanity checks to detect obvious problems,
//! not proofs of entropy quality. Passing these tests is necessary
//! but not sufficient for good entropy.

/// Number of byte symbols.
const SYMBOLS: usize = 256;

/// Pearson chi-square statistic of `data` against a uniform byte
/// distribution, with `data.len() / 256` expected occurrences per symbol.
///
/// Empty input scores 0. Ideal random data scores close to 255, the
/// degrees of freedom.
pub fn chi_square(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; SYMBOLS];
    for &b in data {
        counts[b as usize] += 1;
    }

    let expected = data.len() as f64 / SYMBOLS as f64;
    counts
        .iter()
        .map(|&observed| {
            let d = observed as f64 - expected;
            d * d / expected
        })
        .sum()
}

/// Shannon entropy in bits of a histogram holding `total` observations.
pub(crate) fn shannon_entropy(histogram: &[u32], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    -histogram
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = f64::from(c) / n;
            p * p.log2()
        })
        .sum::<f64>()
}

/// Min-entropy in bits: `-log2` of the most frequent symbol's probability.
pub(crate) fn min_entropy(histogram: &[u32], total: usize) -> f64 {
    let peak = histogram.iter().copied().max().unwrap_or(0);
    if total == 0 || peak == 0 {
        return 0.0;
    }
    -(f64::from(peak) / total as f64).log2()
}

/// Statistical test results for one block of bytes.
#[derive(Debug, Clone)]
pub struct BlockStatistics {
    /// Chi-square against uniform bytes.
    pub chi_square: f64,
    /// Bit bias (deviation from 0.5).
    pub bit_bias: f64,
    /// Shannon entropy per byte, at most 8.
    pub entropy: f64,
    /// Number of bytes analyzed.
    pub sample_size: usize,
}

impl BlockStatistics {
    /// Runs all statistical tests on `data`.
    pub fn analyze(data: &[u8]) -> Self {
        let mut histogram = [0u32; SYMBOLS];
        for &b in data {
            histogram[b as usize] += 1;
        }

        let ones: u64 = data.iter().map(|b| u64::from(b.count_ones())).sum();
        let bit_bias = if data.is_empty() {
            0.0
        } else {
            ones as f64 / (data.len() * 8) as f64 - 0.5
        };

        Self {
            chi_square: chi_square(data),
            bit_bias,
            entropy: shannon_entropy(&histogram, data.len()),
            sample_size: data.len(),
        }
    }

    /// Returns true if results look reasonable (not proof of quality).
    pub fn looks_reasonable(&self) -> bool {
        // Loose sanity checks
        let bias_ok = self.bit_bias.abs() < 0.1;
        let entropy_ok = self.entropy > 7.0;
        bias_ok && entropy_ok
    }
}
