//! Per-channel noise samples.
//!
//! A [`Sample`] holds the signed differences of one color channel between
//! two frames. Overexposed regions produce long runs of exact zeros
//! (255 - 255) which carry no noise; they are excised once, when the
//! sample is built. After that the values are read-only.

use super::spatial::SampleOrder;
use crate::analysis::statistics;
use std::cell::OnceCell;

/// Histogram slots for differences in `-255..=255`.
pub const HISTOGRAM_SLOTS: usize = 511;

/// Slot of the value zero.
const ZERO_SLOT: usize = 255;

/// Zero runs longer than this are treated as saturation artifacts.
pub const DEFAULT_ZERO_RUN_THRESHOLD: usize = 7;

#[inline]
fn histogram_slot(value: i32) -> Option<usize> {
    value
        .checked_add(ZERO_SLOT as i32)
        .and_then(|v| usize::try_from(v).ok())
        .filter(|&slot| slot < HISTOGRAM_SLOTS)
}

/// Derived statistics of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleStats {
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    pub deviation: f64,
    pub min: i32,
    pub max: i32,
    /// Shannon entropy in bits per value.
    pub entropy: f64,
    /// `-log2` of the most frequent value's probability.
    pub min_entropy: f64,
}

/// One channel's noise vector.
#[derive(Clone)]
pub struct Sample {
    values: Vec<i32>,
    width: usize,
    histogram: Vec<u32>,
    /// Mean of the raw differences, before artifact removal.
    mean: f64,
    /// Percent of values removed as zero-run artifacts.
    zero_runs_removed: f64,
    stats: OnceCell<SampleStats>,
}

impl Sample {
    /// Builds a sample from raw differences laid out in rows of `width`.
    ///
    /// Values are expected in `-255..=255`; anything outside that range is
    /// kept but not counted in the histogram.
    pub fn new(values: Vec<i32>, width: usize) -> Self {
        Self::with_threshold(values, width, DEFAULT_ZERO_RUN_THRESHOLD)
    }

    /// Like [`Sample::new`] with a custom zero-run threshold.
    pub fn with_threshold(values: Vec<i32>, width: usize, threshold: usize) -> Self {
        let mut histogram = vec![0u32; HISTOGRAM_SLOTS];
        let mut sum: i64 = 0;
        for &v in &values {
            sum += i64::from(v);
            if let Some(slot) = histogram_slot(v) {
                histogram[slot] += 1;
            }
        }
        let mean = if values.is_empty() {
            0.0
        } else {
            sum as f64 / values.len() as f64
        };
        Self::from_parts(values, width, histogram, mean, threshold)
    }

    /// Builds a sample whose histogram and mean were accumulated by the
    /// caller in the same pass that produced the values.
    pub(crate) fn from_difference(
        values: Vec<i32>,
        width: usize,
        histogram: Vec<u32>,
        mean: f64,
    ) -> Self {
        Self::from_parts(values, width, histogram, mean, DEFAULT_ZERO_RUN_THRESHOLD)
    }

    fn from_parts(
        values: Vec<i32>,
        width: usize,
        histogram: Vec<u32>,
        mean: f64,
        threshold: usize,
    ) -> Self {
        debug_assert_eq!(histogram.len(), HISTOGRAM_SLOTS);
        let mut sample = Self {
            values,
            width: width.max(1),
            histogram,
            mean,
            zero_runs_removed: 0.0,
            stats: OnceCell::new(),
        };
        sample.remove_zero_runs(threshold);
        sample
    }

    /// Excises every run of exact zeros longer than `threshold`.
    fn remove_zero_runs(&mut self, threshold: usize) {
        let original = self.values.len();
        if original == 0 {
            return;
        }

        let mut runs = Vec::new();
        let mut start = None;
        for (i, &v) in self.values.iter().enumerate() {
            match (v == 0, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s > threshold {
                        runs.push(s..i);
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if original - s > threshold {
                runs.push(s..original);
            }
        }

        if runs.is_empty() {
            return;
        }

        let removed: usize = runs.iter().map(|r| r.len()).sum();
        let mut kept = Vec::with_capacity(original - removed);
        let mut last = 0;
        for run in &runs {
            kept.extend_from_slice(&self.values[last..run.start]);
            last = run.end;
        }
        kept.extend_from_slice(&self.values[last..]);

        self.values = kept;
        self.histogram[ZERO_SLOT] = self.histogram[ZERO_SLOT].saturating_sub(removed as u32);
        self.zero_runs_removed = 100.0 * removed as f64 / original as f64;

        tracing::trace!(
            removed,
            percent = self.zero_runs_removed,
            runs = runs.len(),
            "Removed zero-run artifacts"
        );
    }

    /// Raw values after artifact removal.
    #[inline]
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no values remain.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Row width of the source frame.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows covered by the remaining values.
    #[inline]
    pub fn height(&self) -> usize {
        self.values.len() / self.width
    }

    /// Value counts, slot `v + 255` for value `v`.
    pub fn histogram(&self) -> &[u32] {
        &self.histogram
    }

    /// Mean of the raw differences, used to detect camera motion.
    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Percent of values removed as zero-run artifacts.
    #[inline]
    pub fn zero_runs_removed(&self) -> f64 {
        self.zero_runs_removed
    }

    /// Value at `index` read in the given order.
    ///
    /// Indices wrap modulo the sample length. An empty sample reads as 0.
    #[inline]
    pub fn get(&self, index: usize, order: SampleOrder) -> i32 {
        if self.values.is_empty() {
            return 0;
        }
        self.values[order.index(index, self.values.len(), self.width)]
    }

    /// Statistics, computed on first access and cached.
    pub fn stats(&self) -> &SampleStats {
        self.stats.get_or_init(|| self.compute_stats())
    }

    /// Drops cached statistics so the next [`Sample::stats`] recomputes them.
    pub fn reset_stats(&mut self) {
        self.stats.take();
    }

    fn compute_stats(&self) -> SampleStats {
        if self.values.is_empty() {
            return SampleStats::default();
        }

        let (mut sum, mut sum_sq) = (0i64, 0i64);
        let (mut min, mut max) = (i32::MAX, i32::MIN);
        for &v in &self.values {
            let w = i64::from(v);
            sum += w;
            sum_sq += w * w;
            min = min.min(v);
            max = max.max(v);
        }

        let n = self.values.len() as f64;
        let mean = sum as f64 / n;
        let variance = ((sum_sq as f64 - (sum as f64 * sum as f64) / n) / n).max(0.0);

        SampleStats {
            mean,
            variance,
            deviation: variance.sqrt(),
            min,
            max,
            entropy: statistics::shannon_entropy(&self.histogram, self.values.len()),
            min_entropy: statistics::min_entropy(&self.histogram, self.values.len()),
        }
    }

    /// Z-score of the value at `index`.
    pub fn to_normal(&self, index: usize) -> Option<f64> {
        let stats = self.stats();
        if stats.deviation == 0.0 {
            return None;
        }
        self.values
            .get(index)
            .map(|&v| (f64::from(v) - stats.mean) / stats.deviation)
    }

    /// Largest value count representable by the sample's whole bits of
    /// min-entropy, `2^floor(min_entropy)`.
    pub fn max_value(&self) -> f64 {
        self.stats().min_entropy.floor().exp2()
    }
}

impl std::fmt::Debug for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sample")
            .field("len", &self.values.len())
            .field("width", &self.width)
            .field("mean", &format!("{:.4}", self.mean))
            .field("zero_runs_removed", &format!("{:.2}%", self.zero_runs_removed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn noisy(len: usize) -> Vec<i32> {
        (0..len).map(|i| ((i * 7 + 3) % 11) as i32 - 5).collect()
    }

    #[test]
    fn test_interior_run_of_ten_removed() {
        let mut values = vec![1, -2, 3];
        values.extend(std::iter::repeat(0).take(10));
        values.extend([4, -5, 6]);

        let sample = Sample::new(values, 4);
        assert_eq!(sample.len(), 6);
        assert_eq!(sample.values(), &[1, -2, 3, 4, -5, 6]);
        assert!((sample.zero_runs_removed() - 62.5).abs() < 1e-9);
        assert_eq!(sample.histogram()[ZERO_SLOT], 0);
    }

    #[test]
    fn test_run_at_threshold_preserved() {
        let mut values = vec![1];
        values.extend(std::iter::repeat(0).take(7));
        values.push(2);

        let sample = Sample::new(values.clone(), 3);
        assert_eq!(sample.values(), values.as_slice());
        assert_eq!(sample.zero_runs_removed(), 0.0);
    }

    #[test]
    fn test_trailing_run_removed() {
        let mut values = vec![5, -5];
        values.extend(std::iter::repeat(0).take(8));

        let sample = Sample::new(values, 2);
        assert_eq!(sample.values(), &[5, -5]);
    }

    #[test]
    fn test_mean_is_pre_removal() {
        let mut values = vec![4];
        values.extend(std::iter::repeat(0).take(15));

        let sample = Sample::new(values, 4);
        assert!((sample.mean() - 0.25).abs() < 1e-12);
        assert!((sample.stats().mean - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_stats() {
        let sample = Sample::new(vec![-2, -1, 0, 1, 2, 0, 0, 0], 4);
        let stats = sample.stats();

        assert_eq!(stats.mean, 0.0);
        assert!((stats.variance - 10.0 / 8.0).abs() < 1e-12);
        assert!((stats.deviation - (10.0f64 / 8.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.min, -2);
        assert_eq!(stats.max, 2);

        // p(0) = 1/2, four others at 1/8: H = 0.5 + 4 * 3/8 = 2
        assert!((stats.entropy - 2.0).abs() < 1e-12);
        assert!((stats.min_entropy - 1.0).abs() < 1e-12);
        assert_eq!(sample.max_value(), 2.0);
    }

    #[test]
    fn test_stats_cached_until_reset() {
        let mut sample = Sample::new(noisy(100), 10);
        let first = *sample.stats();
        assert_eq!(*sample.stats(), first);

        sample.reset_stats();
        assert_eq!(*sample.stats(), first);
    }

    #[test]
    fn test_empty_sample() {
        let sample = Sample::new(Vec::new(), 8);
        assert!(sample.is_empty());
        assert_eq!(sample.get(3, SampleOrder::Reverse), 0);
        assert_eq!(*sample.stats(), SampleStats::default());
        assert!(sample.to_normal(0).is_none());
    }

    #[test]
    fn test_get_orders() {
        let sample = Sample::new((1..=6).collect(), 3);
        assert_eq!(sample.get(0, SampleOrder::Direct), 1);
        assert_eq!(sample.get(0, SampleOrder::Reverse), 6);
        assert_eq!(sample.get(1, SampleOrder::Orthogonal), 3);
        assert_eq!(sample.get(7, SampleOrder::Direct), 2);
    }

    #[test]
    fn test_to_normal() {
        let sample = Sample::new(vec![-1, 1, -1, 1], 2);
        assert!((sample.to_normal(1).unwrap() - 1.0).abs() < 1e-12);
        assert!((sample.to_normal(0).unwrap() + 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_short_runs_untouched(
            pieces in proptest::collection::vec((1i32..50, 0usize..=7), 1..40)
        ) {
            let mut values = Vec::new();
            for (v, zeros) in pieces {
                values.push(v);
                values.extend(std::iter::repeat(0).take(zeros));
            }
            let sample = Sample::new(values.clone(), 5);
            prop_assert_eq!(sample.values(), values.as_slice());
        }

        #[test]
        fn prop_no_long_zero_run_survives(
            pieces in proptest::collection::vec((-20i32..20, 0usize..30), 1..40)
        ) {
            let mut values = Vec::new();
            for (v, zeros) in pieces {
                values.push(v);
                values.extend(std::iter::repeat(0).take(zeros));
            }
            let sample = Sample::new(values, 5);
            let mut run = 0;
            for &v in sample.values() {
                run = if v == 0 { run + 1 } else { 0 };
                prop_assert!(run <= DEFAULT_ZERO_RUN_THRESHOLD);
            }
        }
    }
}
