//! Decorrelation window over pending samples.

use crate::extraction::Sample;
use std::collections::VecDeque;

/// Queue of accepted samples waiting to be combined into batches.
///
/// A batch pairs the sample at window index `i` with the one at
/// `delta + i`, so that values combined in one tuple come from frames far
/// enough apart in time.
#[derive(Debug)]
pub struct DecorrelationWindow {
    samples: VecDeque<Sample>,
    delta: usize,
}

impl DecorrelationWindow {
    pub fn new(delta: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(2 * delta + 8),
            delta,
        }
    }

    pub fn delta(&self) -> usize {
        self.delta
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
    }

    /// Effective offset for a batch of `half` pairs; never lets the two
    /// paired ranges overlap.
    fn effective_delta(&self, half: usize) -> usize {
        self.delta.max(half)
    }

    /// Assembles one batch of `2 * ceil(batch_size / 2)` samples.
    ///
    /// Returns `None` until the window holds more than
    /// `half + delta + 1` samples. Both consumed ranges leave the window.
    pub fn take_batch(&mut self, batch_size: usize) -> Option<Vec<Sample>> {
        let half = batch_size.max(1).div_ceil(2);
        let delta = self.effective_delta(half);
        if self.samples.len() <= half + delta + 1 {
            return None;
        }

        // Remove the later range first so the earlier indices stay valid
        let late: Vec<Sample> = self.samples.drain(delta..delta + half).collect();
        let early: Vec<Sample> = self.samples.drain(..half).collect();

        let mut batch = Vec::with_capacity(2 * half);
        for (a, b) in early.into_iter().zip(late) {
            batch.push(a);
            batch.push(b);
        }
        tracing::trace!(half, delta, remaining = self.samples.len(), "Batch assembled");
        Some(batch)
    }

    /// Drops every pending sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Changes the offset and clears the window.
    pub fn reconfigure(&mut self, delta: usize) {
        self.delta = delta;
        self.samples.clear();
        self.samples.reserve(2 * delta + 8);
    }
}
