//! Temporal decorrelation via frame differencing.
//!
//! The static scene cancels out when two consecutive frames are
//! subtracted; what remains in each color channel is sensor noise. One
//! pass over the pixels produces the three channel samples together with
//! their histograms and means.

use super::{sample::HISTOGRAM_SLOTS, ExtractionError, Sample};
use crate::capture::{Channel, Frame};

/// Differences two frames into `[red, green, blue]` samples with
/// `value[i] = left[i] - right[i]`.
pub fn difference(left: &Frame, right: &Frame) -> Result<[Sample; 3], ExtractionError> {
    if !left.is_compatible(right) {
        return Err(ExtractionError::IncompatibleFrames {
            left: (left.width(), left.height(), left.pixels().len()),
            right: (right.width(), right.height(), right.pixels().len()),
        });
    }

    let size = left.pixels().len();
    let mut values: [Vec<i32>; 3] = std::array::from_fn(|_| Vec::with_capacity(size));
    let mut histograms: [Vec<u32>; 3] = std::array::from_fn(|_| vec![0u32; HISTOGRAM_SLOTS]);
    let mut sums = [0i64; 3];

    for (&pl, &pr) in left.pixels().iter().zip(right.pixels()) {
        for (c, channel) in Channel::ALL.into_iter().enumerate() {
            let diff = i32::from(channel.of(pl)) - i32::from(channel.of(pr));
            values[c].push(diff);
            sums[c] += i64::from(diff);
            // Zero difference lands in slot 255
            histograms[c][(diff + 255) as usize] += 1;
        }
    }

    let width = left.width() as usize;
    let mut values = values.into_iter();
    let mut histograms = histograms.into_iter();
    Ok(std::array::from_fn(|c| {
        let mean = if size == 0 { 0.0 } else { sums[c] as f64 / size as f64 };
        Sample::from_difference(
            values.next().unwrap_or_default(),
            width,
            histograms.next().unwrap_or_default(),
            mean,
        )
    }))
}

/// Computes differences between consecutive frames.
///
/// This reduces static patterns (dead pixels, fixed noise) and
/// emphasizes temporal changes in the optical signal.
#[derive(Debug, Default)]
pub struct TemporalDifferencer {
    /// Previous frame for differencing.
    previous: Option<Frame>,
}

impl TemporalDifferencer {
    pub fn new() -> Self {
        Self { previous: None }
    }

    /// Differences `current` against the previous frame.
    ///
    /// Returns `None` on the first frame. The current frame always becomes
    /// the reference for the next call, even when the pair is incompatible.
    pub fn difference(&mut self, current: Frame) -> Option<Result<[Sample; 3], ExtractionError>> {
        let result = self
            .previous
            .as_ref()
            .map(|previous| difference(&current, previous));

        self.previous = Some(current);

        result
    }

    /// Resets the differencer state.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Returns true if ready to produce output.
    pub fn is_primed(&self) -> bool {
        self.previous.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::pack_rgb;

    fn solid(r: u8, g: u8, b: u8, sequence: u64) -> Frame {
        Frame::new(vec![pack_rgb(r, g, b); 64], 8, 8, sequence)
    }

    #[test]
    fn test_channel_differences() {
        let left = solid(100, 20, 255, 2);
        let right = solid(90, 30, 0, 1);

        let [r, g, b] = difference(&left, &right).unwrap();
        assert!(r.values().iter().all(|&v| v == 10));
        assert!(g.values().iter().all(|&v| v == -10));
        assert!(b.values().iter().all(|&v| v == 255));
        assert_eq!(r.mean(), 10.0);
        assert_eq!(g.mean(), -10.0);
        assert_eq!(g.histogram()[245], 64);
        assert_eq!(r.width(), 8);
    }

    #[test]
    fn test_identical_frames_become_empty() {
        // Every channel is one 64-long zero run, removed as an artifact
        let [r, g, b] = difference(&solid(7, 7, 7, 2), &solid(7, 7, 7, 1)).unwrap();
        for sample in [r, g, b] {
            assert!(sample.is_empty());
            assert_eq!(sample.zero_runs_removed(), 100.0);
            assert_eq!(sample.mean(), 0.0);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let left = Frame::new(vec![0; 64], 8, 8, 1);
        let right = Frame::new(vec![0; 64], 16, 4, 2);

        assert!(matches!(
            difference(&left, &right),
            Err(ExtractionError::IncompatibleFrames { .. })
        ));
    }

    #[test]
    fn test_first_frame_returns_none() {
        let mut diff = TemporalDifferencer::new();

        assert!(diff.difference(solid(1, 1, 1, 1)).is_none());
        assert!(diff.is_primed());
    }

    #[test]
    fn test_second_frame_returns_difference() {
        let mut diff = TemporalDifferencer::new();

        diff.difference(solid(100, 100, 100, 1));
        let [r, _, _] = diff.difference(solid(150, 100, 100, 2)).unwrap().unwrap();

        assert!(r.values().iter().all(|&v| v == 50));
    }

    #[test]
    fn test_incompatible_frame_replaces_reference() {
        let mut diff = TemporalDifferencer::new();

        diff.difference(solid(1, 1, 1, 1));
        let odd = Frame::new(vec![0; 16], 4, 4, 2);
        assert!(diff.difference(odd).unwrap().is_err());

        let next = Frame::new(vec![pack_rgb(3, 0, 0); 16], 4, 4, 3);
        let [r, _, _] = diff.difference(next).unwrap().unwrap();
        assert!(r.values().iter().all(|&v| v == 3));
    }

    #[test]
    fn test_reset_requires_new_prime() {
        let mut diff = TemporalDifferencer::new();

        diff.difference(solid(1, 1, 1, 1));
        assert!(diff.is_primed());

        diff.reset();
        assert!(!diff.is_primed());
    }
}
