//! Spatial decorrelation via index permutation.
//!
//! Neighbouring pixels of a camera image are correlated. When a batch
//! combines values from several samples, each sample slot is read in a
//! different order so that no two values of one tuple come from the same
//! neighbourhood.

/// Read order for one sample slot of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOrder {
    /// Identity: `i`.
    Direct,
    /// Mirror from the end: `count - 1 - i`.
    Reverse,
    /// Transposed walk over the `width x height` grid:
    /// `height * (i mod width) + i / width`.
    Orthogonal,
}

impl SampleOrder {
    const ALL: [SampleOrder; 3] = [
        SampleOrder::Direct,
        SampleOrder::Reverse,
        SampleOrder::Orthogonal,
    ];

    /// Order used for the sample at `position` within a batch.
    #[inline]
    pub fn for_position(position: usize) -> Self {
        Self::ALL[position % Self::ALL.len()]
    }

    /// Maps `index` into `[0, count)`.
    ///
    /// Out-of-range indices wrap modulo `count` before and after the
    /// permutation. `count` must be non-zero.
    #[inline]
    pub fn index(self, index: usize, count: usize, width: usize) -> usize {
        debug_assert!(count > 0);
        let width = width.max(1);
        let i = index % count;
        let mapped = match self {
            SampleOrder::Direct => i,
            SampleOrder::Reverse => count - 1 - i,
            SampleOrder::Orthogonal => {
                let height = count / width;
                height * (i % width) + i / width
            }
        };
        mapped % count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_position_cycles_orders() {
        assert_eq!(SampleOrder::for_position(0), SampleOrder::Direct);
        assert_eq!(SampleOrder::for_position(1), SampleOrder::Reverse);
        assert_eq!(SampleOrder::for_position(2), SampleOrder::Orthogonal);
        assert_eq!(SampleOrder::for_position(3), SampleOrder::Direct);
        assert_eq!(SampleOrder::for_position(11), SampleOrder::Orthogonal);
    }

    #[test]
    fn test_reverse_mirrors() {
        assert_eq!(SampleOrder::Reverse.index(0, 10, 5), 9);
        assert_eq!(SampleOrder::Reverse.index(9, 10, 5), 0);
    }

    #[test]
    fn test_out_of_range_wraps() {
        assert_eq!(SampleOrder::Direct.index(13, 10, 5), 3);
        assert_eq!(SampleOrder::Reverse.index(10, 10, 5), 9);
    }

    #[test]
    fn test_orthogonal_small_grid() {
        // 3 x 2 grid:   0 1 2
        //               3 4 5
        let walk: Vec<usize> = (0..6)
            .map(|i| SampleOrder::Orthogonal.index(i, 6, 3))
            .collect();
        assert_eq!(walk, vec![0, 2, 4, 1, 3, 5]);
    }

    proptest! {
        #[test]
        fn prop_orthogonal_is_bijection(width in 1usize..40, height in 1usize..40) {
            let count = width * height;
            let mut seen = vec![false; count];
            for i in 0..count {
                let j = SampleOrder::Orthogonal.index(i, count, width);
                prop_assert_eq!(j, height * (i % width) + i / width);
                prop_assert!(!seen[j]);
                seen[j] = true;
            }
            prop_assert!(seen.iter().all(|&s| s));
        }

        #[test]
        fn prop_every_order_stays_in_range(
            index in 0usize..10_000,
            count in 1usize..500,
            width in 0usize..50,
        ) {
            for order in SampleOrder::ALL {
                prop_assert!(order.index(index, count, width) < count);
            }
        }
    }
}
