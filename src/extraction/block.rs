//! Delivered entropy blocks.

/// One block of extracted bytes that passed the quality gate.
#[derive(Clone)]
pub struct EntropyBlock {
    /// Extracted byte data.
    data: Vec<u8>,
    /// Delivery sequence number, starting at 1.
    sequence: u64,
    /// Chi-square statistic the block was accepted with.
    chi_square: f64,
}

impl EntropyBlock {
    pub fn from_bytes(data: Vec<u8>, sequence: u64, chi_square: f64) -> Self {
        Self {
            data,
            sequence,
            chi_square,
        }
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn bit_count(&self) -> usize {
        self.data.len() * 8
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline]
    pub fn chi_square(&self) -> f64 {
        self.chi_square
    }

    /// Counts the number of set bits.
    pub fn popcount(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Bit bias as deviation from 0.5, in `[-0.5, 0.5]`.
    pub fn bit_bias(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let ones = self.popcount() as f64;
        let total = self.bit_count() as f64;
        (ones / total) - 0.5
    }

    /// BLAKE3 digest of the block, for logging and duplicate detection.
    pub fn fingerprint(&self) -> blake3::Hash {
        blake3::hash(&self.data)
    }
}

impl std::fmt::Debug for EntropyBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropyBlock")
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .field("chi_square", &format!("{:.2}", self.chi_square))
            .field("bit_bias", &format!("{:.4}", self.bit_bias()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbiased_data() {
        // Alternating bits: 0xAA = 10101010
        let block = EntropyBlock::from_bytes(vec![0xAA; 100], 1, 0.0);
        assert!(block.bit_bias().abs() < 0.001);
    }

    #[test]
    fn test_all_ones_bias() {
        let block = EntropyBlock::from_bytes(vec![0xFF; 100], 1, 0.0);
        assert!((block.bit_bias() - 0.5).abs() < 0.001);
        assert_eq!(block.popcount(), 800);
    }

    #[test]
    fn test_empty_block() {
        let block = EntropyBlock::from_bytes(Vec::new(), 3, 0.0);
        assert!(block.is_empty());
        assert_eq!(block.bit_bias(), 0.0);
        assert_eq!(block.sequence(), 3);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = EntropyBlock::from_bytes(vec![1, 2, 3], 1, 0.0);
        let b = EntropyBlock::from_bytes(vec![1, 2, 3], 2, 5.0);
        let c = EntropyBlock::from_bytes(vec![1, 2, 4], 1, 0.0);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
