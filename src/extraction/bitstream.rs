//! Bit-packing output buffer.
//!
//! Variable-width encoder output is appended least significant bit first
//! into a zero-filled byte array. `position` counts completed bytes and
//! `bit_position` the bits already used in the byte at `position`.

use crate::config::MIN_BUFFER_CAPACITY;

pub struct BitBuffer {
    data: Vec<u8>,
    position: usize,
    bit_position: u8,
}

impl BitBuffer {
    /// Creates a buffer of at least `capacity` bytes, all zero.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.max(MIN_BUFFER_CAPACITY)],
            position: 0,
            bit_position: 0,
        }
    }

    /// Completed bytes.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bits used in the current partial byte, always `< 8`.
    #[inline]
    pub fn bit_position(&self) -> u8 {
        self.bit_position
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Appends the low `width` bits of `bits`.
    pub fn push_bits(&mut self, bits: u32, width: u8) {
        if width == 0 {
            return;
        }
        let width = width.min(32);
        let mask = if width == 32 { u32::MAX } else { (1u32 << width) - 1 };

        // At most 7 + 32 bits in flight
        let mut acc = u64::from(bits & mask) << self.bit_position;
        let mut filled = self.bit_position + width;

        self.data[self.position] |= acc as u8;
        while filled >= 8 {
            acc >>= 8;
            filled -= 8;
            self.position += 1;
            self.ensure_headroom();
            self.data[self.position] = acc as u8;
        }
        self.bit_position = filled;
    }

    /// Grows by half once the write cursor passes 90% of capacity.
    fn ensure_headroom(&mut self) {
        let capacity = self.data.len();
        if self.position >= capacity - capacity / 10 {
            let grown = capacity + capacity / 2;
            tracing::debug!(from = capacity, to = grown, "Growing bit buffer");
            self.data.resize(grown, 0);
        }
    }

    /// Completed bytes, oldest first.
    pub fn completed(&self) -> &[u8] {
        &self.data[..self.position]
    }

    /// Removes the first `count` completed bytes and shifts the rest,
    /// including the partial byte, to the front.
    ///
    /// `count` is capped at `position`.
    pub fn take_front(&mut self, count: usize) -> Vec<u8> {
        let count = count.min(self.position);
        let capacity = self.data.len();
        let taken: Vec<u8> = self.data.drain(..count).collect();
        self.data.resize(capacity, 0);
        self.position -= count;
        taken
    }

    /// Zeroes the buffer and resets both cursors.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.position = 0;
        self.bit_position = 0;
    }
}

impl std::fmt::Debug for BitBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitBuffer")
            .field("capacity", &self.data.len())
            .field("position", &self.position)
            .field("bit_position", &self.bit_position)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_packs_lsb_first() {
        let mut buffer = BitBuffer::with_capacity(64);
        buffer.push_bits(0b101, 3);
        buffer.push_bits(0b11, 2);
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.bit_position(), 5);

        buffer.push_bits(0b110, 3);
        assert_eq!(buffer.position(), 1);
        assert_eq!(buffer.bit_position(), 0);
        assert_eq!(buffer.completed(), &[0b1101_1101]);
    }

    #[test]
    fn test_crosses_byte_boundaries() {
        let mut buffer = BitBuffer::with_capacity(64);
        buffer.push_bits(0xF, 4);
        buffer.push_bits(0xABCDE, 20);
        assert_eq!(buffer.position(), 3);
        assert_eq!(buffer.completed(), &[0xEF, 0xCD, 0xAB]);
    }

    #[test]
    fn test_high_bits_masked() {
        let mut buffer = BitBuffer::with_capacity(64);
        buffer.push_bits(0xFF, 2);
        buffer.push_bits(0, 6);
        assert_eq!(buffer.completed(), &[0b11]);
    }

    #[test]
    fn test_zero_width_is_noop() {
        let mut buffer = BitBuffer::with_capacity(64);
        buffer.push_bits(0xFFFF, 0);
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.bit_position(), 0);
    }

    #[test]
    fn test_minimum_capacity() {
        assert_eq!(BitBuffer::with_capacity(1).capacity(), MIN_BUFFER_CAPACITY);
    }

    #[test]
    fn test_growth_preserves_bytes() {
        let mut buffer = BitBuffer::with_capacity(100);
        let mut capacities = vec![buffer.capacity()];
        for i in 0..200u32 {
            buffer.push_bits(i & 0xFF, 8);
            if buffer.capacity() != capacities[capacities.len() - 1] {
                capacities.push(buffer.capacity());
            }
        }

        // Each step adds half, triggered at 90% of the old capacity
        assert_eq!(capacities, vec![100, 150, 225]);
        for pair in capacities.windows(2) {
            assert_eq!(pair[1] * 2, pair[0] * 3);
        }
        let expected: Vec<u8> = (0..200u32).map(|i| i as u8).collect();
        assert_eq!(buffer.completed(), expected.as_slice());
    }

    #[test]
    fn test_take_front_keeps_partial_byte() {
        let mut buffer = BitBuffer::with_capacity(64);
        buffer.push_bits(0xBBAA, 16);
        buffer.push_bits(0b101, 3);

        assert_eq!(buffer.take_front(1), vec![0xAA]);
        assert_eq!(buffer.position(), 1);
        assert_eq!(buffer.bit_position(), 3);
        assert_eq!(buffer.completed(), &[0xBB]);
        assert_eq!(buffer.capacity(), 64);

        buffer.push_bits(0b11111, 5);
        assert_eq!(buffer.completed(), &[0xBB, 0b1111_1101]);
    }

    #[test]
    fn test_take_front_caps_at_position() {
        let mut buffer = BitBuffer::with_capacity(64);
        buffer.push_bits(0x1234, 16);
        assert_eq!(buffer.take_front(10).len(), 2);
        assert_eq!(buffer.position(), 0);
    }

    #[test]
    fn test_clear() {
        let mut buffer = BitBuffer::with_capacity(64);
        buffer.push_bits(0x3FF, 10);
        buffer.clear();
        assert_eq!(buffer.position(), 0);
        assert_eq!(buffer.bit_position(), 0);
        buffer.push_bits(0, 8);
        assert_eq!(buffer.completed(), &[0]);
    }

    proptest! {
        #[test]
        fn prop_bit_count_conserved(widths in proptest::collection::vec(0u8..=32, 0..300)) {
            let mut buffer = BitBuffer::with_capacity(64);
            let mut total = 0usize;
            for &w in &widths {
                buffer.push_bits(u32::MAX, w);
                total += usize::from(w);
            }
            prop_assert_eq!(buffer.position() * 8 + usize::from(buffer.bit_position()), total);
            prop_assert!(buffer.completed().iter().all(|&b| b == 0xFF));
        }
    }
}
