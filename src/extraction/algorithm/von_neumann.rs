//! Recursive Von Neumann encoder.
//!
//! Each raw value is quantized to `bits_per_value` bits and a fixed number
//! of values is read per call. The von Neumann reduction of a bit string is
//! a pure function of that string, so the output for every possible input
//! sequence is computed once into a lookup table and encoding becomes a
//! single index computation.
//!
//! The reduction is the iterated form of von Neumann's trick (Peres):
//! for each bit pair, `01 -> 1` and `10 -> 0`; equal pairs contribute
//! their bit to a second string, and every pair contributes "equal or not"
//! to a third string; both are reduced recursively. The output is unbiased
//! for any stationary bias of independent input bits.
//! See <http://www.eecs.harvard.edu/~michaelm/coinflipext.pdf>.

use super::EncodedBits;
use crate::config::MAX_BITS_PER_VALUE;
use std::sync::OnceLock;

/// Values consumed per call, indexed by bits per value. Keeps the largest
/// table at 2^20 entries.
const DEPTH_PER_BITS: [usize; 9] = [8, 8, 8, 6, 5, 4, 3, 2, 1];

type ConversionTable = Vec<EncodedBits>;

#[allow(clippy::declare_interior_mutable_const)]
const UNBUILT: OnceLock<ConversionTable> = OnceLock::new();

/// One table per quantization width, shared by every encoder.
static TABLES: [OnceLock<ConversionTable>; 9] = [UNBUILT; 9];

/// Von Neumann encoder over quantized values.
#[derive(Clone)]
pub struct VonNeumannEncoder {
    bits_per_value: u8,
    depth: usize,
    table: &'static [EncodedBits],
}

impl VonNeumannEncoder {
    /// Creates an encoder, building the shared table on first use.
    ///
    /// `bits_per_value` is clamped to `1..=8`.
    pub fn new(bits_per_value: u8) -> Self {
        let bits = bits_per_value.clamp(1, MAX_BITS_PER_VALUE);
        if bits != bits_per_value {
            tracing::warn!(requested = bits_per_value, used = bits, "bits_per_value clamped");
        }
        let depth = DEPTH_PER_BITS[bits as usize];
        let table = TABLES[bits as usize].get_or_init(|| build_table(bits, depth));

        Self {
            bits_per_value: bits,
            depth,
            table,
        }
    }

    /// Quantization width.
    pub fn bits_per_value(&self) -> u8 {
        self.bits_per_value
    }

    /// Values consumed per encode call.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Batch size the collector should assemble.
    pub fn minimal_batch_size(&self) -> usize {
        self.depth
    }

    #[inline]
    fn radix(&self) -> usize {
        1 << self.bits_per_value
    }

    #[inline]
    fn quantize(&self, value: i32) -> usize {
        value.rem_euclid(self.radix() as i32) as usize
    }

    /// Mixed-radix position of the first `depth` values, first value most
    /// significant.
    fn sequence_index(&self, values: &[i32]) -> usize {
        values[..self.depth]
            .iter()
            .fold(0, |index, &v| index * self.radix() + self.quantize(v))
    }

    /// Encodes the first `depth` values; shorter batches produce nothing.
    pub fn encode(&self, values: &[i32]) -> EncodedBits {
        if values.len() < self.depth {
            return EncodedBits::EMPTY;
        }
        self.table[self.sequence_index(values)]
    }
}

impl std::fmt::Debug for VonNeumannEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VonNeumannEncoder")
            .field("bits_per_value", &self.bits_per_value)
            .field("depth", &self.depth)
            .field("table_entries", &self.table.len())
            .finish()
    }
}

fn build_table(bits: u8, depth: usize) -> ConversionTable {
    let radix = 1usize << bits;
    let entries = radix.pow(depth as u32);
    let started = std::time::Instant::now();

    let mut table = Vec::with_capacity(entries);
    let mut sequence = Vec::with_capacity(usize::from(bits) * depth);
    let mut output = Vec::with_capacity(usize::from(bits) * depth);

    for index in 0..entries {
        sequence.clear();
        for position in (0..depth as u32).rev() {
            let digit = (index / radix.pow(position)) % radix;
            sequence.extend((0..bits).rev().map(|bit| (digit >> bit) & 1 == 1));
        }

        output.clear();
        reduce(&sequence, &mut output);
        table.push(pack(&output));
    }

    tracing::debug!(
        bits,
        depth,
        entries,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Built Von Neumann conversion table"
    );
    table
}

/// Recursive von Neumann reduction of `input`, appended to `output`.
fn reduce(input: &[bool], output: &mut Vec<bool>) {
    let pairs = input.len() / 2;
    let mut equal = Vec::with_capacity(pairs);
    let mut parity = Vec::with_capacity(pairs);

    for pair in input.chunks_exact(2) {
        let (a, b) = (pair[0], pair[1]);
        if a != b {
            output.push(b);
        } else {
            equal.push(a);
        }
        parity.push(a == b);
    }

    if equal.len() >= 2 {
        reduce(&equal, output);
    }
    if parity.len() >= 2 {
        reduce(&parity, output);
    }
}

/// First output bit goes to the least significant position.
fn pack(bits: &[bool]) -> EncodedBits {
    debug_assert!(bits.len() <= 32);
    let value = bits
        .iter()
        .enumerate()
        .filter(|&(_, &bit)| bit)
        .fold(0u32, |acc, (i, _)| acc | (1 << i));
    EncodedBits::new(value, bits.len() as u8)
}
