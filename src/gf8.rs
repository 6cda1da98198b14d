//! GF(2^3) field arithmetic.
//!
//! Elements are integers in `[0, 7]` representing polynomials over GF(2)
//! reduced modulo `x^3 + x + 1`. Addition and subtraction are both XOR;
//! multiplication goes through a fixed 8x8 table.
//!
//! The `a * b + c` primitive and its recursive triple reduction are the
//! building blocks of the ABC extractor (Barak, Impagliazzo, Wigderson,
//! "Extracting randomness using few independent sources").

use crate::extraction::ExtractionError;

/// Number of field elements.
pub const ORDER: usize = 8;

/// Multiplication table, `MUL[a][b] = a * b`.
const MUL: [[u8; ORDER]; ORDER] = [
    [0, 0, 0, 0, 0, 0, 0, 0], // 0
    [0, 1, 2, 3, 4, 5, 6, 7], // 1
    [0, 2, 4, 6, 3, 1, 7, 5], // x
    [0, 3, 6, 5, 7, 4, 1, 2], // x + 1
    [0, 4, 3, 7, 6, 2, 5, 1], // x^2
    [0, 5, 1, 4, 2, 7, 3, 6], // x^2 + 1
    [0, 6, 7, 1, 5, 3, 2, 4], // x^2 + x
    [0, 7, 5, 2, 1, 6, 4, 3], // x^2 + x + 1
];

/// Materialised `a * b + c` for every triple, indexed by `a * 64 + b * 8 + c`.
static ABC_LOOKUP: [u8; ORDER * ORDER * ORDER] = build_abc_lookup();

const fn build_abc_lookup() -> [u8; ORDER * ORDER * ORDER] {
    let mut table = [0u8; ORDER * ORDER * ORDER];
    let mut i = 0;
    while i < table.len() {
        let a = (i >> 6) as u8;
        let b = ((i >> 3) & 7) as u8;
        let c = (i & 7) as u8;
        table[i] = abc(a, b, c);
        i += 1;
    }
    table
}

/// Field addition (XOR).
#[inline]
pub const fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Field subtraction, identical to addition in characteristic 2.
#[inline]
pub const fn sub(a: u8, b: u8) -> u8 {
    add(a, b)
}

/// Field multiplication.
///
/// Operands are taken modulo 8.
#[inline]
pub const fn mul(a: u8, b: u8) -> u8 {
    let (a, b) = (a & 7, b & 7);
    match (a, b) {
        (0, _) | (_, 0) => 0,
        (1, x) | (x, 1) => x,
        _ => MUL[a as usize][b as usize],
    }
}

/// Single extractor step `a * b + c`.
#[inline]
pub const fn abc(a: u8, b: u8, c: u8) -> u8 {
    add(mul(a, b), c & 7)
}

/// Table-driven `a * b + c`. Always equal to [`abc`].
#[inline]
pub fn abc_lookup(a: u8, b: u8, c: u8) -> u8 {
    let index = (usize::from(a & 7) << 6) | (usize::from(b & 7) << 3) | usize::from(c & 7);
    ABC_LOOKUP[index]
}

/// Runs one reduction level: every consecutive triple becomes one element.
///
/// A trailing group of one or two elements is discarded.
pub fn reduce_once(values: &[u8]) -> Vec<u8> {
    values
        .chunks_exact(3)
        .map(|t| abc_lookup(t[0], t[1], t[2]))
        .collect()
}

fn reduce_in_place(values: &mut Vec<u8>) {
    let groups = values.len() / 3;
    for i in 0..groups {
        values[i] = abc_lookup(values[3 * i], values[3 * i + 1], values[3 * i + 2]);
    }
    values.truncate(groups);
}

/// Reduces `values` level by level until a single element remains.
///
/// Inputs shorter than three elements cannot be reduced and yield
/// [`ExtractionError::InsufficientInput`].
pub fn reduce(values: &[u8]) -> Result<u8, ExtractionError> {
    if values.len() < 3 {
        return Err(ExtractionError::InsufficientInput {
            needed: 3,
            got: values.len(),
        });
    }

    let mut level = values.to_vec();
    while level.len() >= 3 {
        reduce_in_place(&mut level);
    }

    level
        .first()
        .copied()
        .ok_or(ExtractionError::InsufficientInput {
            needed: 3,
            got: values.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Carry-less multiply reduced by x^3 + x + 1.
    fn poly_mul(a: u8, b: u8) -> u8 {
        let mut product: u8 = 0;
        for bit in 0..3 {
            if b & (1 << bit) != 0 {
                product ^= a << bit;
            }
        }
        for bit in (3..5).rev() {
            if product & (1 << bit) != 0 {
                product ^= 0b1011 << (bit - 3);
            }
        }
        product
    }

    #[test]
    fn test_table_matches_polynomial_multiplication() {
        for a in 0..8u8 {
            for b in 0..8u8 {
                assert_eq!(mul(a, b), poly_mul(a, b), "{} * {}", a, b);
            }
        }
    }

    #[test]
    fn test_multiplication_commutes() {
        for a in 0..8u8 {
            for b in 0..8u8 {
                assert_eq!(mul(a, b), mul(b, a));
            }
        }
    }

    #[test]
    fn test_every_nonzero_element_has_inverse() {
        for a in 1..8u8 {
            assert!((1..8u8).any(|b| mul(a, b) == 1), "no inverse for {}", a);
        }
    }

    #[test]
    fn test_lookup_matches_direct_abc() {
        for a in 0..8u8 {
            for b in 0..8u8 {
                for c in 0..8u8 {
                    assert_eq!(abc_lookup(a, b, c), abc(a, b, c));
                }
            }
        }
    }

    #[test]
    fn test_reduce_once_known_vectors() {
        let numbers: Vec<u8> = (0..=7).collect();
        // 0 * 1 + 2 = 2, 3 * 4 + 5 = 7 ^ 5 = 2, trailing [6, 7] dropped
        assert_eq!(reduce_once(&numbers), vec![2, 2]);

        let mut numbers: Vec<u8> = (0..=7).rev().collect();
        numbers.push(7);
        assert_eq!(reduce_once(&numbers), vec![1, 5, 7]);
        assert_eq!(reduce_once(&[1, 5, 7]), vec![2]);
        assert_eq!(reduce(&numbers).unwrap(), 2);
    }

    #[test]
    fn test_reduce_short_input_fails() {
        for len in 0..3 {
            let values = vec![1u8; len];
            assert!(matches!(
                reduce(&values),
                Err(ExtractionError::InsufficientInput { needed: 3, got }) if got == len
            ));
        }
    }

    #[test]
    fn test_reduce_exact_power_of_three() {
        let values: Vec<u8> = (0..27).map(|i| (i * 5 % 8) as u8).collect();
        let level1 = reduce_once(&values);
        let level2 = reduce_once(&level1);
        let level3 = reduce_once(&level2);
        assert_eq!(level3.len(), 1);
        assert_eq!(reduce(&values).unwrap(), level3[0]);
    }

    proptest! {
        #[test]
        fn prop_distributive_over_add(a in 0u8..8, b in 0u8..8, c in 0u8..8) {
            prop_assert_eq!(mul(a, add(b, c)), add(mul(a, b), mul(a, c)));
        }

        #[test]
        fn prop_distributive_over_sub(a in 0u8..8, b in 0u8..8, c in 0u8..8) {
            prop_assert_eq!(mul(a, sub(b, c)), sub(mul(a, b), mul(a, c)));
        }

        #[test]
        fn prop_reduce_stays_in_field(values in proptest::collection::vec(0u8..8, 3..400)) {
            let element = reduce(&values).unwrap();
            prop_assert!(element < 8);
        }
    }
}
