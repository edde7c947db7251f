//! Bit scans over 256-bit bitmap words.
//!
//! The words are big integers, not machine words, so both scans run as a
//! binary cascade over the thresholds {128, 64, 32, 16, 8, 4, 2, 1}.

use crate::fp::U256;

/// Returns index of the most significant non-zero bit of the word.
///
/// The function satisfies the property:
///     x >= 2**most_significant_bit(x) and x < 2**(most_significant_bit(x)+1)
///
/// For a zero word the result is 0; callers check emptiness first.
pub fn most_significant_bit(mut x: U256) -> u8 {
    let mut msb = 0u8;
    for shift in [128u32, 64, 32, 16, 8, 4, 2, 1] {
        if x >= (U256::one() << shift) {
            x = x >> shift;
            msb += shift as u8;
        }
    }
    msb
}

/// Returns index of the least significant non-zero bit of the word.
///
/// For a zero word the result is 255; callers check emptiness first.
pub fn least_significant_bit(mut x: U256) -> u8 {
    let mut lsb = 255u8;
    for shift in [128u32, 64, 32, 16, 8, 4, 2, 1] {
        let mask = (U256::one() << shift) - 1;
        if !(x & mask).is_zero() {
            x = x & mask;
            lsb -= shift as u8;
        }
    }
    lsb
}
