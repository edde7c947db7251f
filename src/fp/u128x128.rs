//! Unsigned binary fixed point with 128 integer and 128 fractional bits.
//!
//! This is the value type for every quantity on the pricing path: token
//! amounts, square-root prices, liquidity and fee-growth accumulators.
//! Addition and subtraction are exact; multiplication and division drop
//! bits below the 2^-128 resolution, and every such operation routes the
//! dropped tail through one place, [`round_tail`], under an explicit
//! [`Rounding`] choice. Arithmetic that cannot represent its result panics
//! (the ledger host aborts the request), checked conversions return
//! [`Error`].

use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::iter::{Product, Sum};
use std::ops;

use super::{Error, Rounding, U256, U512};

#[derive(Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize, Deserialize)]
pub struct U128X128(pub U256);

/// Resolves an inexact operation: `floored` is the result truncated at
/// 2^-128, `inexact` says whether anything was truncated at all.
fn round_tail(floored: U256, inexact: bool, rounding: Rounding) -> U128X128 {
    match rounding {
        Rounding::Up if inexact => match floored.checked_add(U256::one()) {
            Some(bumped) => U128X128(bumped),
            None => panic!("{}", Error::Overflow),
        },
        _ => U128X128(floored),
    }
}

/// Splits a raw representation into its 128-bit halves, each returned in a
/// full-width word so products of halves never overflow.
fn halves(raw: U256) -> (U256, U256) {
    (raw >> 128, raw & ((U256::one() << 128) - 1))
}

fn spread(raw: U256) -> U512 {
    let mut words = [0u64; 8];
    words[..4].copy_from_slice(&raw.0);
    U512(words)
}

/// Whether anything lives below the binary point of a raw representation.
fn has_fraction_bits(raw: U256) -> bool {
    raw.0[0] != 0 || raw.0[1] != 0
}

impl U128X128 {
    pub const fn zero() -> Self {
        U128X128(U256([0, 0, 0, 0]))
    }

    pub fn one() -> Self {
        U128X128(U256::one() << 128)
    }

    pub fn fract(self) -> Self {
        U128X128(self.0 & ((U256::one() << 128) - 1))
    }

    pub fn floor(self) -> Self {
        U128X128(self.0 >> 128 << 128)
    }

    pub fn ceil(self) -> Self {
        if self.fract().is_zero() {
            self
        } else {
            self.floor() + Self::one()
        }
    }

    /// Square root of the represented value.
    ///
    /// The integer square root of `v·2^128` carries a 2^64 scale, so one
    /// half-word shift restores the 2^128 fixed point:
    /// `isqrt(v·2^128)·2^64 = ⌊√v⌋·2^128` up to the integer-sqrt floor.
    pub fn integer_sqrt(self) -> Self {
        U128X128(self.0.integer_sqrt() << 64)
    }

    /// Multiplication with an explicit rounding of the 2^-128 tail.
    ///
    /// Worked on 128-bit halves so nothing wider than 256 bits is ever
    /// multiplied: with `A = Ah·2^128 + Al` and likewise `B`,
    ///
    /// ```text
    /// A·B/2^128 = Ah·Bh·2^128 + Ah·Bl + Al·Bh + Al·Bl/2^128
    /// ```
    ///
    /// Only the last term can carry fractional bits; its low half is the
    /// truncated tail. The result overflows iff `Ah·Bh` leaves the low 128
    /// bits or one of the running additions wraps.
    pub fn mul_round(self, rhs: Self, rounding: Rounding) -> Self {
        let (a_hi, a_lo) = halves(self.0);
        let (b_hi, b_lo) = halves(rhs.0);

        let head = a_hi * b_hi;
        assert!(head.bits() <= 128, "{}", Error::Overflow);
        let tail = a_lo * b_lo;
        let inexact = has_fraction_bits(tail);

        let mut floored = head << 128;
        for term in [a_hi * b_lo, a_lo * b_hi, tail >> 128] {
            floored = match floored.checked_add(term) {
                Some(sum) => sum,
                None => panic!("{}", Error::Overflow),
            };
        }
        round_tail(floored, inexact, rounding)
    }

    /// Division with an explicit rounding of the 2^-128 tail.
    ///
    /// The dividend is pre-scaled by 2^128 into 512 bits, so the quotient
    /// comes out on the fixed-point scale and the remainder directly tells
    /// whether the division was exact.
    pub fn div_round(self, rhs: Self, rounding: Rounding) -> Self {
        assert!(!rhs.is_zero(), "division by zero");
        let scaled = spread(self.0) << 128;
        let (quotient, remainder) = scaled.div_mod(spread(rhs.0));
        assert!(quotient.bits() <= 256, "{}", Error::Overflow);
        let floored = U256([quotient.0[0], quotient.0[1], quotient.0[2], quotient.0[3]]);
        round_tail(floored, !remainder.is_zero(), rounding)
    }

    pub fn recip(self) -> Self {
        Self::one() / self
    }

    pub fn recip_round(self, rounding: Rounding) -> Self {
        Self::one().div_round(self, rounding)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        if self >= rhs {
            Some(U128X128(self.0 - rhs.0))
        } else {
            None
        }
    }

    pub fn saturating_sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs).unwrap_or_else(Self::zero)
    }
}

impl From<u128> for U128X128 {
    fn from(value: u128) -> Self {
        U128X128(U256::from(value) << 128)
    }
}

impl From<u64> for U128X128 {
    fn from(value: u64) -> Self {
        Self::from(u128::from(value))
    }
}

impl From<U128X128> for u128 {
    fn from(value: U128X128) -> u128 {
        (value.0 >> 128).low_u128()
    }
}

impl ops::Add for U128X128 {
    type Output = Self;

    fn add(self, rhs: U128X128) -> Self {
        U128X128(self.0 + rhs.0)
    }
}

impl ops::AddAssign for U128X128 {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl ops::Sub for U128X128 {
    type Output = Self;

    fn sub(self, rhs: U128X128) -> Self {
        U128X128(self.0 - rhs.0)
    }
}

impl ops::SubAssign for U128X128 {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl ops::Mul for U128X128 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.mul_round(rhs, Rounding::Down)
    }
}

impl ops::Div for U128X128 {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self.div_round(rhs, Rounding::Down)
    }
}

impl Sum for U128X128 {
    fn sum<I: Iterator<Item = U128X128>>(iter: I) -> Self {
        iter.fold(U128X128::zero(), ops::Add::add)
    }
}

impl Product for U128X128 {
    fn product<I: Iterator<Item = U128X128>>(iter: I) -> Self {
        iter.fold(U128X128::one(), ops::Mul::mul)
    }
}

impl Zero for U128X128 {
    fn zero() -> Self {
        U128X128::zero()
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(int: u128, num: u128, den: u128) -> U128X128 {
        U128X128::from(int) + U128X128::from(num) / U128X128::from(den)
    }

    #[test]
    fn mul_rounds_in_requested_direction() {
        let third = U128X128::from(1u128) / U128X128::from(3u128);
        let down = third.mul_round(U128X128::from(3u128), Rounding::Down);
        let up = third.mul_round(U128X128::from(3u128), Rounding::Up);
        assert!(down < U128X128::one());
        assert_eq!(up, U128X128::one());
        assert_eq!(up.0 - down.0, U256::one());
    }

    #[test]
    fn exact_products_ignore_the_rounding_mode() {
        let a = fx(2, 1, 2);
        let b = fx(0, 1, 4);
        assert_eq!(
            a.mul_round(b, Rounding::Down),
            a.mul_round(b, Rounding::Up)
        );
        assert_eq!(a.mul_round(b, Rounding::Down), fx(0, 5, 8));
    }

    #[test]
    fn halved_multiply_mixes_integer_and_fraction_terms() {
        // Both operands exercise all four half-products.
        let a = fx(1_000_000_007, 3, 7);
        let b = fx(12_345, 1, 3);
        let product = a.mul_round(b, Rounding::Down);
        // bracket against the coarse integer bound
        assert!(product > U128X128::from(1_000_000_007u128 * 12_345));
        assert!(product < U128X128::from(1_000_000_008u128 * 12_346));
    }

    #[test]
    fn div_round_up_exceeds_floor_only_on_remainder() {
        let v = U128X128::from(10u128);
        assert_eq!(
            v.div_round(U128X128::from(2u128), Rounding::Up),
            U128X128::from(5u128)
        );
        let up = v.div_round(U128X128::from(3u128), Rounding::Up);
        let down = v.div_round(U128X128::from(3u128), Rounding::Down);
        assert_eq!(up.0 - down.0, U256::one());
    }

    #[test]
    fn multiply_then_divide_reconstructs_the_value() {
        let value = fx(77_789, 999_499, 1_000_000);
        let factor = fx(0, 1_664_222, 100_000_000);
        let back = value.mul_round(factor, Rounding::Down) / factor;
        // Both floors shave low bits; the loss stays far below 2^-64.
        let diff = value - back;
        assert!(diff.0 <= U256::from(3u64) << 64);
    }

    #[test]
    fn sqrt_of_squares_is_exact() {
        for n in [1u128, 2, 144, 10_000, 1 << 40] {
            assert_eq!(U128X128::from(n * n).integer_sqrt(), U128X128::from(n));
        }
    }

    #[test]
    fn floor_ceil_fract_split() {
        let v = fx(7, 1, 2);
        assert_eq!(v.floor(), U128X128::from(7u128));
        assert_eq!(v.ceil(), U128X128::from(8u128));
        assert_eq!(v.floor() + v.fract(), v);
    }

    #[test]
    #[should_panic(expected = "Numeric overflow")]
    fn mul_overflow_panics() {
        let big = U128X128(U256::MAX);
        let _ = big.mul_round(big, Rounding::Down);
    }

    #[test]
    #[should_panic(expected = "Numeric overflow")]
    fn div_overflow_panics() {
        let huge = U128X128(U256::MAX);
        let tiny = U128X128(U256::one());
        let _ = huge.div_round(tiny, Rounding::Down);
    }
}
