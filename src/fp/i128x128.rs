//! Signed companion of [`U128X128`].
//!
//! Negative quantities appear in exactly two places — per-tick net
//! liquidity and the relative fee-growth-inside snapshots — so instead of
//! two's complement this is a magnitude plus a sign flag over the unsigned
//! type. The type maintains one invariant everywhere: a zero magnitude is
//! never stored as negative. That keeps equality and hashing derivable and
//! spares every comparison a special case for "-0".

use std::cmp::Ordering;
use std::iter::Sum;
use std::ops;

use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::{Error, U128X128};

/// Signed Q128.128 in sign-magnitude form.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSigned", into = "RawSigned")]
pub struct I128X128 {
    magnitude: U128X128,
    negative: bool,
}

/// Wire form; re-normalized on the way in so foreign data cannot break the
/// no-negative-zero invariant.
#[derive(Clone, Serialize, Deserialize)]
struct RawSigned {
    magnitude: U128X128,
    negative: bool,
}

impl From<RawSigned> for I128X128 {
    fn from(raw: RawSigned) -> Self {
        Self::from_parts(raw.magnitude, raw.negative)
    }
}

impl From<I128X128> for RawSigned {
    fn from(value: I128X128) -> Self {
        RawSigned {
            magnitude: value.magnitude,
            negative: value.negative,
        }
    }
}

impl I128X128 {
    pub fn from_parts(magnitude: U128X128, negative: bool) -> Self {
        Self {
            magnitude,
            negative: negative && !magnitude.is_zero(),
        }
    }

    pub fn negative(magnitude: U128X128) -> Self {
        Self::from_parts(magnitude, true)
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn abs(self) -> U128X128 {
        self.magnitude
    }

    /// -1, 0 or +1.
    fn signum(&self) -> i8 {
        match (self.magnitude.is_zero(), self.negative) {
            (true, _) => 0,
            (false, true) => -1,
            (false, false) => 1,
        }
    }

    pub fn try_into_unsigned(self) -> Result<U128X128, Error> {
        if self.negative {
            Err(Error::NegativeToUnsigned)
        } else {
            Ok(self.magnitude)
        }
    }
}

impl From<U128X128> for I128X128 {
    fn from(magnitude: U128X128) -> Self {
        Self {
            magnitude,
            negative: false,
        }
    }
}

impl ops::Neg for I128X128 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_parts(self.magnitude, !self.negative)
    }
}

impl ops::Add for I128X128 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        if self.negative == rhs.negative {
            return Self {
                magnitude: self.magnitude + rhs.magnitude,
                negative: self.negative,
            };
        }
        // Opposite signs: the sum takes the sign of the larger magnitude,
        // and an exact cancellation lands on canonical zero.
        match self.magnitude.cmp(&rhs.magnitude) {
            Ordering::Greater => Self {
                magnitude: self.magnitude - rhs.magnitude,
                negative: self.negative,
            },
            Ordering::Less => Self {
                magnitude: rhs.magnitude - self.magnitude,
                negative: rhs.negative,
            },
            Ordering::Equal => Self::zero(),
        }
    }
}

impl ops::Sub for I128X128 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + -rhs
    }
}

impl ops::AddAssign for I128X128 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl ops::SubAssign for I128X128 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Ord for I128X128 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.signum().cmp(&other.signum()).then_with(|| {
            if self.negative {
                // both strictly negative: larger magnitude is further down
                other.magnitude.cmp(&self.magnitude)
            } else {
                self.magnitude.cmp(&other.magnitude)
            }
        })
    }
}

impl PartialOrd for I128X128 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Zero for I128X128 {
    fn zero() -> Self {
        Self {
            magnitude: U128X128::zero(),
            negative: false,
        }
    }

    fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }
}

impl Default for I128X128 {
    fn default() -> Self {
        Self::zero()
    }
}

impl Sum for I128X128 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), ops::Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(v: u128) -> I128X128 {
        I128X128::from(U128X128::from(v))
    }

    fn neg(v: u128) -> I128X128 {
        I128X128::negative(U128X128::from(v))
    }

    #[test]
    fn addition_follows_the_larger_magnitude() {
        assert_eq!(pos(5) + neg(3), pos(2));
        assert_eq!(pos(3) + neg(5), neg(2));
        assert_eq!(neg(3) + neg(4), neg(7));
        assert_eq!(pos(4) + pos(3), pos(7));
    }

    #[test]
    fn cancellation_produces_canonical_zero() {
        let sum = pos(5) + neg(5);
        assert!(sum.is_zero());
        assert!(!sum.is_negative());
        assert_eq!(sum, I128X128::zero());
    }

    #[test]
    fn negative_zero_is_unrepresentable() {
        assert!(!I128X128::negative(U128X128::zero()).is_negative());
        assert!(!(-I128X128::zero()).is_negative());
        assert_eq!(
            I128X128::from_parts(U128X128::zero(), true),
            I128X128::zero()
        );
    }

    #[test]
    fn subtraction_crosses_zero() {
        let mut acc = pos(2);
        acc -= pos(5);
        assert_eq!(acc, neg(3));
        acc += pos(3);
        assert!(acc.is_zero());
    }

    #[test]
    fn ordering_is_total_over_signs() {
        assert!(neg(2) < neg(1));
        assert!(neg(1) < I128X128::zero());
        assert!(I128X128::zero() < pos(1));
        assert!(pos(1) < pos(2));
        assert_eq!(neg(0).cmp(&pos(0)), Ordering::Equal);
    }

    #[test]
    fn sum_over_mixed_signs() {
        let total: I128X128 = [pos(10), neg(4), neg(6), pos(1)].into_iter().sum();
        assert_eq!(total, pos(1));
    }

    #[test]
    fn negative_to_unsigned_is_rejected() {
        assert!(neg(1).try_into_unsigned().is_err());
        assert_eq!(pos(7).try_into_unsigned().unwrap(), U128X128::from(7u128));
    }

    #[test]
    fn serde_round_trip_restores_the_invariant() {
        let json = serde_json::to_string(&neg(3)).unwrap();
        let back: I128X128 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, neg(3));
        // A hand-written negative zero normalizes on deserialization.
        let forged = r#"{"magnitude":[0,0,0,0],"negative":true}"#;
        let zero: I128X128 = serde_json::from_str(forged).unwrap();
        assert_eq!(zero, I128X128::zero());
        assert!(!zero.is_negative());
    }
}
