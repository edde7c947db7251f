use serde::{Deserialize, Serialize};

use super::errors::ErrorKind;
use crate::ledger::BasisPoints;

/// Maximum value for price tick
pub const MAX_TICK: i32 = 887_272;
/// Minimum value for price tick
pub const MIN_TICK: i32 = -887_272;

/// A point on the price scale; the spot price at tick `t` is `1.0001^t`.
#[derive(
    Copy, Clone, Debug, Default, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Tick(i32);

impl Tick {
    pub const MIN: Self = Self(MIN_TICK);
    pub const MAX: Self = Self(MAX_TICK);

    pub fn new(value: i32) -> Result<Self, ErrorKind> {
        if Self::is_valid(value) {
            Ok(Self(value))
        } else {
            Err(ErrorKind::TickOutOfRange)
        }
    }

    pub const fn is_valid(value: i32) -> bool {
        MIN_TICK <= value && value <= MAX_TICK
    }

    pub const fn index(&self) -> i32 {
        self.0
    }

    /// Position bounds and bitmap positions sit on multiples of the pool
    /// tick spacing only.
    pub fn is_aligned(&self, tick_spacing: u16) -> bool {
        self.0 % i32::from(tick_spacing) == 0
    }
}

/// The closed set of supported fee tiers, in units of 1/10000.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum FeeTier {
    Bps5,
    Bps30,
    Bps100,
}

impl FeeTier {
    pub const ALL: [FeeTier; 3] = [FeeTier::Bps5, FeeTier::Bps30, FeeTier::Bps100];

    pub fn from_basis_points(fee: BasisPoints) -> Result<Self, ErrorKind> {
        match fee {
            5 => Ok(FeeTier::Bps5),
            30 => Ok(FeeTier::Bps30),
            100 => Ok(FeeTier::Bps100),
            _ => Err(ErrorKind::InvalidFeeTier),
        }
    }

    pub fn basis_points(self) -> BasisPoints {
        match self {
            FeeTier::Bps5 => 5,
            FeeTier::Bps30 => 30,
            FeeTier::Bps100 => 100,
        }
    }

    /// The fixed tier→spacing mapping.
    pub fn tick_spacing(self) -> u16 {
        match self {
            FeeTier::Bps5 => 10,
            FeeTier::Bps30 => 60,
            FeeTier::Bps100 => 200,
        }
    }
}

impl TryFrom<u16> for FeeTier {
    type Error = ErrorKind;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_basis_points(value)
    }
}

impl From<FeeTier> for u16 {
    fn from(tier: FeeTier) -> u16 {
        tier.basis_points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[test]
    fn bounds_are_enforced() {
        assert!(Tick::new(MAX_TICK).is_ok());
        assert!(Tick::new(MIN_TICK).is_ok());
        assert_matches!(Tick::new(MAX_TICK + 1), Err(ErrorKind::TickOutOfRange));
        assert_matches!(Tick::new(MIN_TICK - 1), Err(ErrorKind::TickOutOfRange));
    }

    #[rstest]
    #[case(5, 10)]
    #[case(30, 60)]
    #[case(100, 200)]
    fn tier_spacing_mapping(#[case] fee: u16, #[case] spacing: u16) {
        assert_eq!(
            FeeTier::from_basis_points(fee).unwrap().tick_spacing(),
            spacing
        );
    }

    #[test]
    fn unsupported_tier_is_rejected() {
        assert_matches!(FeeTier::from_basis_points(50), Err(ErrorKind::InvalidFeeTier));
    }

    #[test]
    fn alignment_respects_sign() {
        assert!(Tick::new(-120).unwrap().is_aligned(60));
        assert!(!Tick::new(-130).unwrap().is_aligned(60));
    }
}
