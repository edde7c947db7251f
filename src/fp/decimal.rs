//! Decimal bridge for the fixed-point types.
//!
//! The ledger surface speaks decimal strings; the engine computes in binary
//! fixed point. Parsing rounds to the nearest representable value, rendering
//! rounds half-up at the requested number of places, so any literal with at
//! most [`MAX_DECIMAL_PLACES`] fractional digits round-trips exactly.

use std::fmt;

use num_traits::Zero;

use super::{Error, I128X128, U128X128, U256, U512};

/// Widest fractional literal accepted; 10^38 still fits 127 bits.
pub const MAX_DECIMAL_PLACES: usize = 38;

fn pow10(places: usize) -> U256 {
    let mut value = U256::one();
    for _ in 0..places {
        value = value * U256::from(10u64);
    }
    value
}

fn widen(value: U256) -> U512 {
    U512([
        value.0[0], value.0[1], value.0[2], value.0[3], 0, 0, 0, 0,
    ])
}

impl U128X128 {
    /// Parse a non-negative decimal literal such as `"151.714011"`.
    pub fn from_decimal_str(text: &str) -> Result<Self, Error> {
        let text = text.trim();
        if text.is_empty() || text.starts_with('-') || text.starts_with('+') {
            return Err(Error::BadDecimal);
        }
        let (int_text, frac_text) = match text.split_once('.') {
            Some((i, f)) => (i, f),
            None => (text, ""),
        };
        if int_text.is_empty() && frac_text.is_empty() {
            return Err(Error::BadDecimal);
        }
        if !int_text.chars().all(|c| c.is_ascii_digit())
            || !frac_text.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::BadDecimal);
        }
        if frac_text.len() > MAX_DECIMAL_PLACES {
            return Err(Error::PrecisionLoss);
        }

        let int_part = if int_text.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(int_text).map_err(|_| Error::BadDecimal)?
        };
        if int_part.bits() > 128 {
            return Err(Error::Overflow);
        }

        let frac_raw = if frac_text.is_empty() {
            U256::zero()
        } else {
            let digits = U256::from_dec_str(frac_text).map_err(|_| Error::BadDecimal)?;
            let denominator = pow10(frac_text.len());
            // Round to nearest so rendering at the same width restores the
            // original digits.
            let numerator =
                (widen(digits) << 128) + widen(denominator >> 1);
            let quotient = numerator / widen(denominator);
            U256([quotient.0[0], quotient.0[1], quotient.0[2], quotient.0[3]])
        };

        Ok(U128X128((int_part << 128) + frac_raw))
    }

    /// Render with exactly `places` fractional digits, rounding half-up.
    pub fn to_decimal_string(self, places: usize) -> String {
        assert!(places <= MAX_DECIMAL_PLACES);
        let mut int_part = U256([0, 0, self.0 .0[2], self.0 .0[3]]) >> 128;
        if places == 0 {
            // Half-up on the dropped fraction.
            if self.fract().0 >= (U256::one() << 127) {
                int_part = int_part + U256::one();
            }
            return int_part.to_string();
        }
        let scale = pow10(places);
        let scaled = widen(self.fract().0) * widen(scale) + (U512::one() << 127);
        let digits512 = scaled >> 128;
        let mut digits = (u128::from(digits512.0[1]) << 64) | u128::from(digits512.0[0]);
        let scale_u128 = (u128::from(scale.0[1]) << 64) | u128::from(scale.0[0]);
        if digits >= scale_u128 {
            int_part = int_part + U256::one();
            digits -= scale_u128;
        }
        format!("{}.{:0width$}", int_part, digits, width = places)
    }

    /// True when the value rounds down to zero at `places` decimal places,
    /// i.e. `value < 10^-places`. This is the reference's `f8`-style guard.
    pub fn is_zero_dp(self, places: usize) -> bool {
        assert!(places <= MAX_DECIMAL_PLACES);
        (widen(self.0) * widen(pow10(places))) >> 128 == U512::zero()
    }
}

impl fmt::Display for U128X128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = self.to_decimal_string(MAX_DECIMAL_PLACES);
        let trimmed = full.trim_end_matches('0').trim_end_matches('.');
        f.write_str(if trimmed.is_empty() { "0" } else { trimmed })
    }
}

impl fmt::Debug for U128X128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl I128X128 {
    pub fn from_decimal_str(text: &str) -> Result<Self, Error> {
        let text = text.trim();
        match text.strip_prefix('-') {
            Some(rest) => Ok(Self::negative(U128X128::from_decimal_str(rest)?)),
            None => Ok(Self::from(U128X128::from_decimal_str(text)?)),
        }
    }

    pub fn to_decimal_string(self, places: usize) -> String {
        let rendered = self.abs().to_decimal_string(places);
        if self.is_negative() {
            format!("-{rendered}")
        } else {
            rendered
        }
    }
}

impl fmt::Display for I128X128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            f.write_str("-")?;
        }
        fmt::Display::fmt(&self.abs(), f)
    }
}

impl fmt::Debug for I128X128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fp::I128X128;

    #[test]
    fn parse_render_round_trip() {
        for text in [
            "0",
            "1",
            "151.714011",
            "0.01664222241481084743",
            "77789.999499306764803261",
            "340282366920938463463374607431768211455",
        ] {
            let value = U128X128::from_decimal_str(text).unwrap();
            let places = text.split_once('.').map_or(0, |(_, f)| f.len());
            assert_eq!(value.to_decimal_string(places), text, "round trip of {text}");
        }
    }

    #[test]
    fn display_trims_trailing_zeros() {
        let value = U128X128::from_decimal_str("2.5000").unwrap();
        assert_eq!(value.to_string(), "2.5");
        assert_eq!(U128X128::zero().to_string(), "0");
    }

    #[test]
    fn rejects_malformed_literals() {
        assert!(U128X128::from_decimal_str("").is_err());
        assert!(U128X128::from_decimal_str("-1").is_err());
        assert!(U128X128::from_decimal_str("1.2.3").is_err());
        assert!(U128X128::from_decimal_str("12a").is_err());
    }

    #[test]
    fn effectively_zero_guard() {
        let dust = U128X128::from_decimal_str("0.000000001").unwrap();
        assert!(dust.is_zero_dp(8));
        assert!(!dust.is_zero_dp(9));
        let exact = U128X128::from_decimal_str("0.00000001").unwrap();
        assert!(!exact.is_zero_dp(8));
        assert!(U128X128::zero().is_zero_dp(0));
    }

    #[test]
    fn signed_parse_and_render() {
        let value = I128X128::from_decimal_str("-0.04199688").unwrap();
        assert!(value.is_negative());
        assert_eq!(value.to_decimal_string(8), "-0.04199688");
        assert_eq!(
            I128X128::from_decimal_str("3.5").unwrap().to_string(),
            "3.5"
        );
        // "-0" parses to canonical zero.
        assert!(!I128X128::from_decimal_str("-0").unwrap().is_negative());
    }
}
