//! Conversions between ticks and square-root prices.
//!
//! `tick_to_sqrt_price` multiplies, over the set bits of |tick|, the
//! precomputed Q128.128 values of `sqrt(1.0001)^(2^k)`, then takes the
//! reciprocal for negative ticks. The inverse is a bisection over the tick
//! range: the conversion is strictly monotone (the fixed-point resolution
//! leaves ~50 bits of headroom below the 0.005% tick-to-tick gap), so
//! `sqrt_price_to_tick(tick_to_sqrt_price(t)) == t` holds across the whole
//! range.

use bitvec::prelude::*;
use itertools::Itertools;

use super::errors::ErrorKind;
use super::tick::Tick;
use crate::fp::{U128X128, U256};
use crate::ledger::SqrtPrice;

/// `sqrt(1.0001)^(2^k)` for `k = 0..20`, rounded to nearest at Q128.128.
///
/// 2^19 is enough: |tick| never exceeds 887272 < 2^20. Derived with 90-digit
/// decimal arithmetic by repeated squaring of sqrt(1.0001).
#[allow(clippy::unreadable_literal)]
const SQRT_BASE_POWERS: [U256; 20] = [
    U256([0xe55ad00f5c38565c, 0x000346d6ff11672a, 0x0000000000000001, 0x0000000000000000]),
    U256([0x295e9e1b089a0275, 0x00068db8bac710cb, 0x0000000000000001, 0x0000000000000000]),
    U256([0x6b30fb7581b74fb8, 0x000d1b9c68abe5f7, 0x0000000000000001, 0x0000000000000000]),
    U256([0x30516e519450a146, 0x001a37e4a234cb08, 0x0000000000000001, 0x0000000000000000]),
    U256([0xa25ab46019279f90, 0x00347278ab0e92ad, 0x0000000000000001, 0x0000000000000000]),
    U256([0xa5d7fdc2ccf5998f, 0x0068efb00a525480, 0x0000000000000001, 0x0000000000000000]),
    U256([0xdf9daaa568442ce5, 0x00d20a63b4173839, 0x0000000000000001, 0x0000000000000000]),
    U256([0x9738df5e966396f0, 0x01a4c11c742dd772, 0x0000000000000001, 0x0000000000000000]),
    U256([0xdc0d6de43d0881d3, 0x034c35c31f64cfa6, 0x0000000000000001, 0x0000000000000000]),
    U256([0x81bed5a32b0fce74, 0x06a34b78c8aaffbf, 0x0000000000000001, 0x0000000000000000]),
    U256([0x9ae771b16294a7eb, 0x0d72a6a46ccd8bce, 0x0000000000000001, 0x0000000000000000]),
    U256([0xdc757faa33154df7, 0x1b9a258e63928596, 0x0000000000000001, 0x0000000000000000]),
    U256([0x3cd17be5c343d452, 0x3a2e2bda04f8379f, 0x0000000000000001, 0x0000000000000000]),
    U256([0x77f2ab42e87cf512, 0x81954be69e0da8fe, 0x0000000000000001, 0x0000000000000000]),
    U256([0x8025287709061f74, 0x44c2655d185a0290, 0x0000000000000002, 0x0000000000000000]),
    U256([0x616779e807e264b2, 0x25816eeb9f935b1c, 0x0000000000000005, 0x0000000000000000]),
    U256([0xd31ae06501b81fa8, 0x7c8d00b551684ff4, 0x000000000000001a, 0x0000000000000000]),
    U256([0x590c66cde3d18ca0, 0x893d0b2df7c97884, 0x00000000000002bd, 0x0000000000000000]),
    U256([0x2152dccf4128f29e, 0xe1e19e448cf8b95d, 0x0000000000078278, 0x0000000000000000]),
    U256([0x3a21b785e9f303f8, 0x57501416feade319, 0x00000038651b58d4, 0x0000000000000000]),
];

/// `(1.0001^tick)^½` as Q128.128.
pub fn tick_to_sqrt_price(tick: Tick) -> SqrtPrice {
    let product = tick
        .index()
        .unsigned_abs()
        .view_bits::<Lsb0>()
        .iter_ones()
        .map(|index| U128X128(SQRT_BASE_POWERS[index]))
        .product1()
        .unwrap_or_else(U128X128::one);
    if tick.index() >= 0 {
        product
    } else {
        product.recip()
    }
}

pub fn min_sqrt_price() -> SqrtPrice {
    tick_to_sqrt_price(Tick::MIN)
}

pub fn max_sqrt_price() -> SqrtPrice {
    tick_to_sqrt_price(Tick::MAX)
}

/// Largest tick whose sqrt price does not exceed `sqrt_price`.
pub fn sqrt_price_to_tick(sqrt_price: SqrtPrice) -> Result<Tick, ErrorKind> {
    if sqrt_price < min_sqrt_price() || sqrt_price > max_sqrt_price() {
        return Err(ErrorKind::SqrtPriceOutOfRange);
    }
    let (mut low, mut high) = (Tick::MIN.index(), Tick::MAX.index());
    while low < high {
        let mid = low + (high - low + 1) / 2;
        // mid stays within bounds, so the construction cannot fail
        if tick_to_sqrt_price(Tick::new(mid)?) <= sqrt_price {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Tick::new(low)
}
