//! Closed-form relations between price moves, liquidity and token amounts.
//!
//! For a move between square-root prices `a < b` under liquidity `L`:
//!   token0 delta = `L·(b − a)/(a·b)` (equivalently `L·(1/a − 1/b)`)
//!   token1 delta = `L·(b − a)`
//! Amounts owed by the trader round up, amounts paid out round down; every
//! function takes the direction explicitly.

use super::errors::{ErrorKind, Result};
use crate::ensure_here;
use crate::fp::Rounding;
use crate::ledger::{Amount, Liquidity, SqrtPrice};

/// Token0 amount corresponding to a price move across `[sqrt_a, sqrt_b]`.
pub fn amount0_delta(
    sqrt_a: SqrtPrice,
    sqrt_b: SqrtPrice,
    liquidity: Liquidity,
    rounding: Rounding,
) -> Amount {
    debug_assert!(sqrt_a <= sqrt_b);
    let numerator = liquidity.mul_round(sqrt_b - sqrt_a, rounding);
    // The denominator rounds the other way so the quotient stays on the
    // requested side of the exact value.
    let denominator = sqrt_a.mul_round(sqrt_b, rounding.opposite());
    numerator.div_round(denominator, rounding)
}

/// Token1 amount corresponding to a price move across `[sqrt_a, sqrt_b]`.
pub fn amount1_delta(
    sqrt_a: SqrtPrice,
    sqrt_b: SqrtPrice,
    liquidity: Liquidity,
    rounding: Rounding,
) -> Amount {
    debug_assert!(sqrt_a <= sqrt_b);
    liquidity.mul_round(sqrt_b - sqrt_a, rounding)
}

/// Price after consuming `amount_in` of the input token.
///
/// Rounds toward the starting price, so the step never claims more progress
/// than the input actually pays for.
pub fn next_sqrt_price_from_input(
    sqrt_price: SqrtPrice,
    liquidity: Liquidity,
    amount_in: Amount,
    zero_for_one: bool,
) -> SqrtPrice {
    if zero_for_one {
        // 1/√Q = 1/√P + in/L  ⇒  √Q = L·√P / (L + in·√P), rounded up
        let numerator = liquidity.mul_round(sqrt_price, Rounding::Up);
        let denominator = liquidity + amount_in.mul_round(sqrt_price, Rounding::Down);
        numerator.div_round(denominator, Rounding::Up)
    } else {
        // √Q = √P + in/L, rounded down
        sqrt_price + amount_in.div_round(liquidity, Rounding::Down)
    }
}

/// Price after releasing `amount_out` of the output token.
///
/// Rounds away from the starting price, so the pool has moved far enough to
/// actually owe the requested output.
pub fn next_sqrt_price_from_output(
    sqrt_price: SqrtPrice,
    liquidity: Liquidity,
    amount_out: Amount,
    zero_for_one: bool,
) -> Result<SqrtPrice> {
    if zero_for_one {
        // token1 flows out: √Q = √P − out/L
        let shift = amount_out.div_round(liquidity, Rounding::Up);
        sqrt_price
            .checked_sub(shift)
            .ok_or_else(|| crate::error_here!(ErrorKind::InsufficientPoolLiquidity))
    } else {
        // token0 flows out: √Q = L·√P / (L − out·√P)
        let scaled_out = amount_out.mul_round(sqrt_price, Rounding::Up);
        ensure_here!(scaled_out < liquidity, ErrorKind::InsufficientPoolLiquidity);
        let numerator = liquidity.mul_round(sqrt_price, Rounding::Up);
        Ok(numerator.div_round(liquidity - scaled_out, Rounding::Up))
    }
}

/// Liquidity funded by `amount0` of token0 across `[sqrt_a, sqrt_b]`.
/// Rounds down so the derived position never claims more than was paid.
pub fn liquidity_from_amount0(
    sqrt_a: SqrtPrice,
    sqrt_b: SqrtPrice,
    amount0: Amount,
) -> Liquidity {
    debug_assert!(sqrt_a < sqrt_b);
    amount0
        .mul_round(sqrt_a.mul_round(sqrt_b, Rounding::Down), Rounding::Down)
        .div_round(sqrt_b - sqrt_a, Rounding::Down)
}

/// Liquidity funded by `amount1` of token1 across `[sqrt_a, sqrt_b]`.
pub fn liquidity_from_amount1(
    sqrt_a: SqrtPrice,
    sqrt_b: SqrtPrice,
    amount1: Amount,
) -> Liquidity {
    debug_assert!(sqrt_a < sqrt_b);
    amount1.div_round(sqrt_b - sqrt_a, Rounding::Down)
}
