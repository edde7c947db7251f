//! The swap stepper.
//!
//! One swap walks the liquidity curve tick range by tick range: each step
//! finds the next initialized tick within one bitmap word, executes the
//! closed-form move against the active liquidity, skims fees, and crosses
//! the tick when the step actually reaches it. The loop is cooperative and
//! reports to the host every `steps_per_yield` steps.

use num_traits::Zero;

use super::errors::{ErrorKind, Result};
use super::sqrt_price_math::{
    amount0_delta, amount1_delta, next_sqrt_price_from_input, next_sqrt_price_from_output,
};
use super::state_types::PoolV0;
use super::tick::{Tick, MAX_TICK, MIN_TICK};
use super::tick_math::{max_sqrt_price, min_sqrt_price, sqrt_price_to_tick, tick_to_sqrt_price};
use crate::fp::Rounding;
use crate::ledger::{
    Amount, AmountSigned, BasisPoints, FeeGrowth, Liquidity, LiquidityNet, SqrtPrice,
    BASIS_POINT_DIVISOR,
};
use crate::{ensure_here, error_here};

/// Residual below 10^-8 counts as fully consumed; prevents dust from
/// spinning the loop.
const REMAINDER_DECIMALS: usize = 8;

/// Exact-input versus exact-output semantics of `amount_specified`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Exact {
    In,
    Out,
}

/// Capabilities the stepper needs from its host: crossing a stored tick
/// and the cooperative-yield checkpoint.
pub trait SwapHost {
    /// Applies `TickData::cross` to the stored record and returns its
    /// signed net liquidity.
    fn cross_tick(
        &mut self,
        tick: Tick,
        fee_growth_global: (FeeGrowth, FeeGrowth),
    ) -> Result<LiquidityNet>;

    /// Called after every yield chunk; the host may reschedule here. State
    /// between checkpoints is private to the request.
    fn checkpoint(&mut self);
}

/// One computed step against a price target.
struct SwapStep {
    sqrt_price_next: SqrtPrice,
    amount_in: Amount,
    amount_out: Amount,
    fee_amount: Amount,
}

/// Uniswap-style closed form for a single step.
///
/// If the remaining amount cannot carry the price all the way to `target`,
/// the new price is solved from the remainder; otherwise the step walks
/// exactly to `target`. The fee is charged in the input token.
fn compute_swap_step(
    sqrt_price_current: SqrtPrice,
    sqrt_price_target: SqrtPrice,
    liquidity: Liquidity,
    amount_remaining: Amount,
    fee: BasisPoints,
    exact_in: bool,
) -> Result<SwapStep> {
    let zero_for_one = sqrt_price_current >= sqrt_price_target;
    let fee_num = Amount::from(u128::from(fee));
    let fee_den = Amount::from(u128::from(BASIS_POINT_DIVISOR));

    let mut amount_in = Amount::zero();
    let mut amount_out = Amount::zero();
    let sqrt_price_next;
    if exact_in {
        let remaining_less_fee = amount_remaining
            .mul_round(fee_den - fee_num, Rounding::Down)
            .div_round(fee_den, Rounding::Down);
        amount_in = if zero_for_one {
            amount0_delta(sqrt_price_target, sqrt_price_current, liquidity, Rounding::Up)
        } else {
            amount1_delta(sqrt_price_current, sqrt_price_target, liquidity, Rounding::Up)
        };
        sqrt_price_next = if remaining_less_fee >= amount_in {
            sqrt_price_target
        } else {
            next_sqrt_price_from_input(
                sqrt_price_current,
                liquidity,
                remaining_less_fee,
                zero_for_one,
            )
        };
    } else {
        amount_out = if zero_for_one {
            amount1_delta(sqrt_price_target, sqrt_price_current, liquidity, Rounding::Down)
        } else {
            amount0_delta(sqrt_price_current, sqrt_price_target, liquidity, Rounding::Down)
        };
        sqrt_price_next = if amount_remaining >= amount_out {
            sqrt_price_target
        } else {
            next_sqrt_price_from_output(
                sqrt_price_current,
                liquidity,
                amount_remaining,
                zero_for_one,
            )?
        };
    }

    let reached_target = sqrt_price_target == sqrt_price_next;
    if zero_for_one {
        if !(reached_target && exact_in) {
            amount_in = amount0_delta(sqrt_price_next, sqrt_price_current, liquidity, Rounding::Up);
        }
        if !(reached_target && !exact_in) {
            amount_out =
                amount1_delta(sqrt_price_next, sqrt_price_current, liquidity, Rounding::Down);
        }
    } else {
        if !(reached_target && exact_in) {
            amount_in = amount1_delta(sqrt_price_current, sqrt_price_next, liquidity, Rounding::Up);
        }
        if !(reached_target && !exact_in) {
            amount_out =
                amount0_delta(sqrt_price_current, sqrt_price_next, liquidity, Rounding::Down);
        }
    }
    // Exact output never hands out more than was asked for.
    if !exact_in && amount_out > amount_remaining {
        amount_out = amount_remaining;
    }

    let fee_amount = if exact_in && !reached_target {
        // The step consumed the whole remainder; whatever the curve did not
        // absorb is the fee.
        amount_remaining.saturating_sub(amount_in)
    } else {
        amount_in
            .mul_round(fee_num, Rounding::Up)
            .div_round(fee_den - fee_num, Rounding::Up)
    };

    Ok(SwapStep {
        sqrt_price_next,
        amount_in,
        amount_out,
        fee_amount,
    })
}

impl PoolV0 {
    /// Executes a swap against the pool, mutating price, liquidity, fee
    /// growth and protocol fees in place.
    ///
    /// `amount_specified` is a magnitude; `exact` selects whether it bounds
    /// the input or the output token. Returns the signed `(amount0,
    /// amount1)` deltas from the pool's perspective: positive flows into
    /// the pool, negative flows out. A swap that reaches the price limit
    /// terminates normally with the residual unswapped.
    pub fn swap(
        &mut self,
        host: &mut dyn SwapHost,
        zero_for_one: bool,
        exact: Exact,
        amount_specified: Amount,
        sqrt_price_limit: SqrtPrice,
        steps_per_yield: u32,
    ) -> Result<(AmountSigned, AmountSigned)> {
        ensure_here!(!amount_specified.is_zero(), ErrorKind::InvalidParams);
        if zero_for_one {
            ensure_here!(
                sqrt_price_limit < self.sqrt_price && sqrt_price_limit >= min_sqrt_price(),
                ErrorKind::SqrtPriceOutOfRange
            );
        } else {
            ensure_here!(
                sqrt_price_limit > self.sqrt_price && sqrt_price_limit <= max_sqrt_price(),
                ErrorKind::SqrtPriceOutOfRange
            );
        }

        let exact_in = exact == Exact::In;
        let spacing = self.tick_spacing();
        let fee = self.fee_tier.basis_points();
        let chunk = steps_per_yield.max(1);

        let mut remaining = amount_specified;
        let mut calculated = Amount::zero();
        let mut sqrt_price = self.sqrt_price;
        let mut tick_index = self.current_tick()?.index();
        let mut liquidity = self.liquidity;
        let mut fee_growth_global_in = if zero_for_one {
            self.fee_growth_global.0
        } else {
            self.fee_growth_global.1
        };
        let mut protocol_fee_accrued = Amount::zero();
        let mut steps = 0u32;

        while !remaining.is_zero_dp(REMAINDER_DECIMALS) && sqrt_price != sqrt_price_limit {
            let (next_raw, initialised) = self.bitmap.next_initialised_tick_within_one_word(
                tick_index,
                spacing,
                zero_for_one,
            );
            ensure_here!(
                (MIN_TICK..=MAX_TICK).contains(&next_raw),
                ErrorKind::InsufficientPoolLiquidity
            );
            let next_tick = Tick::new(next_raw).map_err(|e| error_here!(e))?;
            let sqrt_price_next = tick_to_sqrt_price(next_tick);
            let target = if zero_for_one {
                sqrt_price_next.max(sqrt_price_limit)
            } else {
                sqrt_price_next.min(sqrt_price_limit)
            };

            let step = compute_swap_step(sqrt_price, target, liquidity, remaining, fee, exact_in)?;
            let sqrt_price_start = sqrt_price;
            sqrt_price = step.sqrt_price_next;

            if exact_in {
                remaining = remaining.saturating_sub(step.amount_in + step.fee_amount);
                calculated += step.amount_out;
            } else {
                remaining = remaining.saturating_sub(step.amount_out);
                calculated += step.amount_in + step.fee_amount;
            }

            let mut fee_amount = step.fee_amount;
            if !self.protocol_fee_fraction.is_zero() {
                let protocol_cut =
                    fee_amount.mul_round(self.protocol_fee_fraction, Rounding::Down);
                fee_amount -= protocol_cut;
                protocol_fee_accrued += protocol_cut;
            }
            if !liquidity.is_zero() {
                fee_growth_global_in += fee_amount.div_round(liquidity, Rounding::Down);
            }

            if sqrt_price == sqrt_price_next {
                if initialised {
                    // The crossed side sees the hot in-token accumulator;
                    // the other side keeps the stored global.
                    let globals = if zero_for_one {
                        (fee_growth_global_in, self.fee_growth_global.1)
                    } else {
                        (self.fee_growth_global.0, fee_growth_global_in)
                    };
                    let mut net = host.cross_tick(next_tick, globals)?;
                    if zero_for_one {
                        net = -net;
                    }
                    liquidity = if net.is_negative() {
                        liquidity
                            .checked_sub(net.abs())
                            .ok_or_else(|| error_here!(ErrorKind::InternalLogicError))?
                    } else {
                        liquidity + net.abs()
                    };
                }
                tick_index = if zero_for_one { next_raw - 1 } else { next_raw };
            } else if sqrt_price != sqrt_price_start {
                tick_index = sqrt_price_to_tick(sqrt_price)
                    .map_err(|e| error_here!(e))?
                    .index();
            }

            steps += 1;
            if steps % chunk == 0 {
                host.checkpoint();
            }
        }

        self.sqrt_price = sqrt_price;
        self.liquidity = liquidity;
        if zero_for_one {
            self.fee_growth_global.0 = fee_growth_global_in;
            self.protocol_fees.0 += protocol_fee_accrued;
        } else {
            self.fee_growth_global.1 = fee_growth_global_in;
            self.protocol_fees.1 += protocol_fee_accrued;
        }

        let consumed = amount_specified - remaining;
        let signed = |value: Amount| AmountSigned::from(value);
        let negated = |value: Amount| -AmountSigned::from(value);
        Ok(match (zero_for_one, exact_in) {
            (true, true) => (signed(consumed), negated(calculated)),
            (true, false) => (signed(calculated), negated(consumed)),
            (false, true) => (negated(calculated), signed(consumed)),
            (false, false) => (negated(consumed), signed(calculated)),
        })
    }
}
