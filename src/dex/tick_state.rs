//! Per-tick accumulator operations.

use num_traits::Zero;

use super::errors::{ErrorKind, Result};
use super::state_types::TickDataV0;
use super::tick::{Tick, MAX_TICK, MIN_TICK};
use crate::ledger::{AmountSigned, FeeGrowth, Liquidity, LiquidityNet};
use crate::{ensure_here, error_here};

/// Upper bound on `liquidity_gross` of a single tick: the full liquidity
/// range divided evenly over every aligned tick of the spacing.
pub fn max_liquidity_per_tick(tick_spacing: u16) -> Liquidity {
    let spacing = i32::from(tick_spacing);
    let min_tick = (MIN_TICK / spacing) * spacing;
    let max_tick = (MAX_TICK / spacing) * spacing;
    let count = ((max_tick - min_tick) / spacing + 1) as u128;
    crate::fp::U128X128(crate::fp::U256::MAX / crate::fp::U256::from(count))
}

impl TickDataV0 {
    pub fn new() -> Self {
        Self {
            liquidity_gross: Liquidity::zero(),
            liquidity_net: LiquidityNet::zero(),
            fee_growth_outside: (FeeGrowth::zero(), FeeGrowth::zero()),
            initialised: false,
        }
    }

    /// Applies a liquidity delta to this tick as the `upper` or lower bound
    /// of a position range.
    ///
    /// Returns `true` when the tick flipped between initialised and
    /// uninitialised, in which case the caller updates the bitmap.
    pub fn update(
        &mut self,
        tick: Tick,
        tick_current: Tick,
        liquidity_delta: LiquidityNet,
        upper: bool,
        max_liquidity: Liquidity,
        fee_growth_global: (FeeGrowth, FeeGrowth),
    ) -> Result<bool> {
        let gross_before = self.liquidity_gross;
        let gross_after = if liquidity_delta.is_negative() {
            gross_before
                .checked_sub(liquidity_delta.abs())
                .ok_or_else(|| error_here!(ErrorKind::InternalLogicError))?
        } else {
            gross_before + liquidity_delta.abs()
        };
        ensure_here!(gross_after <= max_liquidity, ErrorKind::LiquidityExceedsMax);

        let flipped = gross_after.is_zero() != gross_before.is_zero();
        if gross_before.is_zero() {
            // Newly initialised. All growth so far is attributed to the side
            // below the current price, so a tick at or under it starts from
            // the current globals.
            if tick <= tick_current {
                self.fee_growth_outside = fee_growth_global;
            } else {
                self.fee_growth_outside = (FeeGrowth::zero(), FeeGrowth::zero());
            }
            self.initialised = true;
        }

        self.liquidity_gross = gross_after;
        if upper {
            self.liquidity_net -= liquidity_delta;
        } else {
            self.liquidity_net += liquidity_delta;
        }

        if gross_after.is_zero() {
            self.fee_growth_outside = (FeeGrowth::zero(), FeeGrowth::zero());
            self.initialised = false;
        }
        Ok(flipped)
    }

    /// Transition over this tick; flips the outside accumulators to the
    /// other side of the current price and hands the stepper the liquidity
    /// to apply (negated by the caller for a downward crossing).
    pub fn cross(&mut self, fee_growth_global: (FeeGrowth, FeeGrowth)) -> LiquidityNet {
        self.fee_growth_outside = (
            fee_growth_global.0 - self.fee_growth_outside.0,
            fee_growth_global.1 - self.fee_growth_outside.1,
        );
        self.liquidity_net
    }
}

impl Default for TickDataV0 {
    fn default() -> Self {
        Self::new()
    }
}

/// Fee growth accumulated strictly between the two ticks of a range.
///
/// The value is relative, not absolute, and may be negative for ticks
/// initialised at different times; only differences over a position's
/// lifetime are meaningful, which is why the result is signed.
pub fn fee_growth_inside(
    lower: &TickDataV0,
    upper: &TickDataV0,
    tick_lower: Tick,
    tick_upper: Tick,
    tick_current: Tick,
    fee_growth_global: (FeeGrowth, FeeGrowth),
) -> (AmountSigned, AmountSigned) {
    fn one_side(
        lower_outside: FeeGrowth,
        upper_outside: FeeGrowth,
        below_current: bool,
        above_current: bool,
        global: FeeGrowth,
    ) -> AmountSigned {
        let below = if below_current {
            lower_outside
        } else {
            global - lower_outside
        };
        let above = if above_current {
            upper_outside
        } else {
            global - upper_outside
        };
        AmountSigned::from(global) - AmountSigned::from(below) - AmountSigned::from(above)
    }

    let below_current = tick_current >= tick_lower;
    let above_current = tick_current < tick_upper;
    (
        one_side(
            lower.fee_growth_outside.0,
            upper.fee_growth_outside.0,
            below_current,
            above_current,
            fee_growth_global.0,
        ),
        one_side(
            lower.fee_growth_outside.1,
            upper.fee_growth_outside.1,
            below_current,
            above_current,
            fee_growth_global.1,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn liq(value: u128) -> Liquidity {
        Liquidity::from(value)
    }

    fn growth(text: &str) -> FeeGrowth {
        FeeGrowth::from_decimal_str(text).unwrap()
    }

    fn tick(value: i32) -> Tick {
        Tick::new(value).unwrap()
    }

    fn big() -> Liquidity {
        max_liquidity_per_tick(10)
    }

    #[test]
    fn first_touch_below_current_seeds_outside_growth() {
        let globals = (growth("7.5"), growth("2.25"));
        let mut data = TickDataV0::new();
        let flipped = data
            .update(
                tick(-100),
                tick(50),
                LiquidityNet::from(liq(10)),
                false,
                big(),
                globals,
            )
            .unwrap();
        assert!(flipped);
        assert!(data.initialised);
        assert_eq!(data.fee_growth_outside, globals);
    }

    #[test]
    fn first_touch_above_current_starts_clean() {
        let mut data = TickDataV0::new();
        data.update(
            tick(100),
            tick(50),
            LiquidityNet::from(liq(10)),
            true,
            big(),
            (growth("7.5"), growth("2.25")),
        )
        .unwrap();
        assert_eq!(
            data.fee_growth_outside,
            (FeeGrowth::zero(), FeeGrowth::zero())
        );
        assert_eq!(data.liquidity_net, LiquidityNet::negative(liq(10)));
    }

    #[test]
    fn removing_all_liquidity_deinitialises() {
        let mut data = TickDataV0::new();
        let globals = (growth("1"), growth("1"));
        data.update(tick(0), tick(0), LiquidityNet::from(liq(4)), false, big(), globals)
            .unwrap();
        let flipped = data
            .update(
                tick(0),
                tick(0),
                LiquidityNet::negative(liq(4)),
                false,
                big(),
                globals,
            )
            .unwrap();
        assert!(flipped);
        assert!(!data.initialised);
        assert!(data.liquidity_gross.is_zero());
        assert_eq!(
            data.fee_growth_outside,
            (FeeGrowth::zero(), FeeGrowth::zero())
        );
    }

    #[test]
    fn per_tick_liquidity_cap_is_enforced() {
        let mut data = TickDataV0::new();
        let cap = max_liquidity_per_tick(10);
        let result = data.update(
            tick(0),
            tick(0),
            LiquidityNet::from(cap + liq(1)),
            false,
            cap,
            (FeeGrowth::zero(), FeeGrowth::zero()),
        );
        assert_matches!(result, Err(e) if matches!(e.kind, ErrorKind::LiquidityExceedsMax));
    }

    #[test]
    fn crossing_mirrors_outside_growth() {
        let mut data = TickDataV0::new();
        data.update(
            tick(0),
            tick(10),
            LiquidityNet::from(liq(3)),
            false,
            big(),
            (growth("4"), growth("6")),
        )
        .unwrap();
        let net = data.cross((growth("10"), growth("10")));
        assert_eq!(net, LiquidityNet::from(liq(3)));
        assert_eq!(data.fee_growth_outside, (growth("6"), growth("4")));
    }

    #[test]
    fn inside_growth_accumulates_only_while_in_range() {
        let mut lower = TickDataV0::new();
        let mut upper = TickDataV0::new();
        let mut globals = (growth("5"), growth("0"));
        lower
            .update(tick(-10), tick(0), LiquidityNet::from(liq(1)), false, big(), globals)
            .unwrap();
        upper
            .update(tick(10), tick(0), LiquidityNet::from(liq(1)), true, big(), globals)
            .unwrap();

        let inside_before = fee_growth_inside(&lower, &upper, tick(-10), tick(10), tick(0), globals);

        // Fees accrue while the price stays in range.
        globals.0 += growth("2");
        let inside_after = fee_growth_inside(&lower, &upper, tick(-10), tick(10), tick(0), globals);
        assert_eq!(inside_after.0 - inside_before.0, AmountSigned::from(growth("2")));

        // Price leaves the range upward; further global growth is outside.
        upper.cross(globals);
        globals.0 += growth("3");
        let inside_out_of_range =
            fee_growth_inside(&lower, &upper, tick(-10), tick(10), tick(20), globals);
        assert_eq!(inside_out_of_range.0, inside_after.0);
    }
}
