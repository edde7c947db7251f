//! Position lifecycle: owed-fee accrual and liquidity changes.

use num_traits::Zero;

use super::errors::{ErrorKind, Result};
use super::state_types::PositionV0;
use crate::fp::Rounding;
use crate::ledger::{AccountId, Amount, AmountSigned, LiquidityNet};
use crate::{ensure_here, error_here};

impl PositionV0 {
    pub fn new(
        owner: AccountId,
        tick_lower: super::tick::Tick,
        tick_upper: super::tick::Tick,
        position_id: String,
    ) -> Self {
        Self {
            owner,
            tick_lower,
            tick_upper,
            position_id,
            liquidity: Amount::zero(),
            fee_growth_inside_last: (AmountSigned::zero(), AmountSigned::zero()),
            tokens_owed: (Amount::zero(), Amount::zero()),
        }
    }

    /// Settles fees against the supplied inside-growth snapshot, then
    /// applies the liquidity delta.
    pub fn update(
        &mut self,
        liquidity_delta: LiquidityNet,
        fee_growth_inside: (AmountSigned, AmountSigned),
    ) -> Result<()> {
        self.tokens_owed.0 += self.owed_delta(fee_growth_inside.0, self.fee_growth_inside_last.0);
        self.tokens_owed.1 += self.owed_delta(fee_growth_inside.1, self.fee_growth_inside_last.1);
        self.fee_growth_inside_last = fee_growth_inside;

        if liquidity_delta.is_negative() {
            ensure_here!(
                liquidity_delta.abs() <= self.liquidity,
                ErrorKind::InternalLogicError
            );
            self.liquidity -= liquidity_delta.abs();
        } else {
            self.liquidity += liquidity_delta.abs();
        }
        Ok(())
    }

    fn owed_delta(&self, inside: AmountSigned, last: AmountSigned) -> Amount {
        let growth = inside - last;
        // Inside growth never shrinks while the position exists; anything
        // negative here is rounding dust at the Q128 tail.
        debug_assert!(growth >= AmountSigned::negative(Amount::from(1u128)));
        if growth.is_negative() {
            Amount::zero()
        } else {
            self.liquidity.mul_round(growth.abs(), Rounding::Down)
        }
    }

    /// A zero-liquidity position stays on the ledger until its owed fees
    /// are drained too.
    pub fn is_empty(&self) -> bool {
        self.liquidity.is_zero() && self.tokens_owed.0.is_zero() && self.tokens_owed.1.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::tick::Tick;

    fn position(liquidity: u128) -> PositionV0 {
        let mut p = PositionV0::new(
            "lp".into(),
            Tick::new(-60).unwrap(),
            Tick::new(60).unwrap(),
            "pos-1".into(),
        );
        p.liquidity = Amount::from(liquidity);
        p
    }

    fn signed(text: &str) -> AmountSigned {
        AmountSigned::from_decimal_str(text).unwrap()
    }

    #[test]
    fn fees_accrue_from_inside_growth() {
        let mut p = position(1000);
        p.update(LiquidityNet::zero(), (signed("0.25"), signed("0.5")))
            .unwrap();
        assert_eq!(p.tokens_owed.0, Amount::from_decimal_str("250").unwrap());
        assert_eq!(p.tokens_owed.1, Amount::from_decimal_str("500").unwrap());
        assert_eq!(p.fee_growth_inside_last, (signed("0.25"), signed("0.5")));

        // A second update with unchanged growth owes nothing more.
        p.update(LiquidityNet::zero(), (signed("0.25"), signed("0.5")))
            .unwrap();
        assert_eq!(p.tokens_owed.0, Amount::from_decimal_str("250").unwrap());
    }

    #[test]
    fn negative_snapshots_still_accrue_differences() {
        let mut p = position(100);
        p.fee_growth_inside_last = (signed("-2"), AmountSigned::zero());
        p.update(LiquidityNet::zero(), (signed("-1.5"), AmountSigned::zero()))
            .unwrap();
        assert_eq!(p.tokens_owed.0, Amount::from_decimal_str("50").unwrap());
    }

    #[test]
    fn burn_cannot_exceed_position_liquidity() {
        let mut p = position(10);
        let result = p.update(
            LiquidityNet::negative(Amount::from(11u128)),
            (AmountSigned::zero(), AmountSigned::zero()),
        );
        assert!(result.is_err());
        assert_eq!(p.liquidity, Amount::from(10u128));
    }

    #[test]
    fn emptiness_requires_drained_fees() {
        let mut p = position(0);
        assert!(p.is_empty());
        p.tokens_owed.0 = Amount::from(1u128);
        assert!(!p.is_empty());
    }
}
