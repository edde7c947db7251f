//! Pool-level state transitions shared by the request surface.

use num_traits::Zero;
use sha2::{Digest, Sha256};

use super::errors::{ErrorKind, Result};
use super::sqrt_price_math::{amount0_delta, amount1_delta};
use super::state_types::{PoolV0, PositionV0, TickDataV0};
use super::tick::{FeeTier, Tick};
use super::tick_math::{max_sqrt_price, min_sqrt_price, sqrt_price_to_tick, tick_to_sqrt_price};
use super::tick_state::{fee_growth_inside, max_liquidity_per_tick};
use crate::fp::Rounding;
use crate::ledger::keys::{fee_component, index};
use crate::ledger::{
    AccountId, Amount, CompositeKey, Fraction, Liquidity, LiquidityNet, SqrtPrice, TokenClassKey,
};
use crate::{ensure_here, error_here};

/// Outcome of a liquidity change on a range.
#[derive(Debug)]
pub struct ModifyOutcome {
    /// Token amounts corresponding to the liquidity delta; owed by the user
    /// on a mint, owed to the user on a burn.
    pub amount0: Amount,
    pub amount1: Amount,
    pub flipped_lower: bool,
    pub flipped_upper: bool,
}

impl PoolV0 {
    pub fn try_new(
        token0: TokenClassKey,
        token1: TokenClassKey,
        fee_tier: FeeTier,
        sqrt_price: SqrtPrice,
        protocol_fee_fraction: Fraction,
        creator: AccountId,
        is_private: bool,
        whitelist: Vec<AccountId>,
    ) -> Result<Self> {
        ensure_here!(token0 != token1, ErrorKind::TokenDuplicates);
        ensure_here!(token0 < token1, ErrorKind::TokenOrderInvalid);
        ensure_here!(
            sqrt_price >= min_sqrt_price() && sqrt_price <= max_sqrt_price(),
            ErrorKind::SqrtPriceOutOfRange
        );
        ensure_here!(
            protocol_fee_fraction <= Fraction::one(),
            ErrorKind::InvalidParams
        );
        let mut whitelist = if is_private { whitelist } else { Vec::new() };
        if is_private && !whitelist.contains(&creator) {
            whitelist.push(creator.clone());
        }
        Ok(Self {
            token0_class_key: token0,
            token1_class_key: token1,
            fee_tier,
            sqrt_price,
            liquidity: Liquidity::zero(),
            gross_pool_liquidity: Liquidity::zero(),
            bitmap: Default::default(),
            fee_growth_global: (Amount::zero(), Amount::zero()),
            protocol_fees: (Amount::zero(), Amount::zero()),
            protocol_fee_fraction,
            creator,
            is_private,
            whitelist,
        })
    }

    /// Composite key under which this pool is stored.
    pub fn composite_key(&self) -> CompositeKey {
        pool_key(
            &self.token0_class_key,
            &self.token1_class_key,
            self.fee_tier,
        )
    }

    /// SHA-256 over the canonical composite byte sequence of the pool key.
    pub fn pool_hash(&self) -> String {
        hex::encode(Sha256::digest(self.composite_key().as_bytes()))
    }

    /// Token-holder address of the pool in the token subledger.
    pub fn pool_alias(&self) -> AccountId {
        format!("pool_{}", self.pool_hash())
    }

    pub fn tick_spacing(&self) -> u16 {
        self.fee_tier.tick_spacing()
    }

    /// Tick implied by the stored sqrt price.
    pub fn current_tick(&self) -> Result<Tick> {
        sqrt_price_to_tick(self.sqrt_price).map_err(|e| error_here!(e))
    }

    pub fn is_allowed(&self, account: &AccountId) -> bool {
        !self.is_private || self.whitelist.contains(account)
    }

    fn validate_range(&self, tick_lower: Tick, tick_upper: Tick) -> Result<()> {
        ensure_here!(tick_lower < tick_upper, ErrorKind::TickRangeInvalid);
        let spacing = self.tick_spacing();
        ensure_here!(
            tick_lower.is_aligned(spacing) && tick_upper.is_aligned(spacing),
            ErrorKind::TickMisaligned
        );
        Ok(())
    }

    /// Token amounts held by `liquidity` on the range at the current price.
    ///
    /// Rounding is direction-aware: pass `Up` when the amounts are owed by
    /// the user (mint) and `Down` when paid to the user (burn).
    pub fn amounts_for_liquidity(
        &self,
        tick_lower: Tick,
        tick_upper: Tick,
        liquidity: Liquidity,
        rounding: Rounding,
    ) -> (Amount, Amount) {
        let sqrt_lower = tick_to_sqrt_price(tick_lower);
        let sqrt_upper = tick_to_sqrt_price(tick_upper);
        let sqrt_current = self.sqrt_price;
        if sqrt_current <= sqrt_lower {
            (
                amount0_delta(sqrt_lower, sqrt_upper, liquidity, rounding),
                Amount::zero(),
            )
        } else if sqrt_current >= sqrt_upper {
            (
                Amount::zero(),
                amount1_delta(sqrt_lower, sqrt_upper, liquidity, rounding),
            )
        } else {
            (
                amount0_delta(sqrt_current, sqrt_upper, liquidity, rounding),
                amount1_delta(sqrt_lower, sqrt_current, liquidity, rounding),
            )
        }
    }

    /// Applies a liquidity delta to a position and its boundary ticks.
    ///
    /// Tick records are updated first so the inside-growth snapshot the
    /// position settles against reflects this touch; the caller persists
    /// the tick records and flips the bitmap bits where reported.
    pub fn modify_position(
        &mut self,
        position: &mut PositionV0,
        tick_lower_data: &mut TickDataV0,
        tick_upper_data: &mut TickDataV0,
        liquidity_delta: LiquidityNet,
    ) -> Result<ModifyOutcome> {
        let (tick_lower, tick_upper) = (position.tick_lower, position.tick_upper);
        self.validate_range(tick_lower, tick_upper)?;
        let tick_current = self.current_tick()?;
        let max_liquidity = max_liquidity_per_tick(self.tick_spacing());

        let flipped_lower = tick_lower_data.update(
            tick_lower,
            tick_current,
            liquidity_delta,
            false,
            max_liquidity,
            self.fee_growth_global,
        )?;
        let flipped_upper = tick_upper_data.update(
            tick_upper,
            tick_current,
            liquidity_delta,
            true,
            max_liquidity,
            self.fee_growth_global,
        )?;

        if flipped_lower {
            self.bitmap.flip(tick_lower, self.tick_spacing());
        }
        if flipped_upper {
            self.bitmap.flip(tick_upper, self.tick_spacing());
        }

        let inside = fee_growth_inside(
            tick_lower_data,
            tick_upper_data,
            tick_lower,
            tick_upper,
            tick_current,
            self.fee_growth_global,
        );
        position.update(liquidity_delta, inside)?;

        let magnitude = liquidity_delta.abs();
        let burning = liquidity_delta.is_negative();
        if !magnitude.is_zero() {
            if burning {
                self.gross_pool_liquidity = self
                    .gross_pool_liquidity
                    .checked_sub(magnitude)
                    .ok_or_else(|| error_here!(ErrorKind::InternalLogicError))?;
            } else {
                self.gross_pool_liquidity += magnitude;
            }
            // Active liquidity tracks only ranges bracketing the current tick.
            if tick_lower <= tick_current && tick_current < tick_upper {
                if burning {
                    self.liquidity = self
                        .liquidity
                        .checked_sub(magnitude)
                        .ok_or_else(|| error_here!(ErrorKind::InternalLogicError))?;
                } else {
                    self.liquidity += magnitude;
                }
            }
        }

        let rounding = if burning { Rounding::Down } else { Rounding::Up };
        let (amount0, amount1) =
            self.amounts_for_liquidity(tick_lower, tick_upper, magnitude, rounding);
        Ok(ModifyOutcome {
            amount0,
            amount1,
            flipped_lower,
            flipped_upper,
        })
    }

    /// Moves up to the requested amounts of owed fees out of the position.
    pub fn collect(
        &mut self,
        position: &mut PositionV0,
        max0: Amount,
        max1: Amount,
    ) -> (Amount, Amount) {
        let amount0 = position.tokens_owed.0.min(max0);
        let amount1 = position.tokens_owed.1.min(max1);
        position.tokens_owed.0 -= amount0;
        position.tokens_owed.1 -= amount1;
        (amount0, amount1)
    }

    /// Drains the uncollected protocol share, bounded by what the pool
    /// actually holds.
    pub fn collect_protocol_fees(
        &mut self,
        token0_balance: Amount,
        token1_balance: Amount,
    ) -> (Amount, Amount) {
        let amount0 = self.protocol_fees.0.min(token0_balance);
        let amount1 = self.protocol_fees.1.min(token1_balance);
        self.protocol_fees.0 -= amount0;
        self.protocol_fees.1 -= amount1;
        (amount0, amount1)
    }
}

/// Composite key of a pool; shared with every record keyed under the pool.
pub fn pool_key(token0: &TokenClassKey, token1: &TokenClassKey, fee_tier: FeeTier) -> CompositeKey {
    CompositeKey::new(
        index::POOL,
        &[
            token0.as_str(),
            token1.as_str(),
            &fee_component(fee_tier.basis_points()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn fx(text: &str) -> Amount {
        Amount::from_decimal_str(text).unwrap()
    }

    fn pool_at(sqrt_price: &str) -> PoolV0 {
        PoolV0::try_new(
            "TOKEN:A".into(),
            "TOKEN:B".into(),
            FeeTier::Bps5,
            fx(sqrt_price),
            Fraction::zero(),
            "creator".into(),
            false,
            Vec::new(),
        )
        .unwrap()
    }

    fn tick(value: i32) -> Tick {
        Tick::new(value).unwrap()
    }

    #[test]
    fn creation_validates_token_order() {
        let out_of_order = PoolV0::try_new(
            "TOKEN:B".into(),
            "TOKEN:A".into(),
            FeeTier::Bps5,
            fx("1"),
            Fraction::zero(),
            "creator".into(),
            false,
            Vec::new(),
        );
        assert_matches!(out_of_order, Err(e) if matches!(e.kind, ErrorKind::TokenOrderInvalid));
        let duplicated = PoolV0::try_new(
            "TOKEN:A".into(),
            "TOKEN:A".into(),
            FeeTier::Bps5,
            fx("1"),
            Fraction::zero(),
            "creator".into(),
            false,
            Vec::new(),
        );
        assert_matches!(duplicated, Err(e) if matches!(e.kind, ErrorKind::TokenDuplicates));
    }

    #[test]
    fn creation_accepts_extreme_sqrt_prices() {
        for boundary in [min_sqrt_price(), max_sqrt_price()] {
            PoolV0::try_new(
                "TOKEN:A".into(),
                "TOKEN:B".into(),
                FeeTier::Bps30,
                boundary,
                Fraction::zero(),
                "creator".into(),
                false,
                Vec::new(),
            )
            .unwrap();
        }
        let below = PoolV0::try_new(
            "TOKEN:A".into(),
            "TOKEN:B".into(),
            FeeTier::Bps30,
            min_sqrt_price() / fx("1000"),
            Fraction::zero(),
            "creator".into(),
            false,
            Vec::new(),
        );
        assert_matches!(below, Err(e) if matches!(e.kind, ErrorKind::SqrtPriceOutOfRange));
    }

    #[test]
    fn private_pool_always_whitelists_creator() {
        let pool = PoolV0::try_new(
            "TOKEN:A".into(),
            "TOKEN:B".into(),
            FeeTier::Bps5,
            fx("1"),
            Fraction::zero(),
            "creator".into(),
            true,
            vec!["friend".into()],
        )
        .unwrap();
        assert!(pool.is_allowed(&"creator".into()));
        assert!(pool.is_allowed(&"friend".into()));
        assert!(!pool.is_allowed(&"stranger".into()));
    }

    #[test]
    fn pool_alias_is_stable_and_prefixed() {
        let pool = pool_at("1");
        let alias = pool.pool_alias();
        assert!(alias.starts_with("pool_"));
        assert_eq!(alias, pool.pool_alias());
        assert_eq!(alias.len(), 5 + 64);
    }

    #[test]
    fn misaligned_ticks_are_rejected() {
        let mut pool = pool_at("1");
        let mut position = PositionV0::new("lp".into(), tick(-15), tick(10), "p".into());
        let mut lower = TickDataV0::new();
        let mut upper = TickDataV0::new();
        let result = pool.modify_position(
            &mut position,
            &mut lower,
            &mut upper,
            LiquidityNet::from(fx("100")),
        );
        assert_matches!(result, Err(e) if matches!(e.kind, ErrorKind::TickMisaligned));
    }

    #[test]
    fn in_range_mint_updates_active_and_gross_liquidity() {
        let mut pool = pool_at("1");
        let mut position = PositionV0::new("lp".into(), tick(-100), tick(100), "p".into());
        let mut lower = TickDataV0::new();
        let mut upper = TickDataV0::new();
        let outcome = pool
            .modify_position(
                &mut position,
                &mut lower,
                &mut upper,
                LiquidityNet::from(fx("1000")),
            )
            .unwrap();
        assert!(outcome.flipped_lower && outcome.flipped_upper);
        assert_eq!(pool.liquidity, fx("1000"));
        assert_eq!(pool.gross_pool_liquidity, fx("1000"));
        assert!(!outcome.amount0.is_zero() && !outcome.amount1.is_zero());
        assert!(pool.bitmap.is_initialised(tick(-100), 10));

        // Same range again: bits must not flip back.
        let mut other = PositionV0::new("lp".into(), tick(-100), tick(100), "q".into());
        let outcome2 = pool
            .modify_position(
                &mut other,
                &mut lower,
                &mut upper,
                LiquidityNet::from(fx("500")),
            )
            .unwrap();
        assert!(!outcome2.flipped_lower && !outcome2.flipped_upper);
        assert_eq!(pool.liquidity, fx("1500"));
    }

    #[test]
    fn out_of_range_mint_is_single_sided() {
        let mut pool = pool_at("1");
        let mut position = PositionV0::new("lp".into(), tick(100), tick(200), "p".into());
        let mut lower = TickDataV0::new();
        let mut upper = TickDataV0::new();
        let outcome = pool
            .modify_position(
                &mut position,
                &mut lower,
                &mut upper,
                LiquidityNet::from(fx("1000")),
            )
            .unwrap();
        // Range above the current price holds token0 only and no active liquidity.
        assert!(pool.liquidity.is_zero());
        assert!(!outcome.amount0.is_zero());
        assert!(outcome.amount1.is_zero());
    }

    #[test]
    fn mint_then_burn_returns_no_more_than_deposited() {
        let mut pool = pool_at("1");
        let mut position = PositionV0::new("lp".into(), tick(-1000), tick(1000), "p".into());
        let mut lower = TickDataV0::new();
        let mut upper = TickDataV0::new();
        let minted = pool
            .modify_position(
                &mut position,
                &mut lower,
                &mut upper,
                LiquidityNet::from(fx("123456.789")),
            )
            .unwrap();
        let burned = pool
            .modify_position(
                &mut position,
                &mut lower,
                &mut upper,
                LiquidityNet::negative(fx("123456.789")),
            )
            .unwrap();
        assert!(burned.amount0 <= minted.amount0);
        assert!(burned.amount1 <= minted.amount1);
        assert!(pool.liquidity.is_zero());
        assert!(pool.gross_pool_liquidity.is_zero());
        assert!(!pool.bitmap.is_initialised(tick(-1000), 10));
    }

    #[test]
    fn collect_is_bounded_by_owed_and_requested() {
        let mut pool = pool_at("1");
        let mut position = PositionV0::new("lp".into(), tick(-10), tick(10), "p".into());
        position.tokens_owed = (fx("5"), fx("0.25"));
        let (a0, a1) = pool.collect(&mut position, fx("2"), fx("100"));
        assert_eq!((a0, a1), (fx("2"), fx("0.25")));
        assert_eq!(position.tokens_owed, (fx("3"), fx("0")));
    }

    #[test]
    fn protocol_fee_collection_is_capped_by_held_balance() {
        let mut pool = pool_at("1");
        pool.protocol_fees = (fx("10"), fx("4"));
        let (a0, a1) = pool.collect_protocol_fees(fx("6"), fx("100"));
        assert_eq!((a0, a1), (fx("6"), fx("4")));
        assert_eq!(pool.protocol_fees, (fx("4"), fx("0")));
    }
}
