//! The request surface over a host-state capability bundle.
//!
//! `Dex` borrows a [`HostState`] — ledger, token subledger, clock, logger,
//! caller identity — and executes one validated request against it. The
//! host wraps every request in its own atomicity boundary: all ledger and
//! subledger effects either commit together or are discarded.

use num_traits::Zero;

use super::errors::{ErrorKind, Result};
use super::limit_order::{
    commitment_key, fulfilled_order_key, limit_order_config_key, LimitOrderPreimage,
};
use super::pool::pool_key;
use super::requests::*;
use super::state_types::{
    Commitment, CommitmentV0, DexFeeConfig, DexFeeConfigV0, FulfilledOrder, FulfilledOrderV0,
    LimitOrderConfig, LimitOrderConfigV0, OwnerPositions, OwnerPositionsV0, Pool, PoolV0,
    Position, PositionRef, PositionV0, TickData, TickDataV0,
};
use super::swap::{Exact, SwapHost};
use super::tick::{FeeTier, Tick};
use super::tick_math::{max_sqrt_price, min_sqrt_price};
use super::utils::{swap_if, PairExt};
use crate::ledger::keys::{index, tick_component};
use crate::ledger::{
    AccountId, AllowanceKind, AllowanceQuery, Amount, AmountSigned, CompositeKey, Event,
    FeeGrowth, Fraction, Liquidity, LiquidityNet, Logger, ObjectStore, ObjectStoreExt,
    StagedView, TokenLedger, TransferRequest, TxClock,
};
use crate::{ensure_here, error_here};

mod host;
pub use host::InMemoryHost;

const DEFAULT_STEPS_PER_YIELD: u32 = 10;

/// Capability bundle a host supplies per request.
pub trait HostState {
    fn ledger(&self) -> &dyn ObjectStore;
    fn ledger_mut(&mut self) -> &mut dyn ObjectStore;
    fn tokens(&self) -> &dyn TokenLedger;
    fn tokens_mut(&mut self) -> &mut dyn TokenLedger;
    fn logger_mut(&mut self) -> &mut dyn Logger;
    fn clock(&self) -> &dyn TxClock;
    /// Identity which called the contract method; authenticated upstream.
    fn caller(&self) -> AccountId;
    /// Cooperative-yield hook; the swap stepper calls this between chunks.
    fn checkpoint(&mut self) {}
}

pub struct Dex<'a, S: HostState + ?Sized> {
    state: &'a mut S,
}

fn tick_key(pool_hash: &str, tick: Tick) -> CompositeKey {
    CompositeKey::new(index::TICK, &[pool_hash, &tick_component(tick.index())])
}

fn position_key(pool_hash: &str, tick_lower: Tick, tick_upper: Tick, id: &str) -> CompositeKey {
    CompositeKey::new(
        index::POSITION,
        &[
            pool_hash,
            &tick_component(tick_lower.index()),
            &tick_component(tick_upper.index()),
            id,
        ],
    )
}

fn owner_positions_key(owner: &AccountId, pool_hash: &str) -> CompositeKey {
    CompositeKey::new(index::POSITION_OWNER, &[owner.as_str(), pool_hash])
}

fn dex_fee_config_key() -> CompositeKey {
    CompositeKey::new(index::DEX_FEE_CONFIG, &[] as &[&str])
}

/// Percentage of `requested` which `available` can satisfy, rendered for
/// the insufficient-liquidity error.
fn max_fraction_pct(available: Amount, requested: Amount) -> String {
    (available / requested * Amount::from(100u128)).to_decimal_string(2)
}

fn insufficient(available: Amount, requested: Amount) -> super::errors::Error {
    error_here!(ErrorKind::InsufficientLiquidity {
        max_fraction_pct: max_fraction_pct(available, requested),
    })
}

/// Applies `TickData::cross` against a stored record.
fn cross_tick_on_store(
    store: &mut dyn ObjectStore,
    pool_hash: &str,
    tick: Tick,
    fee_growth_global: (FeeGrowth, FeeGrowth),
) -> Result<LiquidityNet> {
    let key = tick_key(pool_hash, tick);
    let record: Option<TickData> = store.get_object(&key)?;
    let Some(TickData::V0(mut data)) = record else {
        return Err(error_here!(ErrorKind::InternalTickNotFound));
    };
    let net = data.cross(fee_growth_global);
    store.put_object(&key, &TickData::V0(data))?;
    Ok(net)
}

/// Swap host for the direct swap path: ticks through the request's ledger
/// view, checkpoints through the host.
struct StateSwapHost<'a, S: HostState + ?Sized> {
    state: &'a mut S,
    pool_hash: String,
}

impl<S: HostState + ?Sized> SwapHost for StateSwapHost<'_, S> {
    fn cross_tick(
        &mut self,
        tick: Tick,
        fee_growth_global: (FeeGrowth, FeeGrowth),
    ) -> Result<LiquidityNet> {
        cross_tick_on_store(self.state.ledger_mut(), &self.pool_hash, tick, fee_growth_global)
    }

    fn checkpoint(&mut self) {
        self.state.checkpoint();
    }
}

/// Swap host over a bare object store; used by the sandboxed per-pool fill
/// swaps and by ledger-backed quotes, which are discarded wholesale.
struct StoreSwapHost<'a> {
    store: &'a mut dyn ObjectStore,
    pool_hash: String,
}

impl SwapHost for StoreSwapHost<'_> {
    fn cross_tick(
        &mut self,
        tick: Tick,
        fee_growth_global: (FeeGrowth, FeeGrowth),
    ) -> Result<LiquidityNet> {
        cross_tick_on_store(self.store, &self.pool_hash, tick, fee_growth_global)
    }

    fn checkpoint(&mut self) {}
}

/// Swap host over a detached snapshot; nothing persists.
struct SnapshotSwapHost {
    ticks: std::collections::BTreeMap<i32, TickDataV0>,
}

impl SwapHost for SnapshotSwapHost {
    fn cross_tick(
        &mut self,
        tick: Tick,
        fee_growth_global: (FeeGrowth, FeeGrowth),
    ) -> Result<LiquidityNet> {
        let data = self
            .ticks
            .get_mut(&tick.index())
            .ok_or_else(|| error_here!(ErrorKind::InternalTickNotFound))?;
        Ok(data.cross(fee_growth_global))
    }

    fn checkpoint(&mut self) {}
}

impl<'a, S: HostState + ?Sized> Dex<'a, S> {
    pub fn new(state: &'a mut S) -> Self {
        Self { state }
    }

    fn fee_config(&self) -> Result<Option<DexFeeConfigV0>> {
        let record: Option<DexFeeConfig> = self.state.ledger().get_object(&dex_fee_config_key())?;
        Ok(record.map(|DexFeeConfig::V0(config)| config))
    }

    fn limit_order_config(&self) -> Result<Option<LimitOrderConfigV0>> {
        let record: Option<LimitOrderConfig> =
            self.state.ledger().get_object(&limit_order_config_key())?;
        Ok(record.map(|LimitOrderConfig::V0(config)| config))
    }

    fn steps_per_yield(&self) -> Result<u32> {
        Ok(self
            .fee_config()?
            .map_or(DEFAULT_STEPS_PER_YIELD, |c| c.steps_per_yield.max(1)))
    }

    fn ensure_not_paused(&self) -> Result<()> {
        if let Some(config) = self.fee_config()? {
            ensure_here!(!config.paused, ErrorKind::ContractPaused);
        }
        Ok(())
    }

    fn load_pool(
        &self,
        token0: &str,
        token1: &str,
        fee: crate::ledger::BasisPoints,
    ) -> Result<(CompositeKey, PoolV0)> {
        let tier = FeeTier::from_basis_points(fee).map_err(|e| error_here!(e))?;
        let key = pool_key(&token0.to_string(), &token1.to_string(), tier);
        let record: Option<Pool> = self.state.ledger().get_object(&key)?;
        let Some(Pool::V0(pool)) = record else {
            return Err(error_here!(ErrorKind::PoolNotFound));
        };
        Ok((key, pool))
    }

    fn ensure_pool_access(&self, pool: &PoolV0) -> Result<()> {
        ensure_here!(
            pool.is_allowed(&self.state.caller()),
            ErrorKind::Unauthorized
        );
        Ok(())
    }

    /// Owner, or an authorized collector holding transfer allowances for
    /// both pool tokens.
    fn ensure_position_access(&self, pool: &PoolV0, owner: &AccountId) -> Result<()> {
        let caller = self.state.caller();
        if caller == *owner {
            return Ok(());
        }
        for token in [&pool.token0_class_key, &pool.token1_class_key] {
            let grants = self.state.tokens().fetch_allowances(&AllowanceQuery {
                granted_by: Some(owner.clone()),
                granted_to: caller.clone(),
                token: token.clone(),
                kind: AllowanceKind::Transfer,
                limit: 1,
            });
            ensure_here!(!grants.is_empty(), ErrorKind::Unauthorized);
        }
        Ok(())
    }

    fn load_tick(&self, pool_hash: &str, tick: Tick) -> Result<TickDataV0> {
        let record: Option<TickData> = self.state.ledger().get_object(&tick_key(pool_hash, tick))?;
        Ok(match record {
            Some(TickData::V0(data)) => data,
            None => TickDataV0::new(),
        })
    }

    /// Tick records live only while initialised.
    fn persist_tick(&mut self, pool_hash: &str, tick: Tick, data: &TickDataV0) -> Result<()> {
        let key = tick_key(pool_hash, tick);
        if data.liquidity_gross.is_zero() {
            self.state.ledger_mut().delete(key.as_str());
            Ok(())
        } else {
            self.state
                .ledger_mut()
                .put_object(&key, &TickData::V0(data.clone()))
        }
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        token: &str,
        quantity: Amount,
        on_behalf_of: Option<AccountId>,
    ) -> Result<()> {
        if quantity.is_zero() {
            return Ok(());
        }
        self.state.tokens_mut().transfer(TransferRequest {
            from: from.clone(),
            to: to.clone(),
            token: token.to_string(),
            quantity,
            on_behalf_of,
        })
    }

    // ---- pool lifecycle ------------------------------------------------

    pub fn create_pool(&mut self, request: CreatePoolRequest) -> Result<PoolMetadata> {
        self.ensure_not_paused()?;
        let tier = FeeTier::from_basis_points(request.fee).map_err(|e| error_here!(e))?;
        let key = pool_key(&request.token0, &request.token1, tier);
        let existing: Option<Pool> = self.state.ledger().get_object(&key)?;
        ensure_here!(existing.is_none(), ErrorKind::PoolAlreadyExists);

        let protocol_fee_fraction = self
            .fee_config()?
            .map_or_else(Fraction::zero, |c| c.protocol_fee_fraction);
        let creator = self.state.caller();
        let pool = PoolV0::try_new(
            request.token0.clone(),
            request.token1.clone(),
            tier,
            request.initial_sqrt_price,
            protocol_fee_fraction,
            creator.clone(),
            request.is_private,
            request.whitelist,
        )?;
        let metadata = PoolMetadata {
            pool_hash: pool.pool_hash(),
            pool_alias: pool.pool_alias(),
            token0: pool.token0_class_key.clone(),
            token1: pool.token1_class_key.clone(),
            fee: request.fee,
            sqrt_price: pool.sqrt_price,
        };
        self.state.ledger_mut().put_object(&key, &Pool::V0(pool))?;
        self.state.logger_mut().log_event(Event::PoolCreated {
            creator,
            token0: metadata.token0.clone(),
            token1: metadata.token1.clone(),
            fee: metadata.fee,
            sqrt_price: metadata.sqrt_price.to_decimal_string(18),
        });
        Ok(metadata)
    }

    // ---- liquidity -----------------------------------------------------

    pub fn add_liquidity(
        &mut self,
        request: AddLiquidityRequest,
    ) -> Result<((Amount, Amount), Position)> {
        self.ensure_not_paused()?;
        let (pool_key, mut pool) =
            self.load_pool(&request.token0, &request.token1, request.fee)?;
        self.ensure_pool_access(&pool)?;
        let caller = self.state.caller();
        let pool_hash = pool.pool_hash();
        let pool_alias = pool.pool_alias();

        let tick_lower = Tick::new(request.tick_lower).map_err(|e| error_here!(e))?;
        let tick_upper = Tick::new(request.tick_upper).map_err(|e| error_here!(e))?;
        let liquidity = derive_liquidity(
            &pool,
            tick_lower,
            tick_upper,
            request.amount,
            request.amount_side,
        )?;
        ensure_here!(!liquidity.is_zero(), ErrorKind::InvalidParams);

        let pos_key = position_key(&pool_hash, tick_lower, tick_upper, &request.position_id);
        let existing: Option<Position> = self.state.ledger().get_object(&pos_key)?;
        let (mut position, is_new) = match existing {
            Some(Position::V0(position)) => {
                // The id is unique per owner and range; someone else's record
                // under the same key is a collision, not an addition.
                ensure_here!(position.owner == caller, ErrorKind::DuplicatePositionId);
                (position, false)
            }
            None => (
                PositionV0::new(
                    caller.clone(),
                    tick_lower,
                    tick_upper,
                    request.position_id.clone(),
                ),
                true,
            ),
        };

        let mut lower_data = self.load_tick(&pool_hash, tick_lower)?;
        let mut upper_data = self.load_tick(&pool_hash, tick_upper)?;
        let outcome = pool.modify_position(
            &mut position,
            &mut lower_data,
            &mut upper_data,
            LiquidityNet::from(liquidity),
        )?;
        ensure_here!(
            outcome.amount0 >= request.amount0_min && outcome.amount1 >= request.amount1_min,
            ErrorKind::SlippageToleranceExceeded {
                actual: format!(
                    "({}, {})",
                    outcome.amount0.to_decimal_string(8),
                    outcome.amount1.to_decimal_string(8)
                ),
            }
        );

        self.persist_tick(&pool_hash, tick_lower, &lower_data)?;
        self.persist_tick(&pool_hash, tick_upper, &upper_data)?;
        self.state
            .ledger_mut()
            .put_object(&pos_key, &Position::V0(position.clone()))?;
        if is_new {
            self.register_owner_position(&caller, &pool_hash, &position)?;
        }
        self.state
            .ledger_mut()
            .put_object(&pool_key, &Pool::V0(pool.clone()))?;

        self.transfer(
            &caller,
            &pool_alias,
            &pool.token0_class_key,
            outcome.amount0,
            None,
        )?;
        self.transfer(
            &caller,
            &pool_alias,
            &pool.token1_class_key,
            outcome.amount1,
            None,
        )?;

        self.state.logger_mut().log_event(Event::Minted {
            owner: caller,
            pool_hash,
            position_id: position.position_id.clone(),
            tick_lower: tick_lower.index(),
            tick_upper: tick_upper.index(),
            liquidity: liquidity.to_decimal_string(8),
            amounts: (outcome.amount0, outcome.amount1).map(|a| a.to_decimal_string(8)),
        });
        Ok(((outcome.amount0, outcome.amount1), Position::V0(position)))
    }

    pub fn remove_liquidity(&mut self, request: RemoveLiquidityRequest) -> Result<(Amount, Amount)> {
        self.ensure_not_paused()?;
        let (pool_key, mut pool) =
            self.load_pool(&request.token0, &request.token1, request.fee)?;
        let pool_hash = pool.pool_hash();
        let pool_alias = pool.pool_alias();

        let liquidity = request
            .amount
            .try_into_unsigned()
            .map_err(|_| error_here!(ErrorKind::NegativeAmount))?;
        let tick_lower = Tick::new(request.tick_lower).map_err(|e| error_here!(e))?;
        let tick_upper = Tick::new(request.tick_upper).map_err(|e| error_here!(e))?;

        let pos_key = position_key(&pool_hash, tick_lower, tick_upper, &request.position_id);
        let record: Option<Position> = self.state.ledger().get_object(&pos_key)?;
        let Some(Position::V0(mut position)) = record else {
            return Err(error_here!(ErrorKind::PositionNotFound));
        };
        self.ensure_position_access(&pool, &position.owner)?;
        if liquidity > position.liquidity {
            return Err(insufficient(position.liquidity, liquidity));
        }

        let mut lower_data = self.load_tick(&pool_hash, tick_lower)?;
        let mut upper_data = self.load_tick(&pool_hash, tick_upper)?;
        let outcome = pool.modify_position(
            &mut position,
            &mut lower_data,
            &mut upper_data,
            LiquidityNet::negative(liquidity),
        )?;
        ensure_here!(
            outcome.amount0 >= request.amount0_min && outcome.amount1 >= request.amount1_min,
            ErrorKind::SlippageToleranceExceeded {
                actual: format!(
                    "({}, {})",
                    outcome.amount0.to_decimal_string(8),
                    outcome.amount1.to_decimal_string(8)
                ),
            }
        );

        // The pool must actually hold what the burn releases.
        for (token, amount) in [
            (&pool.token0_class_key, outcome.amount0),
            (&pool.token1_class_key, outcome.amount1),
        ] {
            let held = self.state.tokens().balance_of(&pool_alias, token);
            if held < amount {
                return Err(insufficient(held, amount));
            }
        }

        self.persist_tick(&pool_hash, tick_lower, &lower_data)?;
        self.persist_tick(&pool_hash, tick_upper, &upper_data)?;
        let owner = position.owner.clone();
        let position_id = position.position_id.clone();
        self.persist_or_remove_position(&pos_key, &pool_hash, &position)?;
        self.state
            .ledger_mut()
            .put_object(&pool_key, &Pool::V0(pool.clone()))?;

        let recipient = request.recipient.unwrap_or_else(|| owner.clone());
        self.transfer(
            &pool_alias,
            &recipient,
            &pool.token0_class_key,
            outcome.amount0,
            None,
        )?;
        self.transfer(
            &pool_alias,
            &recipient,
            &pool.token1_class_key,
            outcome.amount1,
            None,
        )?;

        self.state.logger_mut().log_event(Event::Burned {
            owner,
            pool_hash,
            position_id,
            liquidity: liquidity.to_decimal_string(8),
            amounts: (outcome.amount0, outcome.amount1).map(|a| a.to_decimal_string(8)),
        });
        Ok((outcome.amount0, outcome.amount1))
    }

    pub fn collect_position_fees(
        &mut self,
        request: CollectPositionFeesRequest,
    ) -> Result<(Amount, Amount)> {
        self.ensure_not_paused()?;
        let (pool_key, mut pool) =
            self.load_pool(&request.token0, &request.token1, request.fee)?;
        let pool_hash = pool.pool_hash();
        let pool_alias = pool.pool_alias();
        let tick_lower = Tick::new(request.tick_lower).map_err(|e| error_here!(e))?;
        let tick_upper = Tick::new(request.tick_upper).map_err(|e| error_here!(e))?;

        let pos_key = position_key(&pool_hash, tick_lower, tick_upper, &request.position_id);
        let record: Option<Position> = self.state.ledger().get_object(&pos_key)?;
        let Some(Position::V0(mut position)) = record else {
            return Err(error_here!(ErrorKind::PositionNotFound));
        };
        self.ensure_position_access(&pool, &position.owner)?;

        // Settle fee growth up to now before paying out.
        let mut lower_data = self.load_tick(&pool_hash, tick_lower)?;
        let mut upper_data = self.load_tick(&pool_hash, tick_upper)?;
        pool.modify_position(
            &mut position,
            &mut lower_data,
            &mut upper_data,
            LiquidityNet::zero(),
        )?;

        let (amount0, amount1) =
            pool.collect(&mut position, request.amount0_requested, request.amount1_requested);
        for (token, amount) in [
            (&pool.token0_class_key, amount0),
            (&pool.token1_class_key, amount1),
        ] {
            let held = self.state.tokens().balance_of(&pool_alias, token);
            if held < amount {
                return Err(insufficient(held, amount));
            }
        }

        self.persist_tick(&pool_hash, tick_lower, &lower_data)?;
        self.persist_tick(&pool_hash, tick_upper, &upper_data)?;
        let owner = position.owner.clone();
        let position_id = position.position_id.clone();
        self.persist_or_remove_position(&pos_key, &pool_hash, &position)?;
        self.state
            .ledger_mut()
            .put_object(&pool_key, &Pool::V0(pool.clone()))?;

        let recipient = request.recipient.unwrap_or_else(|| owner.clone());
        self.transfer(&pool_alias, &recipient, &pool.token0_class_key, amount0, None)?;
        self.transfer(&pool_alias, &recipient, &pool.token1_class_key, amount1, None)?;

        self.state.logger_mut().log_event(Event::FeesCollected {
            owner,
            pool_hash,
            position_id,
            amounts: (amount0, amount1).map(|a| a.to_decimal_string(8)),
        });
        Ok((amount0, amount1))
    }

    fn register_owner_position(
        &mut self,
        owner: &AccountId,
        pool_hash: &str,
        position: &PositionV0,
    ) -> Result<()> {
        let key = owner_positions_key(owner, pool_hash);
        let record: Option<OwnerPositions> = self.state.ledger().get_object(&key)?;
        let mut owned = match record {
            Some(OwnerPositions::V0(owned)) => owned,
            None => OwnerPositionsV0 {
                entries: Vec::new(),
            },
        };
        owned.entries.push(PositionRef {
            tick_lower: position.tick_lower,
            tick_upper: position.tick_upper,
            position_id: position.position_id.clone(),
        });
        self.state
            .ledger_mut()
            .put_object(&key, &OwnerPositions::V0(owned))
    }

    /// Burning to zero does not erase the position until the owed fees are
    /// drained too.
    fn persist_or_remove_position(
        &mut self,
        pos_key: &CompositeKey,
        pool_hash: &str,
        position: &PositionV0,
    ) -> Result<()> {
        if position.is_empty() {
            self.state.ledger_mut().delete(pos_key.as_str());
            let key = owner_positions_key(&position.owner, pool_hash);
            let record: Option<OwnerPositions> = self.state.ledger().get_object(&key)?;
            if let Some(OwnerPositions::V0(mut owned)) = record {
                owned.entries.retain(|entry| {
                    !(entry.position_id == position.position_id
                        && entry.tick_lower == position.tick_lower
                        && entry.tick_upper == position.tick_upper)
                });
                if owned.entries.is_empty() {
                    self.state.ledger_mut().delete(key.as_str());
                } else {
                    self.state
                        .ledger_mut()
                        .put_object(&key, &OwnerPositions::V0(owned))?;
                }
            }
            Ok(())
        } else {
            self.state
                .ledger_mut()
                .put_object(pos_key, &Position::V0(position.clone()))
        }
    }

    // ---- swaps ---------------------------------------------------------

    pub fn swap(&mut self, request: SwapRequest) -> Result<SwapResult> {
        self.ensure_not_paused()?;
        let (pool_key, mut pool) =
            self.load_pool(&request.token0, &request.token1, request.fee)?;
        self.ensure_pool_access(&pool)?;
        let caller = self.state.caller();
        let pool_hash = pool.pool_hash();
        let pool_alias = pool.pool_alias();

        let (exact, magnitude) = exact_and_magnitude(request.amount)?;
        let limit = request.sqrt_price_limit.unwrap_or_else(|| {
            if request.zero_for_one {
                min_sqrt_price()
            } else {
                max_sqrt_price()
            }
        });
        let chunk = self.steps_per_yield()?;

        let mut swap_host = StateSwapHost {
            state: &mut *self.state,
            pool_hash: pool_hash.clone(),
        };
        let (amount0, amount1) = pool.swap(
            &mut swap_host,
            request.zero_for_one,
            exact,
            magnitude,
            limit,
            chunk,
        )?;

        let paid = (if request.zero_for_one { amount0 } else { amount1 })
            .try_into_unsigned()
            .map_err(|_| error_here!(ErrorKind::InternalLogicError))?;
        let received_signed = if request.zero_for_one { amount1 } else { amount0 };
        let received = (-received_signed)
            .try_into_unsigned()
            .map_err(|_| error_here!(ErrorKind::InternalLogicError))?;
        if let Some(minimum) = request.amount_out_min {
            ensure_here!(
                received >= minimum,
                ErrorKind::SlippageToleranceExceeded {
                    actual: received_signed.to_decimal_string(8),
                }
            );
        }
        if let Some(maximum) = request.amount_in_max {
            ensure_here!(
                paid <= maximum,
                ErrorKind::SlippageToleranceExceeded {
                    actual: paid.to_decimal_string(8),
                }
            );
        }

        self.state
            .ledger_mut()
            .put_object(&pool_key, &Pool::V0(pool.clone()))?;

        let payer = request.on_behalf_of.unwrap_or_else(|| caller.clone());
        let authority = (payer != caller).then(|| caller.clone());
        let (token_in, token_out) = if request.zero_for_one {
            (&pool.token0_class_key, &pool.token1_class_key)
        } else {
            (&pool.token1_class_key, &pool.token0_class_key)
        };
        self.transfer(&payer, &pool_alias, token_in, paid, authority)?;
        self.transfer(&pool_alias, &payer, token_out, received, None)?;

        self.state.logger_mut().log_event(Event::Swapped {
            user: payer,
            pool_hash,
            amount0: amount0.to_decimal_string(8),
            amount1: amount1.to_decimal_string(8),
            sqrt_price: pool.sqrt_price.to_decimal_string(18),
        });
        Ok(SwapResult {
            amount0,
            amount1,
            sqrt_price: pool.sqrt_price,
        })
    }

    /// Read-only swap evaluation; works against the live ledger (through a
    /// discarded staged view) or a supplied snapshot.
    pub fn quote_exact_amount(&mut self, request: QuoteExactAmountRequest) -> Result<QuoteResult> {
        let (exact, magnitude) = exact_and_magnitude(request.amount)?;
        let chunk = self.steps_per_yield()?;

        let mut pool = match &request.snapshot {
            Some(snapshot) => {
                let Pool::V0(pool) = snapshot.pool.clone();
                pool
            }
            None => {
                self.load_pool(&request.token0, &request.token1, request.fee)?
                    .1
            }
        };
        let limit = request.sqrt_price_limit.unwrap_or_else(|| {
            if request.zero_for_one {
                min_sqrt_price()
            } else {
                max_sqrt_price()
            }
        });

        let (amount0, amount1) = match request.snapshot {
            Some(snapshot) => {
                let mut host = SnapshotSwapHost {
                    ticks: snapshot
                        .ticks
                        .into_iter()
                        .map(|(index, TickData::V0(data))| (index, data))
                        .collect(),
                };
                pool.swap(&mut host, request.zero_for_one, exact, magnitude, limit, chunk)?
            }
            None => {
                let pool_hash = pool.pool_hash();
                let mut staged = StagedView::new(self.state.ledger_mut());
                let mut host = StoreSwapHost {
                    store: &mut staged,
                    pool_hash,
                };
                let amounts =
                    pool.swap(&mut host, request.zero_for_one, exact, magnitude, limit, chunk)?;
                staged.discard();
                amounts
            }
        };
        Ok(QuoteResult {
            amount0,
            amount1,
            new_sqrt_price: pool.sqrt_price,
        })
    }

    // ---- reads ---------------------------------------------------------

    pub fn get_pool_data(
        &self,
        token0: &str,
        token1: &str,
        fee: crate::ledger::BasisPoints,
    ) -> Result<Pool> {
        Ok(Pool::V0(self.load_pool(token0, token1, fee)?.1))
    }

    pub fn slot0(
        &self,
        token0: &str,
        token1: &str,
        fee: crate::ledger::BasisPoints,
    ) -> Result<Slot0> {
        let (_, pool) = self.load_pool(token0, token1, fee)?;
        Ok(Slot0 {
            sqrt_price: pool.sqrt_price,
            tick: pool.current_tick()?,
            liquidity: pool.liquidity,
            gross_pool_liquidity: pool.gross_pool_liquidity,
        })
    }

    pub fn liquidity(
        &self,
        token0: &str,
        token1: &str,
        fee: crate::ledger::BasisPoints,
    ) -> Result<Liquidity> {
        Ok(self.load_pool(token0, token1, fee)?.1.liquidity)
    }

    pub fn get_positions(
        &self,
        token0: &str,
        token1: &str,
        fee: crate::ledger::BasisPoints,
        owner: &AccountId,
    ) -> Result<Vec<Position>> {
        let (_, pool) = self.load_pool(token0, token1, fee)?;
        let pool_hash = pool.pool_hash();
        let record: Option<OwnerPositions> = self
            .state
            .ledger()
            .get_object(&owner_positions_key(owner, &pool_hash))?;
        let Some(OwnerPositions::V0(owned)) = record else {
            return Ok(Vec::new());
        };
        owned
            .entries
            .iter()
            .map(|entry| {
                let key = position_key(
                    &pool_hash,
                    entry.tick_lower,
                    entry.tick_upper,
                    &entry.position_id,
                );
                let record: Option<Position> = self.state.ledger().get_object(&key)?;
                record.ok_or_else(|| error_here!(ErrorKind::PositionNotFound))
            })
            .collect()
    }

    // ---- limit orders --------------------------------------------------

    pub fn place_limit_order(&mut self, request: PlaceLimitOrderRequest) -> Result<String> {
        self.ensure_not_paused()?;
        ensure_here!(!request.hash.is_empty(), ErrorKind::InvalidParams);
        let key = commitment_key(&request.hash);
        let existing: Option<Commitment> = self.state.ledger().get_object(&key)?;
        ensure_here!(existing.is_none(), ErrorKind::DuplicateCommitment);
        if request.expires != 0 {
            ensure_here!(
                request.expires > self.state.clock().unix_time(),
                ErrorKind::InvalidParams
            );
        }
        self.state.ledger_mut().put_object(
            &key,
            &Commitment::V0(CommitmentV0 {
                hash: request.hash.clone(),
                expires: request.expires,
            }),
        )?;
        self.state.logger_mut().log_event(Event::LimitOrderPlaced {
            commitment_id: request.hash.clone(),
            expires: request.expires,
        });
        Ok(request.hash)
    }

    fn load_commitment_authorized(
        &self,
        preimage: &LimitOrderPreimage,
    ) -> Result<(CompositeKey, CommitmentV0)> {
        let hash = preimage.hash();
        let key = commitment_key(&hash);
        let record: Option<Commitment> = self.state.ledger().get_object(&key)?;
        // A preimage that does not hash to a stored commitment is
        // indistinguishable from an absent one.
        let Some(Commitment::V0(commitment)) = record else {
            return Err(error_here!(ErrorKind::CommitmentNotFound));
        };
        let caller = self.state.caller();
        if caller != preimage.owner {
            let admins = self.limit_order_config()?.map(|c| c.admins).unwrap_or_default();
            ensure_here!(admins.contains(&caller), ErrorKind::Unauthorized);
        }
        Ok((key, commitment))
    }

    pub fn cancel_limit_order(&mut self, request: CancelLimitOrderRequest) -> Result<()> {
        self.ensure_not_paused()?;
        let (key, commitment) = self.load_commitment_authorized(&request.preimage)?;
        self.state.ledger_mut().delete(key.as_str());
        self.state
            .logger_mut()
            .log_event(Event::LimitOrderCancelled {
                commitment_id: commitment.hash,
            });
        Ok(())
    }

    pub fn fill_limit_order(&mut self, request: FillLimitOrderRequest) -> Result<()> {
        self.ensure_not_paused()?;
        let preimage = &request.preimage;
        let (commitment_ledger_key, commitment) = self.load_commitment_authorized(preimage)?;
        let now = self.state.clock().unix_time();
        if commitment.expires != 0 {
            ensure_here!(now <= commitment.expires, ErrorKind::CommitmentExpired);
        }

        // Pools are keyed with the pair in canonical order; one scan yields
        // every fee tier, ascending.
        let selling_first = preimage.selling_token < preimage.buying_token;
        let (token0, token1) = swap_if(
            !selling_first,
            (&preimage.selling_token, &preimage.buying_token),
        );
        let zero_for_one = selling_first;
        let sqrt_ratio = preimage.buying_to_selling_ratio.integer_sqrt();
        ensure_here!(!sqrt_ratio.is_zero(), ErrorKind::InvalidParams);
        // The committed ratio bounds the execution price; clamped to the
        // representable range so an extreme ratio degrades to "any price".
        let sqrt_price_limit = if zero_for_one {
            sqrt_ratio.max(min_sqrt_price())
        } else {
            sqrt_ratio.recip().min(max_sqrt_price())
        };
        let chunk = self.steps_per_yield()?;

        let prefix = CompositeKey::partial(index::POOL, &[token0.as_str(), token1.as_str()]);
        let pools: Vec<(String, Pool)> = self.state.ledger().range_objects(&prefix)?;

        let mut remaining = preimage.selling_amount;
        let mut bought = Amount::zero();
        for (_, Pool::V0(stored_pool)) in pools {
            if remaining.is_zero_dp(8) {
                break;
            }
            let mut pool = stored_pool;
            let pool_hash = pool.pool_hash();
            let pool_alias = pool.pool_alias();
            let pool_record_key = pool.composite_key();

            // Sandboxed per-pool attempt: writes reach the request view only
            // if this pool's swap succeeds with the limit price honored.
            let mut staged = StagedView::new(self.state.ledger_mut());
            let mut swap_host = StoreSwapHost {
                store: &mut staged,
                pool_hash: pool_hash.clone(),
            };
            let swapped = pool.swap(
                &mut swap_host,
                zero_for_one,
                Exact::In,
                remaining,
                sqrt_price_limit,
                chunk,
            );
            let (amount0, amount1) = match swapped {
                Ok(amounts) => amounts,
                Err(_) => {
                    // Unfavorably priced or illiquid venue; skip it.
                    staged.discard();
                    continue;
                }
            };
            let consumed = (if zero_for_one { amount0 } else { amount1 })
                .try_into_unsigned()
                .map_err(|_| error_here!(ErrorKind::InternalLogicError))?;
            let out = (if zero_for_one { -amount1 } else { -amount0 })
                .try_into_unsigned()
                .map_err(|_| error_here!(ErrorKind::InternalLogicError))?;
            if consumed.is_zero_dp(8) || out.is_zero() {
                staged.discard();
                continue;
            }
            staged.put_object(&pool_record_key, &Pool::V0(pool))?;
            staged.promote()?;

            self.transfer(
                &preimage.owner,
                &pool_alias,
                &preimage.selling_token,
                consumed,
                None,
            )?;
            self.transfer(
                &pool_alias,
                &preimage.owner,
                &preimage.buying_token,
                out,
                None,
            )?;
            remaining = remaining.saturating_sub(consumed);
            bought += out;
        }

        ensure_here!(
            bought >= preimage.buying_minimum,
            ErrorKind::LimitOrderMinimumNotMet {
                bought: bought.to_decimal_string(8),
                minimum: preimage.buying_minimum.to_decimal_string(8),
            }
        );

        self.state.ledger_mut().delete(commitment_ledger_key.as_str());
        self.state.ledger_mut().put_object(
            &fulfilled_order_key(&commitment.hash),
            &FulfilledOrder::V0(FulfilledOrderV0 {
                owner: preimage.owner.clone(),
                selling_token: preimage.selling_token.clone(),
                buying_token: preimage.buying_token.clone(),
                selling_amount: preimage.selling_amount,
                buying_minimum: preimage.buying_minimum,
                buying_to_selling_ratio: preimage.buying_to_selling_ratio,
                expires: preimage.expires,
                commitment_nonce: preimage.commitment_nonce.clone(),
                quantity_bought: bought,
                filled_at: now,
            }),
        )?;
        self.state.logger_mut().log_event(Event::LimitOrderFilled {
            commitment_id: commitment.hash,
            quantity_bought: bought.to_decimal_string(8),
        });
        Ok(())
    }

    // ---- configuration and protocol fees -------------------------------

    pub fn set_global_limit_order_config(&mut self, admins: Vec<AccountId>) -> Result<()> {
        if let Some(config) = self.limit_order_config()? {
            ensure_here!(
                config.admins.contains(&self.state.caller()),
                ErrorKind::Unauthorized
            );
        }
        self.state.ledger_mut().put_object(
            &limit_order_config_key(),
            &LimitOrderConfig::V0(LimitOrderConfigV0 { admins }),
        )
    }

    pub fn configure_dex_fee(&mut self, request: ConfigureDexFeeRequest) -> Result<()> {
        ensure_here!(
            request.protocol_fee_fraction <= Fraction::one(),
            ErrorKind::InvalidParams
        );
        ensure_here!(request.steps_per_yield >= 1, ErrorKind::InvalidParams);
        let paused = match self.fee_config()? {
            Some(config) => {
                ensure_here!(
                    config.authorities.contains(&self.state.caller()),
                    ErrorKind::Unauthorized
                );
                config.paused
            }
            None => false,
        };
        self.state.ledger_mut().put_object(
            &dex_fee_config_key(),
            &DexFeeConfig::V0(DexFeeConfigV0 {
                protocol_fee_fraction: request.protocol_fee_fraction,
                recipient: request.recipient,
                authorities: request.authorities,
                steps_per_yield: request.steps_per_yield,
                paused,
            }),
        )
    }

    pub fn collect_protocol_fees(
        &mut self,
        request: CollectProtocolFeesRequest,
    ) -> Result<(Amount, Amount)> {
        let config = self
            .fee_config()?
            .ok_or_else(|| error_here!(ErrorKind::NotConfigured))?;
        ensure_here!(
            config.authorities.contains(&self.state.caller()),
            ErrorKind::Unauthorized
        );
        let (pool_key, mut pool) =
            self.load_pool(&request.token0, &request.token1, request.fee)?;
        let pool_hash = pool.pool_hash();
        let pool_alias = pool.pool_alias();
        let balance0 = self
            .state
            .tokens()
            .balance_of(&pool_alias, &pool.token0_class_key);
        let balance1 = self
            .state
            .tokens()
            .balance_of(&pool_alias, &pool.token1_class_key);
        let (amount0, amount1) = pool.collect_protocol_fees(balance0, balance1);
        self.state
            .ledger_mut()
            .put_object(&pool_key, &Pool::V0(pool.clone()))?;
        self.transfer(
            &pool_alias,
            &request.recipient,
            &pool.token0_class_key,
            amount0,
            None,
        )?;
        self.transfer(
            &pool_alias,
            &request.recipient,
            &pool.token1_class_key,
            amount1,
            None,
        )?;
        self.state
            .logger_mut()
            .log_event(Event::ProtocolFeesCollected {
                recipient: request.recipient,
                pool_hash,
                amounts: (amount0, amount1).map(|a| a.to_decimal_string(8)),
            });
        Ok((amount0, amount1))
    }

    pub fn emergency_pause(&mut self) -> Result<()> {
        self.set_paused(true)
    }

    pub fn emergency_resume(&mut self) -> Result<()> {
        self.set_paused(false)
    }

    fn set_paused(&mut self, paused: bool) -> Result<()> {
        let mut config = self
            .fee_config()?
            .ok_or_else(|| error_here!(ErrorKind::NotConfigured))?;
        let caller = self.state.caller();
        ensure_here!(
            config.authorities.contains(&caller),
            ErrorKind::Unauthorized
        );
        config.paused = paused;
        self.state
            .ledger_mut()
            .put_object(&dex_fee_config_key(), &DexFeeConfig::V0(config))?;
        let event = if paused {
            Event::EmergencyPause { account: caller }
        } else {
            Event::EmergencyResume { account: caller }
        };
        self.state.logger_mut().log_event(event);
        Ok(())
    }
}

/// Positive specified amount bounds the input; negative bounds the output.
fn exact_and_magnitude(amount: AmountSigned) -> Result<(Exact, Amount)> {
    ensure_here!(!amount.is_zero(), ErrorKind::InvalidParams);
    let exact = if amount.is_negative() {
        Exact::Out
    } else {
        Exact::In
    };
    Ok((exact, amount.abs()))
}

/// Liquidity funded by a one-sided amount at the current pool price.
fn derive_liquidity(
    pool: &PoolV0,
    tick_lower: Tick,
    tick_upper: Tick,
    amount: Amount,
    side: AmountSide,
) -> Result<Liquidity> {
    use super::sqrt_price_math::{liquidity_from_amount0, liquidity_from_amount1};
    use super::tick_math::tick_to_sqrt_price;

    ensure_here!(tick_lower < tick_upper, ErrorKind::TickRangeInvalid);
    let sqrt_lower = tick_to_sqrt_price(tick_lower);
    let sqrt_upper = tick_to_sqrt_price(tick_upper);
    let sqrt_current = pool.sqrt_price;
    match side {
        AmountSide::Token0 => {
            // Token0 sits above the current price.
            ensure_here!(sqrt_current < sqrt_upper, ErrorKind::InvalidParams);
            let lower_bound = sqrt_lower.max(sqrt_current);
            Ok(liquidity_from_amount0(lower_bound, sqrt_upper, amount))
        }
        AmountSide::Token1 => {
            // Token1 sits below the current price.
            ensure_here!(sqrt_current > sqrt_lower, ErrorKind::InvalidParams);
            let upper_bound = sqrt_upper.min(sqrt_current);
            Ok(liquidity_from_amount1(sqrt_lower, upper_bound, amount))
        }
    }
}
