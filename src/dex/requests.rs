//! The request surface.
//!
//! Every operation takes an explicit record of inputs; the authenticated
//! caller identity comes from the host state, never from ambient context.

use serde::{Deserialize, Serialize};

use super::limit_order::LimitOrderPreimage;
use super::state_types::{Pool, TickData};
use super::tick::Tick;
use crate::ledger::{
    AccountId, Amount, AmountSigned, BasisPoints, Fraction, Liquidity, SqrtPrice, TokenClassKey,
};

/// Which side of the pair a one-sided liquidity amount denominates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmountSide {
    Token0,
    Token1,
}

#[derive(Clone, Debug)]
pub struct CreatePoolRequest {
    pub token0: TokenClassKey,
    pub token1: TokenClassKey,
    pub fee: BasisPoints,
    pub initial_sqrt_price: SqrtPrice,
    pub is_private: bool,
    pub whitelist: Vec<AccountId>,
}

#[derive(Clone, Debug)]
pub struct PoolMetadata {
    pub pool_hash: String,
    pub pool_alias: AccountId,
    pub token0: TokenClassKey,
    pub token1: TokenClassKey,
    pub fee: BasisPoints,
    pub sqrt_price: SqrtPrice,
}

#[derive(Clone, Debug)]
pub struct AddLiquidityRequest {
    pub token0: TokenClassKey,
    pub token1: TokenClassKey,
    pub fee: BasisPoints,
    pub tick_lower: i32,
    pub tick_upper: i32,
    /// One-sided amount; the liquidity and the other side follow from the
    /// current pool price.
    pub amount: Amount,
    pub amount_side: AmountSide,
    pub amount0_min: Amount,
    pub amount1_min: Amount,
    pub position_id: String,
}

#[derive(Clone, Debug)]
pub struct RemoveLiquidityRequest {
    pub token0: TokenClassKey,
    pub token1: TokenClassKey,
    pub fee: BasisPoints,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub position_id: String,
    /// Liquidity to burn; may be zero to settle fees only.
    pub amount: AmountSigned,
    pub amount0_min: Amount,
    pub amount1_min: Amount,
    pub recipient: Option<AccountId>,
}

#[derive(Clone, Debug)]
pub struct CollectPositionFeesRequest {
    pub token0: TokenClassKey,
    pub token1: TokenClassKey,
    pub fee: BasisPoints,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub position_id: String,
    pub amount0_requested: Amount,
    pub amount1_requested: Amount,
    pub recipient: Option<AccountId>,
}

#[derive(Clone, Debug)]
pub struct SwapRequest {
    pub token0: TokenClassKey,
    pub token1: TokenClassKey,
    pub fee: BasisPoints,
    /// Positive: exact input of the sold token. Negative: exact output of
    /// the bought token.
    pub amount: AmountSigned,
    pub zero_for_one: bool,
    /// Defaults to the representable price bound in the swap direction.
    pub sqrt_price_limit: Option<SqrtPrice>,
    pub amount_in_max: Option<Amount>,
    pub amount_out_min: Option<Amount>,
    pub on_behalf_of: Option<AccountId>,
}

#[derive(Clone, Debug)]
pub struct SwapResult {
    pub amount0: AmountSigned,
    pub amount1: AmountSigned,
    pub sqrt_price: SqrtPrice,
}

/// Pool plus tick records captured for offline quoting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pool: Pool,
    pub ticks: Vec<(i32, TickData)>,
}

#[derive(Clone, Debug)]
pub struct QuoteExactAmountRequest {
    pub token0: TokenClassKey,
    pub token1: TokenClassKey,
    pub fee: BasisPoints,
    pub amount: AmountSigned,
    pub zero_for_one: bool,
    pub sqrt_price_limit: Option<SqrtPrice>,
    /// When present the quote runs entirely against the snapshot.
    pub snapshot: Option<PoolSnapshot>,
}

#[derive(Clone, Debug)]
pub struct QuoteResult {
    pub amount0: AmountSigned,
    pub amount1: AmountSigned,
    pub new_sqrt_price: SqrtPrice,
}

/// Pool head state, the V3 "slot0".
#[derive(Clone, Debug)]
pub struct Slot0 {
    pub sqrt_price: SqrtPrice,
    pub tick: Tick,
    pub liquidity: Liquidity,
    pub gross_pool_liquidity: Liquidity,
}

#[derive(Clone, Debug)]
pub struct PlaceLimitOrderRequest {
    pub hash: String,
    pub expires: u64,
}

#[derive(Clone, Debug)]
pub struct CancelLimitOrderRequest {
    pub preimage: LimitOrderPreimage,
}

#[derive(Clone, Debug)]
pub struct FillLimitOrderRequest {
    pub preimage: LimitOrderPreimage,
}

#[derive(Clone, Debug)]
pub struct ConfigureDexFeeRequest {
    pub protocol_fee_fraction: Fraction,
    pub recipient: AccountId,
    pub authorities: Vec<AccountId>,
    pub steps_per_yield: u32,
}

#[derive(Clone, Debug)]
pub struct CollectProtocolFeesRequest {
    pub token0: TokenClassKey,
    pub token1: TokenClassKey,
    pub fee: BasisPoints,
    pub recipient: AccountId,
}
