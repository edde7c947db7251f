//! Persisted record types.
//!
//! Every stored object is wrapped in a versioned enum so the layout can
//! evolve without rewriting the ledger; the serialized form tags the
//! version variant.

use paste::paste;
use serde::{Deserialize, Serialize};

use super::bitmap::TickBitmap;
use super::tick::{FeeTier, Tick};
use crate::ledger::{
    AccountId, Amount, AmountSigned, FeeGrowth, Fraction, Liquidity, LiquidityNet, SqrtPrice,
    TokenClassKey,
};

macro_rules! versioned {
    ($pub:vis $enum_name:ident {
        $($ver_num:literal => { $($struct_body:tt)* }),+
    }) => {
        paste! {
            #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
            $pub enum $enum_name {
                $(
                    [<V $ver_num>]([<$enum_name V $ver_num>]),
                )+
            }

            $(
                #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
                $pub struct [<$enum_name V $ver_num>] {
                    $($struct_body)*
                }
            )+

            versioned!{ @latest $pub $enum_name => $($ver_num)+ }
        }
    };
    // Generates type alias for last struct definition
    (@latest $pub:vis $enum_name:ident => $ver_num_head:literal $($ver_num_tail:literal)+) => {
        versioned! { @latest $pub $enum_name => $($ver_num_tail)+ }
    };
    (@latest $pub:vis $enum_name:ident => $ver_num:literal) => {
        paste!{
            $pub type [<$enum_name Latest>] = [<$enum_name V $ver_num>];
        }
    };
}

versioned! {
    pub Pool {
        0 => {
            /// Token pair in canonical order; immutable once created.
            pub token0_class_key: TokenClassKey,
            pub token1_class_key: TokenClassKey,
            pub fee_tier: FeeTier,
            /// Square root of the current spot price.
            pub sqrt_price: SqrtPrice,
            /// Sum of position liquidity whose range brackets the current tick.
            pub liquidity: Liquidity,
            /// Sum of position liquidity over all positions of the pool.
            pub gross_pool_liquidity: Liquidity,
            /// Packed initialized state of every tick touched by a position.
            pub bitmap: TickBitmap,
            /// Running fee per unit of active liquidity, per token.
            pub fee_growth_global: (FeeGrowth, FeeGrowth),
            /// Uncollected protocol share, per token.
            pub protocol_fees: (Amount, Amount),
            /// Portion of the LP fee routed to the protocol, captured from
            /// the global fee configuration at creation.
            pub protocol_fee_fraction: Fraction,
            pub creator: AccountId,
            pub is_private: bool,
            pub whitelist: Vec<AccountId>,
        }
    }
}

versioned! {
    pub TickData {
        0 => {
            /// Sum of |net-liquidity-change| attributable at this tick.
            pub liquidity_gross: Liquidity,
            /// Liquidity added when crossing left to right, subtracted right
            /// to left.
            pub liquidity_net: LiquidityNet,
            /// Fee growth on the side of this tick away from the current
            /// price, per token.
            pub fee_growth_outside: (FeeGrowth, FeeGrowth),
            pub initialised: bool,
        }
    }
}

versioned! {
    pub Position {
        0 => {
            pub owner: AccountId,
            pub tick_lower: Tick,
            pub tick_upper: Tick,
            pub position_id: String,
            pub liquidity: Liquidity,
            /// Snapshot used to compute newly owed fees on the next update.
            pub fee_growth_inside_last: (AmountSigned, AmountSigned),
            /// Fee tokens ready to collect.
            pub tokens_owed: (Amount, Amount),
        }
    }
}

/// Pointer record from `(owner, pool)` to the positions the owner holds there.
versioned! {
    pub OwnerPositions {
        0 => {
            pub entries: Vec<PositionRef>,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionRef {
    pub tick_lower: Tick,
    pub tick_upper: Tick,
    pub position_id: String,
}

versioned! {
    pub Commitment {
        0 => {
            pub hash: String,
            pub expires: u64,
        }
    }
}

versioned! {
    pub FulfilledOrder {
        0 => {
            pub owner: AccountId,
            pub selling_token: TokenClassKey,
            pub buying_token: TokenClassKey,
            pub selling_amount: Amount,
            pub buying_minimum: Amount,
            pub buying_to_selling_ratio: Fraction,
            pub expires: u64,
            pub commitment_nonce: String,
            pub quantity_bought: Amount,
            pub filled_at: u64,
        }
    }
}

/// Singleton: admin identities allowed to cancel or fill any commitment.
versioned! {
    pub LimitOrderConfig {
        0 => {
            pub admins: Vec<AccountId>,
        }
    }
}

/// Singleton: protocol fee routing plus contract-wide switches.
versioned! {
    pub DexFeeConfig {
        0 => {
            /// Fraction of the LP fee routed to the protocol, in [0, 1].
            pub protocol_fee_fraction: Fraction,
            pub recipient: AccountId,
            /// Accounts allowed to change this config, collect protocol
            /// fees, and pause or resume the contract.
            pub authorities: Vec<AccountId>,
            /// Swap-stepper yield cadence.
            pub steps_per_yield: u32,
            pub paused: bool,
        }
    }
}
