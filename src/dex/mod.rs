pub use dex_impl::{Dex, HostState, InMemoryHost};
pub use errors::*;
pub use limit_order::LimitOrderPreimage;
pub use pool::{pool_key, ModifyOutcome};
pub use requests::*;
pub use state_types::*;
pub use swap::{Exact, SwapHost};
pub use tick::{FeeTier, Tick, MAX_TICK, MIN_TICK};
pub use tick_math::{max_sqrt_price, min_sqrt_price, sqrt_price_to_tick, tick_to_sqrt_price};
pub use utils::PairExt;

mod dex_impl;
mod errors;
mod utils;

pub mod bit_math;
pub mod bitmap;
pub mod limit_order;
pub mod pool;
pub mod position;
pub mod requests;
pub mod sqrt_price_math;
pub mod state_types;
pub mod swap;
pub mod tick;
pub mod tick_math;
pub mod tick_state;
