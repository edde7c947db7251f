//! Host capabilities consumed by the dex core: the key/value ledger, the
//! token subledger, the transaction clock and the event sink. The core only
//! ever sees these traits, so it runs unchanged against the in-memory
//! implementations used in tests.

pub mod events;
pub mod keys;
pub mod kv;
pub mod memory;
pub mod staged;
pub mod tokens;

pub use events::{BufferedLogger, Event, Logger};
pub use keys::CompositeKey;
pub use kv::{ObjectStore, ObjectStoreExt};
pub use memory::InMemoryLedger;
pub use staged::StagedView;
pub use tokens::{
    Allowance, AllowanceKind, AllowanceQuery, InMemoryTokenLedger, TokenLedger, TransferRequest,
};

use crate::fp;

pub type AccountId = String;
/// Canonical string form of a token class; pools order their pair by it.
pub type TokenClassKey = String;

pub type BasisPoints = u16;
pub const BASIS_POINT_DIVISOR: BasisPoints = 10_000;

pub type Amount = fp::U128X128;
pub type AmountSigned = fp::I128X128;
pub type SqrtPrice = fp::U128X128;
pub type Liquidity = fp::U128X128;
pub type LiquidityNet = fp::I128X128;
pub type FeeGrowth = fp::U128X128;
pub type Fraction = fp::U128X128;

/// Transaction-time source; one reading per request.
pub trait TxClock {
    fn unix_time(&self) -> u64;
}

/// Fixed clock for deterministic tests.
pub struct FixedClock(pub u64);

impl TxClock for FixedClock {
    fn unix_time(&self) -> u64 {
        self.0
    }
}
