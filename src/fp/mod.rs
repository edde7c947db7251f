//! Fixed-point numerics for the pricing path.
//!
//! Everything here is deterministic big-integer arithmetic built on
//! [`uint::construct_uint`]; native floating point is never used.

mod decimal;
mod error;
mod i128x128;
mod types;
mod u128x128;

pub use decimal::MAX_DECIMAL_PLACES;
pub use error::Error;
pub use i128x128::I128X128;
pub use types::{U256, U512};
pub use u128x128::U128X128;

/// Direction in which an inexact operation resolves its lost tail.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

impl Rounding {
    pub fn opposite(self) -> Self {
        match self {
            Rounding::Down => Rounding::Up,
            Rounding::Up => Rounding::Down,
        }
    }
}
