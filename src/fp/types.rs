#![allow(clippy::all, clippy::pedantic)]

use serde::{Deserialize, Serialize};
use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer, constructed out of 4 words x 64 bits.
    /// Raw representation of the Q128.128 fixed point and of the tick
    /// bitmap words.
    #[derive(Serialize, Deserialize)]
    pub struct U256(4);
}

construct_uint! {
    /// 512-bit unsigned integer, constructed out of 8 words x 64 bits.
    /// Intermediate width for the fixed-point division.
    #[derive(Serialize, Deserialize)]
    pub struct U512(8);
}
