//! Packed tick initialized state.
//!
//! One word stores 256 packed tick flags; the map from word position to
//! word is sparse and owned by the pool record. Absent words read as zero;
//! words that empty out stay stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bit_math;
use super::tick::Tick;
use crate::fp::U256;

/// The position in the mapping where the initialized bit for a tick lives
struct BitPosition {
    word_pos: i16,
    bit_pos: u8,
}

/// `tick / spacing`, floored toward negative infinity.
fn compress(tick: i32, tick_spacing: u16) -> i32 {
    let spacing = i32::from(tick_spacing);
    let mut compressed = tick / spacing;
    if tick < 0 && tick % spacing != 0 {
        compressed -= 1;
    }
    compressed
}

fn position(compressed: i32) -> BitPosition {
    BitPosition {
        // arithmetic shift floors toward negative infinity
        word_pos: (compressed >> 8) as i16,
        bit_pos: compressed.rem_euclid(256) as u8,
    }
}

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickBitmap {
    words: BTreeMap<i16, U256>,
}

impl TickBitmap {
    fn word(&self, word_pos: i16) -> U256 {
        self.words.get(&word_pos).copied().unwrap_or_default()
    }

    /// Flips the initialized state for a given tick from false to true, or vice versa
    pub fn flip(&mut self, tick: Tick, tick_spacing: u16) {
        debug_assert!(tick.is_aligned(tick_spacing));
        let pos = position(compress(tick.index(), tick_spacing));
        let word = self.word(pos.word_pos);
        let mask = U256::one() << pos.bit_pos;
        self.words.insert(pos.word_pos, word ^ mask);
    }

    pub fn is_initialised(&self, tick: Tick, tick_spacing: u16) -> bool {
        let pos = position(compress(tick.index(), tick_spacing));
        !(self.word(pos.word_pos) & (U256::one() << pos.bit_pos)).is_zero()
    }

    /// Every tick whose bit is set, in ascending order.
    pub fn initialised_ticks(&self, tick_spacing: u16) -> Vec<i32> {
        let spacing = i32::from(tick_spacing);
        let mut ticks = Vec::new();
        for (word_pos, word) in &self.words {
            for bit in 0..256u32 {
                if !(*word & (U256::one() << bit)).is_zero() {
                    let compressed = i32::from(*word_pos) * 256 + bit as i32;
                    ticks.push(compressed * spacing);
                }
            }
        }
        ticks
    }

    /// Next initialized tick at most one word away from `tick`, searching
    /// down (`lte`, price decreasing) or up. The returned tick index is not
    /// clamped to the valid range; the swap stepper handles the bounds.
    ///
    /// Returns `(next_tick, initialised)`; when no bit is set in the probed
    /// word, the word-boundary tick comes back with `initialised == false`.
    pub fn next_initialised_tick_within_one_word(
        &self,
        tick: i32,
        tick_spacing: u16,
        lte: bool,
    ) -> (i32, bool) {
        let spacing = i32::from(tick_spacing);
        let compressed = compress(tick, tick_spacing);
        if lte {
            let pos = position(compressed);
            // all the 1s at or to the right of the current bit_pos
            let mask = ((U256::one() << pos.bit_pos) - 1) + (U256::one() << pos.bit_pos);
            let masked = self.word(pos.word_pos) & mask;
            let initialised = !masked.is_zero();
            let next = if initialised {
                compressed - i32::from(pos.bit_pos - bit_math::most_significant_bit(masked))
            } else {
                compressed - i32::from(pos.bit_pos)
            };
            (next * spacing, initialised)
        } else {
            // start from the word of the next tick position
            let pos = position(compressed + 1);
            // all the 1s at or to the left of the bit_pos
            let mask = !((U256::one() << pos.bit_pos) - 1);
            let masked = self.word(pos.word_pos) & mask;
            let initialised = !masked.is_zero();
            let next = if initialised {
                compressed + 1 + i32::from(bit_math::least_significant_bit(masked) - pos.bit_pos)
            } else {
                compressed + 1 + i32::from(u8::MAX - pos.bit_pos)
            };
            (next * spacing, initialised)
        }
    }
}
