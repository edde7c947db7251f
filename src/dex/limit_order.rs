//! Commit/reveal limit orders.
//!
//! The order parameters are first hidden behind a hash; revealing the full
//! preimage either cancels the commitment or fills it across the pools of
//! the token pair. Hashing runs over the same canonical composite byte
//! sequence the ledger keys use, so a preimage has exactly one hash.

use sha2::{Digest, Sha256};

use crate::ledger::keys::index;
use crate::ledger::{AccountId, Amount, CompositeKey, Fraction, TokenClassKey};

/// Full parameters of a limit order; the stored commitment holds only the
/// hash of these fields.
#[derive(Clone, Debug, PartialEq)]
pub struct LimitOrderPreimage {
    pub owner: AccountId,
    pub selling_token: TokenClassKey,
    pub buying_token: TokenClassKey,
    pub selling_amount: Amount,
    pub buying_minimum: Amount,
    /// Minimum acceptable price of the selling token, quoted in the buying
    /// token. The fill derives its per-pool sqrt-price limit from this.
    pub buying_to_selling_ratio: Fraction,
    pub expires: u64,
    pub commitment_nonce: String,
}

impl LimitOrderPreimage {
    /// SHA-256 over the canonical byte sequence of every field.
    pub fn hash(&self) -> String {
        let key = CompositeKey::new(
            index::COMMITMENT,
            &[
                self.owner.as_str(),
                self.selling_token.as_str(),
                self.buying_token.as_str(),
                &self.selling_amount.to_string(),
                &self.buying_minimum.to_string(),
                &self.buying_to_selling_ratio.to_string(),
                &self.expires.to_string(),
                self.commitment_nonce.as_str(),
            ],
        );
        hex::encode(Sha256::digest(key.as_bytes()))
    }
}

/// Ledger key of a stored commitment.
pub fn commitment_key(hash: &str) -> CompositeKey {
    CompositeKey::new(index::COMMITMENT, &[hash])
}

/// Ledger key of a fulfilled-order record; the hash already binds all the
/// commitment data including the nonce.
pub fn fulfilled_order_key(hash: &str) -> CompositeKey {
    CompositeKey::new(index::FULFILLED_ORDER, &[hash])
}

pub fn limit_order_config_key() -> CompositeKey {
    CompositeKey::new(index::LIMIT_ORDER_CONFIG, &[] as &[&str])
}
