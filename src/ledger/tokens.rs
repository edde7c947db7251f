//! The token subledger capability.
//!
//! The dex never mutates balances directly; it emits transfer requests
//! against this interface. The host guarantees the subledger participates
//! in request-level atomicity, which the in-memory implementation provides
//! through cloning in the request wrapper.

use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AccountId, Amount, TokenClassKey};
use crate::dex::{ErrorKind, Result};
use crate::{ensure_here, error_here};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllowanceKind {
    Transfer,
    Spend,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Allowance {
    pub granted_by: AccountId,
    pub granted_to: AccountId,
    pub token: TokenClassKey,
    pub kind: AllowanceKind,
    pub quantity_remaining: Amount,
}

#[derive(Clone, Debug)]
pub struct AllowanceQuery {
    pub granted_by: Option<AccountId>,
    pub granted_to: AccountId,
    pub token: TokenClassKey,
    pub kind: AllowanceKind,
    pub limit: usize,
}

/// One balance movement. When `on_behalf_of` names an authority other than
/// `from`, the subledger spends a matching transfer allowance.
#[derive(Clone, Debug)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub token: TokenClassKey,
    pub quantity: Amount,
    pub on_behalf_of: Option<AccountId>,
}

pub trait TokenLedger {
    fn balance_of(&self, owner: &AccountId, token: &TokenClassKey) -> Amount;
    fn transfer(&mut self, request: TransferRequest) -> Result<()>;
    fn grant_allowance(&mut self, allowance: Allowance);
    fn fetch_allowances(&self, query: &AllowanceQuery) -> Vec<Allowance>;
    /// Removes matching allowances, returns how many were dropped.
    fn delete_allowances(
        &mut self,
        granted_by: &AccountId,
        granted_to: &AccountId,
        token: &TokenClassKey,
    ) -> usize;
}

#[derive(Default, Clone)]
pub struct InMemoryTokenLedger {
    balances: BTreeMap<(AccountId, TokenClassKey), Amount>,
    allowances: Vec<Allowance>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, owner: &AccountId, token: &TokenClassKey, quantity: Amount) {
        let balance = self
            .balances
            .entry((owner.clone(), token.clone()))
            .or_insert_with(Amount::zero);
        *balance += quantity;
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance_of(&self, owner: &AccountId, token: &TokenClassKey) -> Amount {
        self.balances
            .get(&(owner.clone(), token.clone()))
            .copied()
            .unwrap_or_else(Amount::zero)
    }

    fn transfer(&mut self, request: TransferRequest) -> Result<()> {
        if request.quantity.is_zero() {
            return Ok(());
        }
        if let Some(authority) = &request.on_behalf_of {
            if *authority != request.from {
                let allowance = self
                    .allowances
                    .iter_mut()
                    .find(|a| {
                        a.granted_by == request.from
                            && a.granted_to == *authority
                            && a.token == request.token
                            && a.kind == AllowanceKind::Transfer
                            && a.quantity_remaining >= request.quantity
                    })
                    .ok_or_else(|| error_here!(ErrorKind::AllowanceMissing))?;
                allowance.quantity_remaining -= request.quantity;
            }
        }
        let from_key = (request.from.clone(), request.token.clone());
        let held = self
            .balances
            .get(&from_key)
            .copied()
            .unwrap_or_else(Amount::zero);
        ensure_here!(held >= request.quantity, ErrorKind::NotEnoughTokens);
        self.balances.insert(from_key, held - request.quantity);
        let to_balance = self
            .balances
            .entry((request.to, request.token))
            .or_insert_with(Amount::zero);
        *to_balance += request.quantity;
        Ok(())
    }

    fn grant_allowance(&mut self, allowance: Allowance) {
        self.allowances.push(allowance);
    }

    fn fetch_allowances(&self, query: &AllowanceQuery) -> Vec<Allowance> {
        self.allowances
            .iter()
            .filter(|a| {
                a.granted_to == query.granted_to
                    && a.token == query.token
                    && a.kind == query.kind
                    && query
                        .granted_by
                        .as_ref()
                        .map_or(true, |by| a.granted_by == *by)
            })
            .take(query.limit)
            .cloned()
            .collect()
    }

    fn delete_allowances(
        &mut self,
        granted_by: &AccountId,
        granted_to: &AccountId,
        token: &TokenClassKey,
    ) -> usize {
        let before = self.allowances.len();
        self.allowances.retain(|a| {
            !(a.granted_by == *granted_by && a.granted_to == *granted_to && a.token == *token)
        });
        before - self.allowances.len()
    }
}
