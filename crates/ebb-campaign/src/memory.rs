//! In-memory collaborators.
//!
//! Handles are cheap clones sharing one log behind a `parking_lot::Mutex`,
//! so a caller can hand one clone to a [`Campaign`](crate::Campaign) and
//! inspect balances through another.

use std::collections::HashMap;
use std::sync::Arc;

use ebb_core::traits::{TokenIssuer, ValueRouter};
use ebb_core::types::{AccountId, Amount};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct RouterState {
    payout_balance: Amount,
    forwarded: HashMap<AccountId, Amount>,
    refunded: HashMap<AccountId, Amount>,
}

/// Records forwarded and refunded value.
#[derive(Debug, Clone, Default)]
pub struct MemoryRouter {
    state: Arc<Mutex<RouterState>>,
}

impl MemoryRouter {
    /// Total value held by the payout destination.
    pub fn payout_balance(&self) -> Amount {
        self.state.lock().payout_balance
    }

    /// Value forwarded on behalf of `from`.
    pub fn forwarded_from(&self, from: &AccountId) -> Amount {
        self.state.lock().forwarded.get(from).copied().unwrap_or(0)
    }

    /// Value returned to `to`.
    pub fn refunded_to(&self, to: &AccountId) -> Amount {
        self.state.lock().refunded.get(to).copied().unwrap_or(0)
    }
}

impl ValueRouter for MemoryRouter {
    fn forward(&mut self, from: &AccountId, amount: Amount) {
        let mut state = self.state.lock();
        state.payout_balance = state.payout_balance.saturating_add(amount);
        let entry = state.forwarded.entry(*from).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    fn refund(&mut self, to: &AccountId, amount: Amount) {
        let mut state = self.state.lock();
        let entry = state.refunded.entry(*to).or_insert(0);
        *entry = entry.saturating_add(amount);
    }
}

/// Token balances credited by collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryIssuer {
    balances: Arc<Mutex<HashMap<AccountId, Amount>>>,
}

impl MemoryIssuer {
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.lock().get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.balances.lock().values().fold(0, |acc, v| acc.saturating_add(*v))
    }
}

impl TokenIssuer for MemoryIssuer {
    fn credit(&mut self, to: &AccountId, amount: Amount) {
        let mut balances = self.balances.lock();
        let entry = balances.entry(*to).or_insert(0);
        *entry = entry.saturating_add(amount);
    }
}
