//! Per-user, per-asset balances.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use simchain_core::Amount;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BalanceSheet {
    balances: HashMap<String, HashMap<String, Amount>>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        BalanceSheet {
            balances: HashMap::new(),
        }
    }

    pub fn get(&self, user_id: &str, asset: &str) -> Amount {
        self.balances
            .get(user_id)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(0)
    }

    pub fn deposit(&mut self, user_id: &str, asset: &str, amount: Amount) {
        *self
            .balances
            .entry(user_id.to_string())
            .or_default()
            .entry(asset.to_string())
            .or_insert(0) += amount;
    }

    /// Debits `amount` of `asset` from `user_id`, failing if the balance is
    /// insufficient. Never leaves a negative balance.
    pub fn withdraw(&mut self, user_id: &str, asset: &str, amount: Amount) -> bool {
        let Some(assets) = self.balances.get_mut(user_id) else {
            return false;
        };
        let Some(balance) = assets.get_mut(asset) else {
            return false;
        };
        if *balance < amount {
            return false;
        }
        *balance -= amount;
        true
    }

    pub fn all_for_user(&self, user_id: &str) -> HashMap<String, Amount> {
        self.balances.get(user_id).cloned().unwrap_or_default()
    }

    /// The full balance table, for persistence snapshots.
    pub fn snapshot(&self) -> HashMap<String, HashMap<String, Amount>> {
        self.balances.clone()
    }

    pub fn restore(balances: HashMap<String, HashMap<String, Amount>>) -> Self {
        BalanceSheet { balances }
    }
}
