//! The unspent transaction output set: the ledger's balance state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Amount, TxId};

#[derive(Debug, Error)]
pub enum UtxoError {
    #[error("no unspent output at {0}")]
    NotFound(UtxoKey),
}

/// The composite key `"{tx_id}:{output_index}"` identifying a UTXO.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtxoKey(pub String);

impl UtxoKey {
    pub fn new(tx_id: &str, output_index: u32) -> Self {
        UtxoKey(format!("{tx_id}:{output_index}"))
    }
}

impl std::fmt::Display for UtxoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The value, locking script, and optional height lock of a live output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub value: Amount,
    pub locking_script: String,
    pub lock_height: Option<u64>,
}

/// A batch of UTXO-set mutations applied together, or not at all.
#[derive(Debug, Default)]
pub struct UtxoBatch {
    pub spent: Vec<UtxoKey>,
    pub created: Vec<(UtxoKey, UtxoEntry)>,
}

/// The mapping from `(tx_id, output_index)` to its unspent output. Insertion
/// order carries no meaning; every UTXO is independently addressable by key.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UtxoSet {
    entries: HashMap<UtxoKey, UtxoEntry>,
}

impl UtxoSet {
    pub fn new() -> Self {
        UtxoSet {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &UtxoKey) -> Option<&UtxoEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &UtxoKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: UtxoKey, entry: UtxoEntry) {
        self.entries.insert(key, entry);
    }

    pub fn remove(&mut self, key: &UtxoKey) -> Option<UtxoEntry> {
        self.entries.remove(key)
    }

    /// Outputs of `tx`, keyed and ready to insert into the set.
    pub fn outputs_of(tx_id: &TxId, outputs: &[crate::TransactionOutput]) -> Vec<(UtxoKey, UtxoEntry)> {
        outputs
            .iter()
            .enumerate()
            .map(|(index, output)| {
                (
                    UtxoKey::new(tx_id, index as u32),
                    UtxoEntry {
                        value: output.value,
                        locking_script: output.locking_script.clone(),
                        lock_height: output.lock_height,
                    },
                )
            })
            .collect()
    }

    /// Applies a batch atomically from the caller's perspective: mutations
    /// are computed against a clone and only swapped in once every spent key
    /// is confirmed present, so a caller never observes a partial apply.
    pub fn apply_batch(&mut self, batch: UtxoBatch) -> Result<(), UtxoError> {
        let mut staged = self.entries.clone();
        for key in &batch.spent {
            if staged.remove(key).is_none() {
                return Err(UtxoError::NotFound(key.clone()));
            }
        }
        for (key, entry) in batch.created {
            staged.insert(key, entry);
        }
        self.entries = staged;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UtxoKey, &UtxoEntry)> {
        self.entries.iter()
    }

    /// Sum of every live UTXO's value — used by property tests to check
    /// supply conservation and by balance lookups keyed on locking script.
    pub fn total_value(&self) -> Amount {
        self.entries.values().map(|e| e.value).sum()
    }

    /// Sum of values across outputs whose locking script matches `script`
    /// (the RPC `get_balance` operation: sum of UTXOs paying an address).
    pub fn value_for_script(&self, script: &str) -> Amount {
        self.entries
            .values()
            .filter(|e| e.locking_script == script)
            .map(|e| e.value)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: Amount) -> UtxoEntry {
        UtxoEntry {
            value,
            locking_script: "P2PKH addr_x".to_string(),
            lock_height: None,
        }
    }

    #[test]
    fn apply_batch_is_all_or_nothing() {
        let mut set = UtxoSet::new();
        let key = UtxoKey::new("tx1", 0);
        set.insert(key.clone(), entry(100));

        let mut batch = UtxoBatch::default();
        batch.spent.push(UtxoKey::new("does-not-exist", 0));
        batch.created.push((UtxoKey::new("tx2", 0), entry(50)));

        let result = set.apply_batch(batch);
        assert!(result.is_err());
        // Nothing committed: original UTXO still present, new one absent.
        assert!(set.contains(&key));
        assert!(!set.contains(&UtxoKey::new("tx2", 0)));
    }

    #[test]
    fn apply_batch_commits_spend_and_create_together() {
        let mut set = UtxoSet::new();
        let spent_key = UtxoKey::new("tx1", 0);
        set.insert(spent_key.clone(), entry(100));

        let mut batch = UtxoBatch::default();
        batch.spent.push(spent_key.clone());
        batch.created.push((UtxoKey::new("tx2", 0), entry(100)));

        set.apply_batch(batch).unwrap();
        assert!(!set.contains(&spent_key));
        assert!(set.contains(&UtxoKey::new("tx2", 0)));
    }

    #[test]
    fn value_for_script_sums_matching_outputs() {
        let mut set = UtxoSet::new();
        set.insert(UtxoKey::new("tx1", 0), entry(30));
        set.insert(UtxoKey::new("tx2", 0), entry(20));
        let mut other = entry(5);
        other.locking_script = "P2PKH addr_y".to_string();
        set.insert(UtxoKey::new("tx3", 0), other);

        assert_eq!(set.value_for_script("P2PKH addr_x"), 50);
    }
}
