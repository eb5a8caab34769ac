//! The mempool: transactions that have passed validation and are waiting to
//! be mined, keyed by id with insertion order preserved for miner
//! tie-breaking.

use std::collections::HashMap;

use simchain_core::{Transaction, TxId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MempoolError {
    #[error("transaction {0} is already in the mempool")]
    AlreadyPresent(TxId),
}

/// A validated, not-yet-mined transaction pool. Entries are addressable by
/// id in O(1) while `drain` yields them in submission order.
#[derive(Debug, Default)]
pub struct Mempool {
    order: Vec<TxId>,
    entries: HashMap<TxId, Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Mempool {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &TxId) -> Option<&Transaction> {
        self.entries.get(id)
    }

    /// Accepts an already-validated transaction. Callers are expected to
    /// have run it through the ledger's validator first; this only tracks
    /// presence and insertion order.
    pub fn submit(&mut self, tx: Transaction) -> Result<(), MempoolError> {
        if self.entries.contains_key(&tx.id) {
            return Err(MempoolError::AlreadyPresent(tx.id));
        }
        self.order.push(tx.id.clone());
        self.entries.insert(tx.id.clone(), tx);
        Ok(())
    }

    /// Returns up to `limit` transactions in submission order, without
    /// removing them — the miner decides what to include in a block, and
    /// only a successfully committed block evicts them via `remove_many`.
    pub fn drain(&self, limit: usize) -> Vec<Transaction> {
        self.order
            .iter()
            .take(limit)
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }

    /// Removes every transaction whose id is in `ids`, e.g. after a block
    /// containing them has been committed.
    pub fn remove_many(&mut self, ids: &[TxId]) {
        for id in ids {
            self.entries.remove(id);
        }
        self.order.retain(|id| self.entries.contains_key(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simchain_core::TransactionOutput;

    fn tx(seed: u64) -> Transaction {
        Transaction::new(
            vec![],
            vec![TransactionOutput::new(seed, "P2PKH addr".into(), None)],
            0,
        )
        .unwrap()
    }

    #[test]
    fn submit_rejects_duplicate_id() {
        let mut pool = Mempool::new();
        let t = tx(1);
        pool.submit(t.clone()).unwrap();
        assert!(matches!(
            pool.submit(t),
            Err(MempoolError::AlreadyPresent(_))
        ));
    }

    #[test]
    fn drain_preserves_submission_order() {
        let mut pool = Mempool::new();
        let a = tx(1);
        let b = tx(2);
        pool.submit(a.clone()).unwrap();
        pool.submit(b.clone()).unwrap();
        let drained = pool.drain(10);
        assert_eq!(drained[0].id, a.id);
        assert_eq!(drained[1].id, b.id);
    }

    #[test]
    fn remove_many_evicts_and_preserves_remaining_order() {
        let mut pool = Mempool::new();
        let a = tx(1);
        let b = tx(2);
        let c = tx(3);
        pool.submit(a.clone()).unwrap();
        pool.submit(b.clone()).unwrap();
        pool.submit(c.clone()).unwrap();
        pool.remove_many(&[b.id.clone()]);
        let remaining: Vec<TxId> = pool.drain(10).into_iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![a.id, c.id]);
    }
}
