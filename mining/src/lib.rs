//! Block assembly and the proof-of-work nonce search.
//!
//! The miner takes a snapshot of the mempool, orders it by fee with
//! submission order as the tiebreak, assembles a coinbase, and searches for
//! a nonce whose header hash meets the current difficulty target.

use std::sync::atomic::{AtomicBool, Ordering};

use simchain_consensus::{difficulty, merkle_root};
use simchain_core::{Amount, Block, BlockHeader, Transaction, TransactionOutput};
use simchain_ledger::{validate_transaction, Ledger};
use simchain_mempool::Mempool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MiningError {
    #[error("mining was cancelled")]
    Cancelled,
}

/// Orders mempool transactions by descending fee, preserving submission
/// order between transactions that pay the same fee (`sort_by` is stable).
fn order_by_fee(ledger: &Ledger, height: u64, candidates: Vec<Transaction>) -> Vec<(Transaction, Amount)> {
    let mut priced: Vec<(Transaction, Amount)> = candidates
        .into_iter()
        .filter_map(|tx| {
            validate_transaction(&tx, ledger.utxos(), height)
                .ok()
                .map(|fee| (tx, fee))
        })
        .collect();
    priced.sort_by(|a, b| b.1.cmp(&a.1));
    priced
}

/// Mines the next block on top of `ledger`'s current tip, pulling up to
/// `max_transactions` candidates from `mempool`. Checks `cancel` between
/// nonce attempts and returns `Err(MiningError::Cancelled)` with no side
/// effects if it becomes set.
pub fn mine_block(
    ledger: &Ledger,
    mempool: &Mempool,
    miner_address: &str,
    timestamp: u64,
    max_transactions: usize,
    cancel: &AtomicBool,
) -> Result<Block, MiningError> {
    let tip = ledger.tip();
    let height = tip.height() + 1;

    let candidates = mempool.drain(max_transactions);
    let priced = order_by_fee(ledger, height, candidates);
    let total_fees: Amount = priced.iter().map(|(_, fee)| fee).sum();
    let body: Vec<Transaction> = priced.into_iter().map(|(tx, _)| tx).collect();

    let reward = ledger.params().block_reward(height);
    let coinbase = Transaction {
        id: format!("coinbase_{height}"),
        inputs: vec![],
        outputs: vec![TransactionOutput::new(
            reward + total_fees,
            simchain_crypto::locking_script(miner_address),
            None,
        )],
        locktime: 0,
    };

    let mut transactions = Vec::with_capacity(body.len() + 1);
    transactions.push(coinbase);
    transactions.extend(body);

    let interval = ledger.params().difficulty_adjustment_interval;
    let interval_start_height = height.saturating_sub(interval.saturating_sub(1));
    let interval_start_timestamp = ledger
        .block_at(interval_start_height)
        .map(|b| b.header.timestamp)
        .unwrap_or(tip.header.timestamp);

    let next_difficulty = difficulty::next_difficulty_target(
        tip.header.difficulty_target,
        height,
        interval,
        ledger.params().target_block_time_secs,
        interval_start_timestamp,
        tip.header.timestamp,
    );

    let mut header = BlockHeader {
        version: 1,
        previous_block_hash: tip.hash.clone(),
        merkle_root: merkle_root(&transactions),
        timestamp,
        difficulty_target: next_difficulty,
        nonce: 0,
        height,
    };

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(MiningError::Cancelled);
        }
        let hash = header.compute_hash();
        if difficulty::meets_target(&hash, header.difficulty_target) {
            return Ok(Block {
                hash,
                header,
                transactions,
            });
        }
        header.nonce += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simchain_consensus::ConsensusParams;

    #[test]
    fn mines_a_valid_empty_block_on_top_of_genesis() {
        let ledger = Ledger::new(ConsensusParams::regtest(), 0);
        let mempool = Mempool::new();
        let cancel = AtomicBool::new(false);
        let block = mine_block(&ledger, &mempool, "addr_miner", 1, 100, &cancel).unwrap();
        assert_eq!(block.height(), 1);
        assert!(difficulty::meets_target(&block.hash, block.header.difficulty_target));
    }

    #[test]
    fn cancellation_flag_aborts_the_search_without_a_block() {
        let ledger = Ledger::new(ConsensusParams::regtest(), 0);
        let mempool = Mempool::new();
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            mine_block(&ledger, &mempool, "addr_miner", 1, 100, &cancel),
            Err(MiningError::Cancelled)
        ));
    }
}
