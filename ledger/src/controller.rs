//! The ledger controller: genesis synthesis, block acceptance and the
//! atomic commit of a block's effect on the UTXO set.

use simchain_consensus::{merkle_root, ConsensusParams};
use simchain_core::{
    Amount, Block, BlockHeader, Transaction, TransactionOutput, TxId, UtxoBatch, UtxoSet,
};
use thiserror::Error;

use crate::validator::{self, ValidationError};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("block {0} already accepted")]
    DuplicateBlock(String),
    #[error("block's previous hash does not match the current chain tip")]
    NotConnected,
    #[error("expected block height {expected}, got {actual}")]
    WrongHeight { expected: u64, actual: u64 },
    #[error("merkle root does not match the block's transactions")]
    BadMerkleRoot,
    #[error("block hash does not meet the difficulty target, or header hash mismatch")]
    BadProofOfWork,
    #[error("invalid coinbase transaction: {0}")]
    InvalidCoinbase(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Utxo(#[from] simchain_core::utxo::UtxoError),
}

/// The chain state: the UTXO set and the append-only block history. One
/// `Ledger` is owned behind a single exclusive-writer lock (see the
/// workspace's concurrency notes) — every mutation here assumes callers
/// serialize writers themselves.
pub struct Ledger {
    params: ConsensusParams,
    blocks: Vec<Block>,
    utxos: UtxoSet,
}

impl Ledger {
    /// Rebuilds a ledger from previously-persisted state. The chain is
    /// trusted as already validated (every block in it passed
    /// `accept_block` before being written out); this only reconstructs the
    /// in-memory structure, it does not replay validation.
    pub fn restore(params: ConsensusParams, blocks: Vec<Block>, utxos: UtxoSet) -> Self {
        Ledger {
            params,
            blocks,
            utxos,
        }
    }

    /// Builds a fresh chain containing only the genesis block.
    pub fn new(params: ConsensusParams, genesis_timestamp: u64) -> Self {
        let reward = params.block_reward(0);
        let genesis_tx = Transaction {
            id: "genesis_tx_0".to_string(),
            inputs: vec![],
            outputs: vec![TransactionOutput::new(reward, "genesis_lock".to_string(), None)],
            locktime: 0,
        };

        let header = BlockHeader {
            version: 1,
            previous_block_hash: "0".repeat(64),
            merkle_root: merkle_root(std::slice::from_ref(&genesis_tx)),
            timestamp: genesis_timestamp,
            difficulty_target: params.initial_difficulty,
            nonce: 0,
            height: 0,
        };
        let hash = header.compute_hash();

        let mut utxos = UtxoSet::new();
        for (key, entry) in UtxoSet::outputs_of(&genesis_tx.id, &genesis_tx.outputs) {
            utxos.insert(key, entry);
        }

        Ledger {
            params,
            blocks: vec![Block {
                hash,
                header,
                transactions: vec![genesis_tx],
            }],
            utxos,
        }
    }

    pub fn tip(&self) -> &Block {
        self.blocks.last().expect("genesis block always present")
    }

    pub fn height(&self) -> u64 {
        self.tip().height()
    }

    pub fn utxos(&self) -> &UtxoSet {
        &self.utxos
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    pub fn block_at(&self, height: u64) -> Option<&Block> {
        self.blocks.get(height as usize)
    }

    /// The full chain history, oldest first — used by the persistence
    /// adapter to snapshot the `blocks` collection.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Validates and, on success, commits `block`. Returns the ids of the
    /// non-coinbase transactions it contained, so the caller can evict them
    /// from the mempool.
    pub fn accept_block(&mut self, block: Block) -> Result<Vec<TxId>, LedgerError> {
        if self.blocks.iter().any(|b| b.hash == block.hash) {
            return Err(LedgerError::DuplicateBlock(block.hash));
        }

        let tip = self.tip();
        if block.header.previous_block_hash != tip.hash {
            return Err(LedgerError::NotConnected);
        }
        let expected_height = tip.height() + 1;
        if block.header.height != expected_height {
            return Err(LedgerError::WrongHeight {
                expected: expected_height,
                actual: block.header.height,
            });
        }

        if block.header.merkle_root != merkle_root(&block.transactions) {
            return Err(LedgerError::BadMerkleRoot);
        }
        let recomputed = block.header.compute_hash();
        if recomputed != block.hash
            || !simchain_consensus::difficulty::meets_target(&block.hash, block.header.difficulty_target)
        {
            return Err(LedgerError::BadProofOfWork);
        }

        let coinbase = block
            .transactions
            .first()
            .ok_or_else(|| LedgerError::InvalidCoinbase("block has no transactions".into()))?;
        if !coinbase.is_coinbase() {
            return Err(LedgerError::InvalidCoinbase(
                "first transaction is not a coinbase".into(),
            ));
        }

        let mut batch = UtxoBatch::default();
        let mut total_fees: Amount = 0;
        let mut working = self.utxos.clone();
        for tx in &block.transactions[1..] {
            let fee = validator::validate_transaction(tx, &working, expected_height)?;
            total_fees += fee;
            for input in &tx.inputs {
                let key = input.source_key();
                working.remove(&key);
                batch.spent.push(key);
            }
            for (key, entry) in UtxoSet::outputs_of(&tx.id, &tx.outputs) {
                working.insert(key.clone(), entry.clone());
                batch.created.push((key, entry));
            }
        }

        let max_coinbase_value = self.params.block_reward(expected_height) + total_fees;
        if coinbase.output_total() > max_coinbase_value {
            return Err(LedgerError::InvalidCoinbase(
                "coinbase value exceeds reward plus fees".into(),
            ));
        }
        batch
            .created
            .extend(UtxoSet::outputs_of(&coinbase.id, &coinbase.outputs));

        let mined_ids: Vec<TxId> = block.transactions[1..].iter().map(|t| t.id.clone()).collect();

        self.utxos.apply_batch(batch)?;
        self.blocks.push(block);

        Ok(mined_ids)
    }
}
