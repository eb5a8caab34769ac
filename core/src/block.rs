//! Block and block header data model for SimChain.

use serde::{Deserialize, Serialize};

use crate::{BlockHash, Transaction};

/// A block header. `hash` is the SHA-256 of the canonical header
/// serialization (field order `version, previous_block_hash, merkle_root,
/// timestamp, difficulty_target, nonce`, concatenated without separators),
/// including the solved nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub previous_block_hash: BlockHash,
    pub merkle_root: BlockHash,
    pub timestamp: u64,
    pub difficulty_target: u32,
    pub nonce: u64,
    pub height: u64,
}

impl BlockHeader {
    /// The canonical preimage bytes hashed to produce the block hash.
    pub fn preimage(&self) -> String {
        format!(
            "{}{}{}{}{}{}",
            self.version,
            self.previous_block_hash,
            self.merkle_root,
            self.timestamp,
            self.difficulty_target,
            self.nonce
        )
    }

    /// Recomputes the header hash from the current field values.
    pub fn compute_hash(&self) -> BlockHash {
        simchain_crypto::sha256_hex(self.preimage().as_bytes())
    }
}

/// A block: a header plus the transactions it commits to via `merkle_root`.
/// `transactions[0]` is always the coinbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: BlockHash,
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    /// Non-coinbase transactions, in block order.
    pub fn body(&self) -> &[Transaction] {
        if self.transactions.is_empty() {
            &[]
        } else {
            &self.transactions[1..]
        }
    }
}
