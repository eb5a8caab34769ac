//! Core data model for SimChain: transactions, blocks and the UTXO set.
//!
//! This crate holds the types every other crate in the workspace shares. It
//! has no notion of a mempool, a validator, or a chain tip — those are
//! separate subsystems (`simchain-mempool`, `simchain-ledger`) built on top
//! of these types.

pub mod block;
pub mod transaction;
pub mod utxo;

pub use block::{Block, BlockHeader};
pub use transaction::{Transaction, TransactionInput, TransactionOutput};
pub use utxo::{UtxoEntry, UtxoKey, UtxoSet};

/// A transaction or block id: lowercase hex SHA-256.
pub type TxId = String;

/// A block header hash: lowercase hex SHA-256.
pub type BlockHash = String;

/// Fixed-point amount at 10^-8 of the base unit (a "satoshi").
pub type Amount = u64;

/// One unit of the base asset, expressed in the fixed-point representation.
pub const COIN: Amount = 100_000_000;
