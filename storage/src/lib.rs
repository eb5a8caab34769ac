//! Document-store-shaped persistence for SimChain.
//!
//! The adapter exposes six collections (`blocks, utxos, mempool,
//! exchange_order_books, exchange_trade_histories, exchange_user_balances`)
//! and a single `atomic_write` entry point that persists a batch of them
//! together, mirroring a multi-document transaction without requiring a
//! real database.

pub mod json_store;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use simchain_core::{Amount, Block, Transaction, UtxoSet};
use simchain_exchange::{OrderBook, Trade};
use thiserror::Error;

pub use json_store::JsonDocumentStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A set of collection updates to persist together. `None` leaves a
/// collection untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WriteBatch {
    pub blocks: Option<Vec<Block>>,
    pub utxos: Option<UtxoSet>,
    pub mempool: Option<Vec<Transaction>>,
    pub exchange_order_books: Option<HashMap<String, OrderBook>>,
    pub exchange_trade_histories: Option<HashMap<String, Vec<Trade>>>,
    pub exchange_user_balances: Option<HashMap<String, HashMap<String, Amount>>>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load_blocks(&self) -> Result<Vec<Block>, StorageError>;
    async fn load_utxos(&self) -> Result<UtxoSet, StorageError>;
    async fn load_mempool(&self) -> Result<Vec<Transaction>, StorageError>;
    async fn load_order_books(&self) -> Result<HashMap<String, OrderBook>, StorageError>;
    async fn load_trade_histories(&self) -> Result<HashMap<String, Vec<Trade>>, StorageError>;
    async fn load_user_balances(&self) -> Result<HashMap<String, HashMap<String, Amount>>, StorageError>;

    /// Persists every collection named in `batch`. Every value is serialized
    /// before any file is written, so a serialization failure never leaves a
    /// partially-updated collection on disk.
    async fn atomic_write(&self, batch: WriteBatch) -> Result<(), StorageError>;
}
