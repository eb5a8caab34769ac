//! JSON-file-backed implementation of [`DocumentStore`].
//!
//! One file per collection under `base_dir`, loaded into memory on read and
//! overwritten wholesale on write. Simple and easy to inspect by hand; not
//! meant to scale to a large chain.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;
use simchain_core::{Amount, Block, Transaction, UtxoSet};
use simchain_exchange::{OrderBook, Trade};

use crate::{DocumentStore, StorageError, WriteBatch};

pub struct JsonDocumentStore {
    base_dir: PathBuf,
}

impl JsonDocumentStore {
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(JsonDocumentStore { base_dir })
    }

    fn path_for(&self, collection: &str) -> PathBuf {
        self.base_dir.join(format!("{collection}.json"))
    }

    async fn load<T: serde::de::DeserializeOwned + Default>(&self, collection: &str) -> Result<T, StorageError> {
        let path = self.path_for(collection);
        if !path.exists() {
            return Ok(T::default());
        }
        let bytes = tokio::fs::read(&path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, collection: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        debug!("writing {} bytes to {}", bytes.len(), collection);
        tokio::fs::write(self.path_for(collection), bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn load_blocks(&self) -> Result<Vec<Block>, StorageError> {
        self.load("blocks").await
    }

    async fn load_utxos(&self) -> Result<UtxoSet, StorageError> {
        self.load("utxos").await
    }

    async fn load_mempool(&self) -> Result<Vec<Transaction>, StorageError> {
        self.load("mempool").await
    }

    async fn load_order_books(&self) -> Result<HashMap<String, OrderBook>, StorageError> {
        self.load("exchange_order_books").await
    }

    async fn load_trade_histories(&self) -> Result<HashMap<String, Vec<Trade>>, StorageError> {
        self.load("exchange_trade_histories").await
    }

    async fn load_user_balances(&self) -> Result<HashMap<String, HashMap<String, Amount>>, StorageError> {
        self.load("exchange_user_balances").await
    }

    async fn atomic_write(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut writes: Vec<(&'static str, Vec<u8>)> = Vec::new();
        if let Some(blocks) = &batch.blocks {
            writes.push(("blocks", serde_json::to_vec(blocks)?));
        }
        if let Some(utxos) = &batch.utxos {
            writes.push(("utxos", serde_json::to_vec(utxos)?));
        }
        if let Some(mempool) = &batch.mempool {
            writes.push(("mempool", serde_json::to_vec(mempool)?));
        }
        if let Some(books) = &batch.exchange_order_books {
            writes.push(("exchange_order_books", serde_json::to_vec(books)?));
        }
        if let Some(histories) = &batch.exchange_trade_histories {
            writes.push(("exchange_trade_histories", serde_json::to_vec(histories)?));
        }
        if let Some(balances) = &batch.exchange_user_balances {
            writes.push(("exchange_user_balances", serde_json::to_vec(balances)?));
        }

        for (collection, bytes) in writes {
            self.save(collection, bytes).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simchain_core::{TransactionOutput};

    #[tokio::test]
    async fn round_trips_mempool_through_disk() {
        let dir = std::env::temp_dir().join(format!("simchain-store-test-{}", std::process::id()));
        let store = JsonDocumentStore::new(&dir).await.unwrap();

        let tx = Transaction::new(vec![], vec![TransactionOutput::new(1, "P2PKH addr".into(), None)], 0).unwrap();
        let batch = WriteBatch {
            mempool: Some(vec![tx.clone()]),
            ..Default::default()
        };
        store.atomic_write(batch).await.unwrap();

        let loaded = store.load_mempool().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, tx.id);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn missing_collection_loads_as_default() {
        let dir = std::env::temp_dir().join(format!("simchain-store-test-empty-{}", std::process::id()));
        let store = JsonDocumentStore::new(&dir).await.unwrap();
        let blocks = store.load_blocks().await.unwrap();
        assert!(blocks.is_empty());
        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
