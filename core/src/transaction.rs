//! Transaction data model for SimChain.
//!
//! A transaction's id is the hex SHA-256 of its canonical preimage (every
//! field but `id`, in declaration order); that same id is what every input's
//! unlocking script signs over.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Amount, TxId};

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("failed to serialize transaction preimage: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A reference to a previously created output, plus the witness that
/// satisfies its locking script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub source_tx_id: TxId,
    pub source_output_index: u32,
    pub unlocking_script: String,
}

impl TransactionInput {
    pub fn new(source_tx_id: TxId, source_output_index: u32, unlocking_script: String) -> Self {
        TransactionInput {
            source_tx_id,
            source_output_index,
            unlocking_script,
        }
    }

    /// The composite key this input references in the UTXO set.
    pub fn source_key(&self) -> crate::UtxoKey {
        crate::UtxoKey::new(&self.source_tx_id, self.source_output_index)
    }
}

/// A spendable output. Value is strictly positive for every output ever
/// emitted; `lock_height`, when set, forbids spending until the spending
/// block's height reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Amount,
    pub locking_script: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_height: Option<u64>,
}

impl TransactionOutput {
    pub fn new(value: Amount, locking_script: String, lock_height: Option<u64>) -> Self {
        TransactionOutput {
            value,
            locking_script,
            lock_height,
        }
    }
}

/// The part of a transaction that is serialized to derive its id, and the
/// message every input's unlocking script is signed over. Field order here
/// must match the transaction's declaration order with `id` removed.
#[derive(Serialize)]
struct TransactionPreimage<'a> {
    inputs: &'a [TransactionInput],
    outputs: &'a [TransactionOutput],
    locktime: u64,
}

/// A transaction: a set of inputs spending prior outputs, and a set of new
/// outputs. A coinbase transaction has zero inputs and is always the first
/// transaction of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    /// Declared but not read by the validator — only per-output `lock_height`
    /// carries spending semantics (see design notes on the source system).
    pub locktime: u64,
}

impl Transaction {
    /// Builds the preimage bytes and computes `id` from them. `id` on the
    /// input parameters is irrelevant and discarded.
    pub fn new(
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        locktime: u64,
    ) -> Result<Self, TransactionError> {
        let preimage_bytes = Self::preimage_bytes(&inputs, &outputs, locktime)?;
        let id = simchain_crypto::sha256_hex(&preimage_bytes);
        Ok(Transaction {
            id,
            inputs,
            outputs,
            locktime,
        })
    }

    fn preimage_bytes(
        inputs: &[TransactionInput],
        outputs: &[TransactionOutput],
        locktime: u64,
    ) -> Result<Vec<u8>, TransactionError> {
        let preimage = TransactionPreimage {
            inputs,
            outputs,
            locktime,
        };
        Ok(serde_json::to_vec(&preimage)?)
    }

    /// Recomputes the id from this transaction's current fields; used to
    /// detect tampering and to recover the 32-byte digest signed by inputs.
    pub fn recompute_id(&self) -> Result<TxId, TransactionError> {
        let bytes = Self::preimage_bytes(&self.inputs, &self.outputs, self.locktime)?;
        Ok(simchain_crypto::sha256_hex(&bytes))
    }

    /// The 32-byte digest behind `id`, the value every input's signature
    /// must verify against.
    pub fn signing_digest(&self) -> Result<[u8; 32], simchain_crypto::CryptoError> {
        simchain_crypto::digest_from_hex(&self.id)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn output_total(&self) -> Amount {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic_and_excludes_itself() {
        let outputs = vec![TransactionOutput::new(
            1_000,
            "P2PKH addr_deadbeef".to_string(),
            None,
        )];
        let tx_a = Transaction::new(vec![], outputs.clone(), 0).unwrap();
        let tx_b = Transaction::new(vec![], outputs, 0).unwrap();
        assert_eq!(tx_a.id, tx_b.id);
        assert_eq!(tx_a.recompute_id().unwrap(), tx_a.id);
    }

    #[test]
    fn coinbase_has_no_inputs() {
        let tx = Transaction::new(
            vec![],
            vec![TransactionOutput::new(5_000, "genesis_lock".into(), None)],
            0,
        )
        .unwrap();
        assert!(tx.is_coinbase());
    }

    #[test]
    fn differing_outputs_yield_differing_ids() {
        let tx_a = Transaction::new(
            vec![],
            vec![TransactionOutput::new(1, "P2PKH addr_a".into(), None)],
            0,
        )
        .unwrap();
        let tx_b = Transaction::new(
            vec![],
            vec![TransactionOutput::new(2, "P2PKH addr_a".into(), None)],
            0,
        )
        .unwrap();
        assert_ne!(tx_a.id, tx_b.id);
    }
}
