//! Transaction validation against a UTXO snapshot.
//!
//! Checks run in a fixed order and short-circuit on the first failure, so a
//! rejection always names the first rule a transaction broke rather than
//! every rule it broke.

use std::collections::HashSet;

use simchain_core::{Amount, Transaction, UtxoKey, UtxoSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no unspent output at {0}")]
    MissingInput(UtxoKey),
    #[error("input {0} is spent twice within the same transaction")]
    DoubleSpendInTx(UtxoKey),
    #[error("output {0} is locked until height {required}, current height is {current}")]
    Locked {
        key: UtxoKey,
        required: u64,
        current: u64,
    },
    #[error("unlocking script does not satisfy the locking script for transaction {0}")]
    BadScript(String),
    #[error("transaction {0} spends more than its inputs provide")]
    ValueOverflow(String),
    #[error("transaction {0} has a zero-value output")]
    ZeroOutput(String),
}

/// Validates `tx` against `utxos` as of `height`. Returns the transaction
/// fee (input total minus output total) on success. Coinbase transactions
/// (no inputs) are not handled here — the ledger controller validates the
/// coinbase separately against the reward schedule.
pub fn validate_transaction(
    tx: &Transaction,
    utxos: &UtxoSet,
    height: u64,
) -> Result<Amount, ValidationError> {
    let mut seen = HashSet::new();
    for input in &tx.inputs {
        let key = input.source_key();
        if !seen.insert(key.clone()) {
            return Err(ValidationError::DoubleSpendInTx(key));
        }
    }

    let mut input_total: Amount = 0;
    let digest = tx
        .signing_digest()
        .map_err(|_| ValidationError::BadScript(tx.id.clone()))?;

    for input in &tx.inputs {
        let key = input.source_key();
        let entry = utxos
            .get(&key)
            .ok_or_else(|| ValidationError::MissingInput(key.clone()))?;

        if let Some(required) = entry.lock_height {
            if height < required {
                return Err(ValidationError::Locked {
                    key,
                    required,
                    current: height,
                });
            }
        }

        if !simchain_crypto::evaluate_p2pkh(&input.unlocking_script, &entry.locking_script, &digest) {
            return Err(ValidationError::BadScript(tx.id.clone()));
        }

        input_total = input_total
            .checked_add(entry.value)
            .ok_or_else(|| ValidationError::ValueOverflow(tx.id.clone()))?;
    }

    let output_total = tx.output_total();
    let fee = input_total
        .checked_sub(output_total)
        .ok_or_else(|| ValidationError::ValueOverflow(tx.id.clone()))?;

    if tx.outputs.iter().any(|o| o.value == 0) {
        return Err(ValidationError::ZeroOutput(tx.id.clone()));
    }

    Ok(fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simchain_core::{TransactionInput, TransactionOutput, UtxoEntry};
    use simchain_crypto::KeyPair;

    fn utxo_set_with_output(tx_id: &str, entry: UtxoEntry) -> UtxoSet {
        let mut set = UtxoSet::new();
        set.insert(UtxoKey::new(tx_id, 0), entry);
        set
    }

    #[test]
    fn rejects_missing_input() {
        let tx = Transaction::new(
            vec![TransactionInput::new("nope".into(), 0, String::new())],
            vec![TransactionOutput::new(1, "P2PKH addr".into(), None)],
            0,
        )
        .unwrap();
        let utxos = UtxoSet::new();
        assert_eq!(
            validate_transaction(&tx, &utxos, 0),
            Err(ValidationError::MissingInput(UtxoKey::new("nope", 0)))
        );
    }

    #[test]
    fn rejects_zero_value_output() {
        let tx = Transaction::new(vec![], vec![TransactionOutput::new(0, "P2PKH addr".into(), None)], 0).unwrap();
        let utxos = UtxoSet::new();
        assert_eq!(
            validate_transaction(&tx, &utxos, 0),
            Err(ValidationError::ZeroOutput(tx.id.clone()))
        );
    }

    #[test]
    fn accepts_well_signed_spend_and_reports_fee() {
        let key = KeyPair::generate();
        let address = key.address();
        let funding_entry = UtxoEntry {
            value: 1_000,
            locking_script: simchain_crypto::locking_script(&address),
            lock_height: None,
        };
        let utxos = utxo_set_with_output("funding_tx", funding_entry);

        let unsigned = Transaction::new(
            vec![TransactionInput::new("funding_tx".into(), 0, String::new())],
            vec![TransactionOutput::new(900, "P2PKH addr_other".into(), None)],
            0,
        )
        .unwrap();

        let digest = unsigned.signing_digest().unwrap();
        let signature = simchain_crypto::sign_digest(&key.secret_key, &digest).unwrap();
        let unlocking = simchain_crypto::unlocking_script(&signature, &key.public_key_base64());

        let spend = Transaction::new(
            vec![TransactionInput::new("funding_tx".into(), 0, unlocking)],
            vec![TransactionOutput::new(900, "P2PKH addr_other".into(), None)],
            0,
        )
        .unwrap();

        let fee = validate_transaction(&spend, &utxos, 0).unwrap();
        assert_eq!(fee, 100);
    }

    #[test]
    fn rejects_spend_locked_to_a_future_height() {
        let entry = UtxoEntry {
            value: 10,
            locking_script: "P2PKH addr".into(),
            lock_height: Some(5),
        };
        let utxos = utxo_set_with_output("funding_tx", entry);
        let tx = Transaction::new(
            vec![TransactionInput::new("funding_tx".into(), 0, String::new())],
            vec![TransactionOutput::new(10, "P2PKH addr2".into(), None)],
            0,
        )
        .unwrap();
        assert_eq!(
            validate_transaction(&tx, &utxos, 1),
            Err(ValidationError::Locked {
                key: UtxoKey::new("funding_tx", 0),
                required: 5,
                current: 1,
            })
        );
    }
}
