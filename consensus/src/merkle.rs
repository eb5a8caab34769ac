//! Merkle root over transaction ids.

use simchain_core::Transaction;

/// Pairwise SHA-256 reduction of transaction ids, duplicating the last id
/// of an odd-length level. The empty-block root is 64 zero hex digits.
pub fn merkle_root(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "0".repeat(64);
    }

    let mut level: Vec<String> = transactions.iter().map(|tx| tx.id.clone()).collect();
    while level.len() > 1 {
        if level.len() % 2 != 0 {
            level.push(level.last().unwrap().clone());
        }
        level = level
            .chunks(2)
            .map(|pair| simchain_crypto::sha256_hex(format!("{}{}", pair[0], pair[1]).as_bytes()))
            .collect();
    }
    level.remove(0)
}
