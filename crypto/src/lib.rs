//! Cryptographic primitives for SimChain.
//!
//! Keys are ECDSA on secp256k1. The sole locking form is Pay-to-Public-Key-Hash,
//! expressed as literal text (`P2PKH {address}` / `{sig_b64} {pubkey_b64}`) rather
//! than a byte-code script, matching the wire format the rest of the ledger hashes.

use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid key encoding")]
    InvalidKey,
    #[error("invalid signature encoding")]
    InvalidSignature,
    #[error("invalid digest length")]
    InvalidDigest,
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// A secp256k1 keypair, generated locally (wallet key ergonomics are out of scope).
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a fresh random keypair.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let mut rng = rand::thread_rng();
        let (secret_key, public_key) = secp.generate_keypair(&mut rng);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// The P2PKH address for this keypair's public key.
    pub fn address(&self) -> String {
        address_from_public_key(&self.public_key)
    }

    /// The base64-encoded public key used in unlocking scripts.
    pub fn public_key_base64(&self) -> String {
        public_key_base64(&self.public_key)
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_bytes(data))
}

/// Raw SHA-256 digest of `data`.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// A simplified PEM-style wrapping of an uncompressed public key. This is not a
/// conformant ASN.1/DER SubjectPublicKeyInfo encoder; a simplified address string
/// suffices per scope, and only this crate ever parses it back.
fn pem_encode_public_key(public_key: &PublicKey) -> String {
    let raw = public_key.serialize_uncompressed();
    let body = base64::encode(raw);
    format!("-----BEGIN PUBLIC KEY-----\n{body}\n-----END PUBLIC KEY-----\n")
}

fn pem_decode_public_key(pem: &str) -> Result<PublicKey, CryptoError> {
    let body: String = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let raw = base64::decode(body).map_err(|_| CryptoError::InvalidKey)?;
    PublicKey::from_slice(&raw).map_err(|_| CryptoError::InvalidKey)
}

/// `base64(PEM(public_key))`, the form embedded in unlocking scripts and hashed
/// to derive the address.
pub fn public_key_base64(public_key: &PublicKey) -> String {
    base64::encode(pem_encode_public_key(public_key))
}

/// `"addr_" || first 30 hex chars of sha256(base64(PEM(public_key)))`.
pub fn address_from_public_key(public_key: &PublicKey) -> String {
    address_from_public_key_base64(&public_key_base64(public_key))
}

/// Same as [`address_from_public_key`] but starting from the already-encoded
/// base64 string, used when evaluating scripts where only the encoded form is
/// on hand.
pub fn address_from_public_key_base64(public_key_b64: &str) -> String {
    let digest = sha256_hex(public_key_b64.as_bytes());
    format!("addr_{}", &digest[..30])
}

/// The literal locking script for a P2PKH output.
pub fn locking_script(address: &str) -> String {
    format!("P2PKH {address}")
}

/// The literal unlocking script witnessing a P2PKH input.
pub fn unlocking_script(signature_b64: &str, public_key_b64: &str) -> String {
    format!("{signature_b64} {public_key_b64}")
}

/// Signs a 32-byte digest (the bytes behind a transaction id) with `secret_key`,
/// returning the base64-encoded compact signature.
pub fn sign_digest(secret_key: &SecretKey, digest: &[u8; 32]) -> Result<String, CryptoError> {
    let secp = Secp256k1::new();
    let message =
        Message::from_slice(digest).map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(base64::encode(signature.serialize_compact()))
}

/// Verifies a base64-encoded compact signature over `digest` against `public_key`.
/// Any parse or cryptographic failure returns `false`, never an error.
pub fn verify_digest(public_key: &PublicKey, signature_b64: &str, digest: &[u8; 32]) -> bool {
    let Ok(sig_bytes) = base64::decode(signature_b64) else {
        return false;
    };
    let Ok(signature) = Signature::from_compact(&sig_bytes) else {
        return false;
    };
    let Ok(message) = Message::from_slice(digest) else {
        return false;
    };
    let secp = Secp256k1::new();
    secp.verify_ecdsa(&message, &signature, public_key).is_ok()
}

/// Evaluates a P2PKH unlocking script against a locking script and the 32-byte
/// digest behind the transaction's id (the value every input's signature covers).
///
/// Succeeds iff the locking script parses as `P2PKH <address>`, the embedded
/// public key derives to that address, and the signature verifies over `digest`.
/// Any parse or cryptographic failure rejects without raising.
pub fn evaluate_p2pkh(unlocking_script: &str, locking_script: &str, digest: &[u8; 32]) -> bool {
    let mut unlock_parts = unlocking_script.split_whitespace();
    let (Some(signature_b64), Some(public_key_b64), None) = (
        unlock_parts.next(),
        unlock_parts.next(),
        unlock_parts.next(),
    ) else {
        return false;
    };

    let mut lock_parts = locking_script.split_whitespace();
    let (Some(script_type), Some(address), None) =
        (lock_parts.next(), lock_parts.next(), lock_parts.next())
    else {
        return false;
    };
    if script_type != "P2PKH" {
        return false;
    }

    if address_from_public_key_base64(public_key_b64) != address {
        return false;
    }

    let Ok(pem_bytes) = base64::decode(public_key_b64) else {
        return false;
    };
    let Ok(pem) = String::from_utf8(pem_bytes) else {
        return false;
    };
    let Ok(public_key) = pem_decode_public_key(&pem) else {
        return false;
    };

    verify_digest(&public_key, signature_b64, digest)
}

/// Convenience: produces the digest bytes behind a hex transaction id (i.e. the
/// raw SHA-256 digest whose hex encoding is the id), used both to compute and to
/// sign transaction ids.
pub fn digest_from_hex(hex_digest: &str) -> Result<[u8; 32], CryptoError> {
    let bytes = hex::decode(hex_digest).map_err(|_| CryptoError::InvalidDigest)?;
    bytes.try_into().map_err(|_| CryptoError::InvalidDigest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_base64() {
        let keypair = KeyPair::generate();
        let address = keypair.address();
        assert!(address.starts_with("addr_"));
        assert_eq!(address.len(), 5 + 30);
        assert_eq!(
            address_from_public_key_base64(&keypair.public_key_base64()),
            address
        );
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let keypair = KeyPair::generate();
        let digest = sha256_bytes(b"some transaction preimage");
        let signature = sign_digest(&keypair.secret_key, &digest).unwrap();
        assert!(verify_digest(&keypair.public_key, &signature, &digest));
    }

    #[test]
    fn evaluate_p2pkh_accepts_genuine_witness() {
        let keypair = KeyPair::generate();
        let digest = sha256_bytes(b"tx preimage");
        let signature = sign_digest(&keypair.secret_key, &digest).unwrap();

        let locking = locking_script(&keypair.address());
        let unlocking = unlocking_script(&signature, &keypair.public_key_base64());

        assert!(evaluate_p2pkh(&unlocking, &locking, &digest));
    }

    #[test]
    fn evaluate_p2pkh_rejects_wrong_key() {
        let keypair = KeyPair::generate();
        let impostor = KeyPair::generate();
        let digest = sha256_bytes(b"tx preimage");
        let signature = sign_digest(&impostor.secret_key, &digest).unwrap();

        let locking = locking_script(&keypair.address());
        let unlocking = unlocking_script(&signature, &impostor.public_key_base64());

        assert!(!evaluate_p2pkh(&unlocking, &locking, &digest));
    }

    #[test]
    fn evaluate_p2pkh_rejects_malformed_scripts() {
        let digest = sha256_bytes(b"whatever");
        assert!(!evaluate_p2pkh("garbage", "also garbage", &digest));
        assert!(!evaluate_p2pkh("sig pubkey extra", "P2PKH addr_x", &digest));
    }
}
