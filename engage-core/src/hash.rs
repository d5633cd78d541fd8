//! Keccak-256, the hash used for typed data, addresses and transactions.

use sha3::{Digest, Keccak256};

/// Hash `data` with Keccak-256 (the pre-standard SHA3 variant used by Ethereum).
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    hasher.finalize().into()
}

/// Hash the concatenation of several byte slices.
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
