//! ABI encoding for the `safeMint` call.

use crate::address::Address;
use crate::category::CategoryId;
use crate::hash::keccak256;

/// Canonical signature of the mint entry point.
pub const SAFE_MINT_SIGNATURE: &str = "safeMint(address,string,bytes12)";

/// First four bytes of the keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

fn uint_word(value: usize) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// Calldata for `safeMint(to, tokenUri, categoryId)`.
pub fn encode_safe_mint(to: Address, token_uri: &str, category_id: CategoryId) -> Vec<u8> {
    let uri = token_uri.as_bytes();
    let padded_len = uri.len().div_ceil(32) * 32;

    let mut data = Vec::with_capacity(4 + 32 * 4 + padded_len);
    data.extend_from_slice(&selector(SAFE_MINT_SIGNATURE));
    data.extend_from_slice(&to.to_word());
    // Head is three words, so the string tail starts at 0x60.
    data.extend_from_slice(&uint_word(3 * 32));
    data.extend_from_slice(&category_id.to_word());
    data.extend_from_slice(&uint_word(uri.len()));
    data.extend_from_slice(uri);
    data.resize(data.len() + (padded_len - uri.len()), 0);
    data
}
