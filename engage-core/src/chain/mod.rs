//! On-chain minting.
//!
//! [`ChainMinter`] abstracts the node: nonce and gas lookups, submitting the
//! broker-signed `safeMint` transaction and reading receipts back.

pub mod abi;
mod mock;
pub mod rlp;
#[cfg(feature = "network")]
mod rpc;
pub mod tx;

pub use mock::MockChain;
#[cfg(feature = "network")]
pub use rpc::JsonRpcChain;

use async_trait::async_trait;
use thiserror::Error;

use crate::address::Address;
use crate::category::CategoryId;

/// keccak256("Transfer(address,address,uint256)"), topic[0] of ERC-721 transfers.
pub const TRANSFER_EVENT_TOPIC: [u8; 32] = [
    0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d, 0xaa,
    0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23, 0xb3, 0xef,
];

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Chain configuration error: {0}")]
    Config(String),

    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    Decode(String),

    #[error("Transaction signing failed: {0}")]
    Signing(String),
}

/// Transaction parameters chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOptions {
    pub from: Address,
    pub nonce: u64,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub value: u128,
}

/// Outcome of a submitted mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintSubmission {
    /// `0x`-prefixed transaction hash.
    pub tx_hash: String,
    pub gas_price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLog {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// 1 success, 0 reverted.
    pub status: u64,
    pub logs: Vec<ReceiptLog>,
}

/// Chain access used by the claim workflow.
#[async_trait]
pub trait ChainMinter: Send + Sync {
    /// Account that signs and pays for mints.
    fn broker_address(&self) -> Address;

    /// NFT contract (proxy) that receives mint calls and emits events.
    fn contract_address(&self) -> Address;

    async fn pending_nonce(&self, account: Address) -> Result<u64, ChainError>;

    async fn suggested_gas_price(&self) -> Result<u64, ChainError>;

    /// Submit `safeMint(recipient, token_uri, category_id)` without waiting for inclusion.
    async fn mint(
        &self,
        opts: &TxOptions,
        recipient: Address,
        token_uri: &str,
        category_id: CategoryId,
    ) -> Result<MintSubmission, ChainError>;

    /// `None` while the transaction is unknown or pending.
    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, ChainError>;

    /// Balance in wei.
    async fn balance(&self, account: Address) -> Result<u128, ChainError>;
}

/// Parse a `0x` hex quantity.
pub fn parse_quantity(value: &str) -> Result<u128, ChainError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::Decode(format!("quantity without 0x prefix: {value}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Decode(format!("invalid quantity {value}: {e}")))
}

/// Render a quantity as minimal `0x` hex.
pub fn to_quantity(value: u128) -> String {
    format!("{value:#x}")
}

/// Parse a 32-byte `0x` hex word (hashes, topics).
pub fn parse_word(value: &str) -> Result<[u8; 32], ChainError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    let mut word = [0u8; 32];
    hex::decode_to_slice(digits, &mut word)
        .map_err(|e| ChainError::Decode(format!("invalid 32-byte word {value}: {e}")))?;
    Ok(word)
}
