//! Mock chain for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    ChainError, ChainMinter, MintSubmission, ReceiptLog, TransactionReceipt, TxOptions,
    TRANSFER_EVENT_TOPIC,
};
use crate::address::Address;
use crate::category::CategoryId;
use crate::hash::keccak256_concat;

/// In-process chain that records mints and answers receipts.
///
/// Every successful mint gets a receipt with status 1 and one ERC-721
/// `Transfer` log from the contract whose topic[3] is the new token id
/// (1, 2, 3, ...). Broker mints must carry the current pending nonce,
/// otherwise they fail with "nonce too low" like a real node.
pub struct MockChain {
    broker: Address,
    contract: Address,
    gas_price: u64,
    balance: u128,
    mint_delay: Option<Duration>,
    fail_mints: AtomicBool,
    nonce: AtomicU64,
    mints: AtomicUsize,
    calls: AtomicUsize,
    receipts: DashMap<String, TransactionReceipt>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new(Address([0xb0; 20]), Address([0xc0; 20]))
    }
}

impl MockChain {
    pub fn new(broker: Address, contract: Address) -> Self {
        Self {
            broker,
            contract,
            gas_price: 30_000_000_000,
            balance: 5_000_000_000_000_000_000,
            mint_delay: None,
            fail_mints: AtomicBool::new(false),
            nonce: AtomicU64::new(0),
            mints: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            receipts: DashMap::new(),
        }
    }

    /// Sleep this long inside every mint call.
    pub fn with_mint_delay(mut self, delay: Duration) -> Self {
        self.mint_delay = Some(delay);
        self
    }

    pub fn set_fail_mints(&self, fail: bool) {
        self.fail_mints.store(fail, Ordering::SeqCst);
    }

    /// Number of mint transactions accepted.
    pub fn mints(&self) -> usize {
        self.mints.load(Ordering::SeqCst)
    }

    /// Number of calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn insert_receipt(&self, tx_hash: &str, receipt: TransactionReceipt) {
        self.receipts.insert(tx_hash.to_lowercase(), receipt);
    }

    pub fn remove_receipt(&self, tx_hash: &str) -> Option<TransactionReceipt> {
        self.receipts.remove(&tx_hash.to_lowercase()).map(|(_, r)| r)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainMinter for MockChain {
    fn broker_address(&self) -> Address {
        self.broker
    }

    fn contract_address(&self) -> Address {
        self.contract
    }

    async fn pending_nonce(&self, account: Address) -> Result<u64, ChainError> {
        self.touch();
        if account != self.broker {
            return Ok(0);
        }
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn suggested_gas_price(&self) -> Result<u64, ChainError> {
        self.touch();
        Ok(self.gas_price)
    }

    async fn mint(
        &self,
        opts: &TxOptions,
        recipient: Address,
        token_uri: &str,
        category_id: CategoryId,
    ) -> Result<MintSubmission, ChainError> {
        self.touch();
        if let Some(delay) = self.mint_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_mints.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc {
                code: -32000,
                message: "insufficient funds for gas * price + value".into(),
            });
        }

        if opts.from == self.broker
            && self
                .nonce
                .compare_exchange(opts.nonce, opts.nonce + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            return Err(ChainError::Rpc {
                code: -32000,
                message: "nonce too low".into(),
            });
        }
        let token_id = self.mints.fetch_add(1, Ordering::SeqCst) as u128 + 1;

        let hash = keccak256_concat(&[
            &opts.nonce.to_be_bytes(),
            recipient.as_bytes(),
            token_uri.as_bytes(),
            category_id.as_bytes(),
            &token_id.to_be_bytes(),
        ]);
        let tx_hash = format!("0x{}", hex::encode(hash));

        let mut token_topic = [0u8; 32];
        token_topic[16..].copy_from_slice(&token_id.to_be_bytes());
        self.insert_receipt(
            &tx_hash,
            TransactionReceipt {
                status: 1,
                logs: vec![ReceiptLog {
                    address: self.contract,
                    topics: vec![
                        TRANSFER_EVENT_TOPIC,
                        [0u8; 32],
                        recipient.to_word(),
                        token_topic,
                    ],
                }],
            },
        );

        Ok(MintSubmission {
            tx_hash,
            gas_price: opts.gas_price,
        })
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        self.touch();
        Ok(self
            .receipts
            .get(&tx_hash.to_lowercase())
            .map(|r| r.value().clone()))
    }

    async fn balance(&self, account: Address) -> Result<u128, ChainError> {
        self.touch();
        Ok(if account == self.broker { self.balance } else { 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(chain: &MockChain) -> TxOptions {
        TxOptions {
            from: chain.broker_address(),
            nonce: 0,
            gas_price: 1,
            gas_limit: 300_000,
            value: 0,
        }
    }

    #[tokio::test]
    async fn test_mint_registers_receipt() {
        let chain = MockChain::default();
        let submission = chain
            .mint(&opts(&chain), Address([7; 20]), "ipfs://x", CategoryId([1; 12]))
            .await
            .unwrap();

        assert_eq!(chain.mints(), 1);
        assert_eq!(chain.pending_nonce(chain.broker_address()).await.unwrap(), 1);

        let receipt = chain
            .transaction_receipt(&submission.tx_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.status, 1);
        assert_eq!(receipt.logs[0].address, chain.contract_address());
        assert_eq!(receipt.logs[0].topics[3][31], 1);
    }

    #[tokio::test]
    async fn test_failing_mint() {
        let chain = MockChain::default();
        chain.set_fail_mints(true);
        let result = chain
            .mint(&opts(&chain), Address([7; 20]), "ipfs://x", CategoryId([1; 12]))
            .await;
        assert!(matches!(result, Err(ChainError::Rpc { .. })));
        assert_eq!(chain.mints(), 0);
    }

    #[tokio::test]
    async fn test_reused_nonce_rejected() {
        let chain = MockChain::default();
        chain
            .mint(&opts(&chain), Address([7; 20]), "ipfs://x", CategoryId([1; 12]))
            .await
            .unwrap();
        let result = chain
            .mint(&opts(&chain), Address([8; 20]), "ipfs://y", CategoryId([1; 12]))
            .await;
        assert!(matches!(result, Err(ChainError::Rpc { message, .. }) if message == "nonce too low"));
        assert_eq!(chain.mints(), 1);
    }

    #[tokio::test]
    async fn test_unknown_receipt_is_none() {
        let chain = MockChain::default();
        assert!(chain.transaction_receipt("0xabc").await.unwrap().is_none());
    }
}
