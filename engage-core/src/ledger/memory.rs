//! In-memory ledger over an ordered map of JSON-encoded records.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{ledger_key, now_millis, wallet_prefix, ClaimLedger, LedgerError, CLAIM_TABLE};
use crate::model::Claim;

/// Ordered in-process ledger. Records are stored as serialized JSON.
#[derive(Default)]
pub struct MemoryClaimLedger {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
    reservations: Mutex<BTreeSet<String>>,
}

impl MemoryClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn is_reserved(&self, catalog_id: &str, wallet: &str) -> bool {
        self.reservations
            .lock()
            .await
            .contains(&ledger_key(wallet, catalog_id))
    }

    async fn scan(&self, prefix: &str, limit: usize) -> Result<Vec<Claim>, LedgerError> {
        let records = self.records.read().await;
        records
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .take(limit)
            .map(|(_, bytes)| serde_json::from_slice(bytes).map_err(LedgerError::from))
            .collect()
    }
}

#[async_trait]
impl ClaimLedger for MemoryClaimLedger {
    async fn get(&self, catalog_id: &str, wallet: &str) -> Result<Claim, LedgerError> {
        let key = ledger_key(wallet, catalog_id);
        let records = self.records.read().await;
        let bytes = records.get(&key).ok_or(LedgerError::NotFound)?;
        Ok(serde_json::from_slice(bytes)?)
    }

    async fn put(&self, mut claim: Claim) -> Result<Claim, LedgerError> {
        claim.created = now_millis();
        let key = ledger_key(&claim.wallet_address, &claim.catalog_id);
        let bytes = serde_json::to_vec(&claim)?;
        self.records.write().await.insert(key, bytes);
        Ok(claim)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Claim>, LedgerError> {
        self.scan(&format!("/{CLAIM_TABLE}/"), limit).await
    }

    async fn list_by_wallet(&self, wallet: &str, limit: usize) -> Result<Vec<Claim>, LedgerError> {
        self.scan(&wallet_prefix(wallet), limit).await
    }

    async fn reserve(&self, catalog_id: &str, wallet: &str) -> Result<(), LedgerError> {
        let key = ledger_key(wallet, catalog_id);
        // Check and insert under both locks.
        let records = self.records.read().await;
        let mut reservations = self.reservations.lock().await;
        if records.contains_key(&key) || !reservations.insert(key) {
            return Err(LedgerError::Exists);
        }
        Ok(())
    }

    async fn release(&self, catalog_id: &str, wallet: &str) -> Result<(), LedgerError> {
        self.reservations
            .lock()
            .await
            .remove(&ledger_key(wallet, catalog_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET_A: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const WALLET_B: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

    fn claim(wallet: &str, catalog_id: &str) -> Claim {
        Claim {
            catalog_id: catalog_id.into(),
            wallet_address: wallet.into(),
            mailio_address: None,
            signature: "0x00".into(),
            gas_price: 1,
            tx_hash: Some("0xabc".into()),
            token_uri: Some("ipfs://Qm".into()),
            created: 0,
        }
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let ledger = MemoryClaimLedger::new();
        assert!(matches!(
            ledger.get("cat", WALLET_A).await,
            Err(LedgerError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_put_sets_created_and_round_trips() {
        let ledger = MemoryClaimLedger::new();
        let stored = ledger.put(claim(WALLET_A, "cat")).await.unwrap();
        assert!(stored.created > 0);

        let fetched = ledger.get("cat", WALLET_A).await.unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn test_get_ignores_wallet_case() {
        let ledger = MemoryClaimLedger::new();
        ledger.put(claim(WALLET_A, "cat")).await.unwrap();
        assert!(ledger.get("cat", &WALLET_A.to_lowercase()).await.is_ok());
        assert!(ledger.get("cat", &WALLET_A.to_uppercase().replace("0X", "0x")).await.is_ok());
    }

    #[tokio::test]
    async fn test_put_overwrites_pair() {
        let ledger = MemoryClaimLedger::new();
        ledger.put(claim(WALLET_A, "cat")).await.unwrap();
        let mut second = claim(WALLET_A, "cat");
        second.gas_price = 99;
        ledger.put(second).await.unwrap();

        assert_eq!(ledger.len().await, 1);
        assert_eq!(ledger.get("cat", WALLET_A).await.unwrap().gas_price, 99);
    }

    #[tokio::test]
    async fn test_lists_descending_with_limit() {
        let ledger = MemoryClaimLedger::new();
        for catalog in ["c1", "c2", "c3"] {
            ledger.put(claim(WALLET_A, catalog)).await.unwrap();
        }
        ledger.put(claim(WALLET_B, "c1")).await.unwrap();

        let mine = ledger.list_by_wallet(WALLET_A, 10).await.unwrap();
        let ids: Vec<_> = mine.iter().map(|c| c.catalog_id.as_str()).collect();
        assert_eq!(ids, ["c3", "c2", "c1"]);

        let limited = ledger.list_by_wallet(WALLET_A, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].catalog_id, "c3");

        let all = ledger.list_recent(10).await.unwrap();
        assert_eq!(all.len(), 4);
        // 0xfb69... sorts after 0x5aae...
        assert_eq!(all[0].wallet_address, WALLET_B);
    }

    #[tokio::test]
    async fn test_reserve_is_exclusive() {
        let ledger = MemoryClaimLedger::new();
        ledger.reserve("cat", WALLET_A).await.unwrap();
        assert!(matches!(
            ledger.reserve("cat", &WALLET_A.to_lowercase()).await,
            Err(LedgerError::Exists)
        ));
        // Other pairs are unaffected
        ledger.reserve("dog", WALLET_A).await.unwrap();
        ledger.reserve("cat", WALLET_B).await.unwrap();
    }

    #[tokio::test]
    async fn test_release_allows_new_reservation() {
        let ledger = MemoryClaimLedger::new();
        ledger.reserve("cat", WALLET_A).await.unwrap();
        ledger.release("cat", WALLET_A).await.unwrap();
        assert!(!ledger.is_reserved("cat", WALLET_A).await);
        ledger.reserve("cat", WALLET_A).await.unwrap();
    }

    #[tokio::test]
    async fn test_reserve_refuses_recorded_claim() {
        let ledger = MemoryClaimLedger::new();
        ledger.put(claim(WALLET_A, "cat")).await.unwrap();
        assert!(matches!(
            ledger.reserve("cat", WALLET_A).await,
            Err(LedgerError::Exists)
        ));
    }

    #[tokio::test]
    async fn test_unknown_wallet_lists_empty() {
        let ledger = MemoryClaimLedger::new();
        ledger.put(claim(WALLET_A, "c1")).await.unwrap();
        assert!(ledger.list_by_wallet(WALLET_B, 10).await.unwrap().is_empty());
    }
}
