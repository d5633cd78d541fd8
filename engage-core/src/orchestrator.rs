//! End-to-end claim workflow.
//!
//! A mint runs strictly in order:
//!
//! ```text
//! Received → CatalogResolved → SignatureVerified → KeywordsVerified →
//! MetadataPublished → DuplicateChecked → TransactionSubmitted →
//! LedgerPersisted → Complete
//! ```
//!
//! Any failure is terminal. Signature and keyword checks run before any
//! upload or chain call. The duplicate check, chain submission and ledger
//! write for one (wallet, catalog) pair run under a per-pair lock, so two
//! concurrent requests for the same pair produce exactly one mint. Across
//! processes sharing a ledger the same guarantee comes from the ledger
//! reservation taken before submission.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, warn};

use crate::address::Address;
use crate::category::CategoryId;
use crate::chain::{ChainError, ChainMinter, MintSubmission, TransactionReceipt, TxOptions};
use crate::config::{DomainConfig, EngageConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_MINT_GAS_LIMIT};
use crate::error::{ClaimError, Result};
use crate::keywords::keywords_match;
use crate::ledger::{pair_key, ClaimLedger, LedgerError};
use crate::model::{Catalog, Claim, ClaimPreview, ClaimRequest, TokenMetadata};
use crate::publisher::MetadataPublisher;
use crate::signature::SignatureVerifier;
use crate::typed_data::TypedData;

/// Progress of a mint request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintStage {
    Received,
    CatalogResolved,
    SignatureVerified,
    KeywordsVerified,
    MetadataPublished,
    DuplicateChecked,
    TransactionSubmitted,
    LedgerPersisted,
    Complete,
}

impl fmt::Display for MintStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::CatalogResolved => "catalog_resolved",
            Self::SignatureVerified => "signature_verified",
            Self::KeywordsVerified => "keywords_verified",
            Self::MetadataPublished => "metadata_published",
            Self::DuplicateChecked => "duplicate_checked",
            Self::TransactionSubmitted => "transaction_submitted",
            Self::LedgerPersisted => "ledger_persisted",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

fn enter(stage: MintStage) {
    debug!(stage = %stage, "Mint stage reached");
}

/// Per-pair mutexes. Entries are dropped once nobody holds or awaits them.
#[derive(Default)]
struct PairLocks {
    inner: DashMap<String, Arc<Mutex<()>>>,
}

struct PairGuard<'a> {
    locks: &'a PairLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl PairLocks {
    async fn acquire(&self, key: String) -> PairGuard<'_> {
        let mutex = self.inner.entry(key.clone()).or_default().clone();
        let guard = mutex.lock_owned().await;
        PairGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .inner
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Extract the token id from the contract's 4-topic logs (`Transfer` shape).
///
/// The last matching log wins. Ids wider than 128 bits are skipped.
pub fn token_id_from_receipt(receipt: &TransactionReceipt, contract: Address) -> Option<u128> {
    let mut token_id = None;
    for log in receipt
        .logs
        .iter()
        .filter(|log| log.address == contract && log.topics.len() == 4)
    {
        let topic = &log.topics[3];
        if topic[..16].iter().any(|b| *b != 0) {
            warn!(topic = %hex::encode(topic), "Token id wider than 128 bits, skipped");
            continue;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&topic[16..]);
        token_id = Some(u128::from_be_bytes(low));
    }
    token_id
}

/// A failed submission and whether the transaction may have reached the node.
struct SubmitFailure {
    error: ClaimError,
    maybe_sent: bool,
}

impl SubmitFailure {
    fn unsent(error: ClaimError) -> Self {
        Self {
            error,
            maybe_sent: false,
        }
    }
}

/// Composes verification, publishing, minting and the ledger.
pub struct ClaimOrchestrator {
    verifier: SignatureVerifier,
    ledger: Arc<dyn ClaimLedger>,
    publisher: Arc<dyn MetadataPublisher>,
    chain: Arc<dyn ChainMinter>,
    gas_limit: u64,
    call_timeout: Duration,
    locks: PairLocks,
    nonce_lock: Mutex<()>,
}

impl ClaimOrchestrator {
    pub fn new(
        domain: DomainConfig,
        ledger: Arc<dyn ClaimLedger>,
        publisher: Arc<dyn MetadataPublisher>,
        chain: Arc<dyn ChainMinter>,
    ) -> Self {
        Self {
            verifier: SignatureVerifier::new(domain),
            ledger,
            publisher,
            chain,
            gas_limit: DEFAULT_MINT_GAS_LIMIT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            locks: PairLocks::default(),
            nonce_lock: Mutex::new(()),
        }
    }

    pub fn from_config(
        config: &EngageConfig,
        ledger: Arc<dyn ClaimLedger>,
        publisher: Arc<dyn MetadataPublisher>,
        chain: Arc<dyn ChainMinter>,
    ) -> Self {
        Self::new(config.domain.clone(), ledger, publisher, chain)
            .with_gas_limit(config.chain.gas_limit)
            .with_call_timeout(config.call_timeout)
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Deadline for each ledger, publisher or chain call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Run `fut` under the call deadline.
    async fn bounded<F: Future>(&self, what: &str, fut: F) -> Result<F::Output> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| {
                error!(call = what, timeout_ms = self.call_timeout.as_millis() as u64, "Call timed out");
                ClaimError::internal(format!("{what} timed out"))
            })
    }

    /// Verify, publish, mint and record a claim.
    ///
    /// `catalog` is the caller's lookup of `request.catalog_id`; `None` fails
    /// with `NotFound`.
    #[instrument(skip_all, fields(wallet = %request.wallet_address, catalog_id = %request.catalog_id))]
    pub async fn mint_for_user(
        &self,
        request: &ClaimRequest,
        catalog: Option<&Catalog>,
    ) -> Result<Claim> {
        enter(MintStage::Received);

        let catalog = catalog
            .ok_or_else(|| ClaimError::not_found(format!("catalog {}", request.catalog_id)))?;
        enter(MintStage::CatalogResolved);

        if let Err(e) =
            self.verifier
                .verify(&request.wallet_address, &request.signature, &catalog.id)
        {
            warn!(error = %e, "Claim rejected");
            return Err(e);
        }
        let recipient: Address = request
            .wallet_address
            .parse()
            .map_err(|e| ClaimError::signature(format!("invalid wallet address: {e}")))?;
        enter(MintStage::SignatureVerified);

        if !keywords_match(&request.keywords, &catalog.keywords) {
            warn!("Claim rejected: keywords do not match");
            return Err(ClaimError::Keyword);
        }
        enter(MintStage::KeywordsVerified);

        let category_id: CategoryId = catalog.id.parse().map_err(|e| {
            error!(error = %e, "Catalog id is not a valid category id");
            ClaimError::internal(format!("catalog id {}: {e}", catalog.id))
        })?;
        let token_uri = self.publish_metadata(request, catalog).await?;
        enter(MintStage::MetadataPublished);

        let _pair = self
            .locks
            .acquire(pair_key(&request.wallet_address, &catalog.id))
            .await;

        match self
            .bounded("ledger lookup", self.ledger.get(&catalog.id, &request.wallet_address))
            .await?
        {
            Ok(_) => {
                warn!("Claim rejected: already claimed");
                return Err(ClaimError::Exists {
                    wallet: request.wallet_address.clone(),
                    catalog_id: catalog.id.clone(),
                });
            }
            Err(LedgerError::NotFound) => {}
            Err(e) => {
                error!(error = %e, "Ledger lookup failed");
                return Err(ClaimError::internal(format!("ledger lookup: {e}")));
            }
        }

        match self
            .bounded(
                "ledger reservation",
                self.ledger.reserve(&catalog.id, &request.wallet_address),
            )
            .await?
        {
            Ok(()) => {}
            Err(LedgerError::Exists) => {
                warn!("Claim rejected: pair reserved by another request");
                return Err(ClaimError::Exists {
                    wallet: request.wallet_address.clone(),
                    catalog_id: catalog.id.clone(),
                });
            }
            Err(e) => {
                error!(error = %e, "Ledger reservation failed");
                return Err(ClaimError::internal(format!("ledger reservation: {e}")));
            }
        }
        enter(MintStage::DuplicateChecked);

        let submission = match self.submit_mint(recipient, &token_uri, category_id).await {
            Ok(submission) => submission,
            Err(SubmitFailure {
                error,
                maybe_sent: false,
            }) => {
                self.release(&catalog.id, &request.wallet_address).await;
                return Err(error);
            }
            Err(SubmitFailure {
                error,
                maybe_sent: true,
            }) => {
                error!(error = %error, "Mint outcome unknown, pair stays reserved");
                return Err(error);
            }
        };
        enter(MintStage::TransactionSubmitted);

        let claim = Claim {
            catalog_id: catalog.id.clone(),
            wallet_address: request.wallet_address.clone(),
            mailio_address: request.mailio_address.clone(),
            signature: request.signature.clone(),
            gas_price: submission.gas_price,
            tx_hash: Some(submission.tx_hash.clone()),
            token_uri: Some(token_uri),
            created: 0,
        };

        let stored = match self.bounded("ledger write", self.ledger.put(claim)).await {
            Ok(Ok(stored)) => stored,
            Ok(Err(e)) => {
                error!(tx_hash = %submission.tx_hash, error = %e, "Mint submitted but claim not recorded");
                return Err(ClaimError::internal(format!("ledger write: {e}")));
            }
            Err(e) => {
                error!(tx_hash = %submission.tx_hash, "Mint submitted but claim not recorded");
                return Err(e);
            }
        };
        enter(MintStage::LedgerPersisted);

        info!(tx_hash = %submission.tx_hash, "Claim minted");
        enter(MintStage::Complete);
        Ok(stored)
    }

    async fn publish_metadata(&self, request: &ClaimRequest, catalog: &Catalog) -> Result<String> {
        let metadata = TokenMetadata::for_catalog(catalog);
        let bytes = serde_json::to_vec(&metadata)
            .map_err(|e| ClaimError::internal(format!("metadata encoding: {e}")))?;
        let name = format!("{}_{}.json", request.wallet_address, catalog.id);

        let objects = self
            .bounded("metadata upload", self.publisher.upload(&name, bytes))
            .await?
            .map_err(|e| {
                error!(error = %e, "Metadata upload failed");
                ClaimError::internal(format!("metadata upload: {e}"))
            })?;

        let first = objects.first().ok_or_else(|| {
            error!("Metadata upload returned no objects");
            ClaimError::internal("metadata upload returned no objects")
        })?;

        Ok(format!("ipfs://{}", first.hash))
    }

    /// Drop the pair's reservation after a mint that never left.
    async fn release(&self, catalog_id: &str, wallet: &str) {
        match self.bounded("ledger release", self.ledger.release(catalog_id, wallet)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Reservation not released"),
            Err(_) => error!("Reservation not released"),
        }
    }

    /// Look up nonce and gas price, then submit `safeMint`.
    ///
    /// Holds the broker nonce lock throughout, so mints from this orchestrator
    /// never reuse a nonce. Other processes signing with the same broker key
    /// can still race and fail with "nonce too low".
    async fn submit_mint(
        &self,
        recipient: Address,
        token_uri: &str,
        category_id: CategoryId,
    ) -> std::result::Result<MintSubmission, SubmitFailure> {
        let broker = self.chain.broker_address();
        let _nonce = self.nonce_lock.lock().await;

        let nonce = self
            .bounded("nonce lookup", self.chain.pending_nonce(broker))
            .await
            .map_err(SubmitFailure::unsent)?
            .map_err(|e| {
                error!(error = %e, "Nonce lookup failed");
                SubmitFailure::unsent(ClaimError::internal(format!("nonce lookup: {e}")))
            })?;

        let gas_price = self
            .bounded("gas price lookup", self.chain.suggested_gas_price())
            .await
            .map_err(SubmitFailure::unsent)?
            .map_err(|e| {
                error!(error = %e, "Gas price lookup failed");
                SubmitFailure::unsent(ClaimError::internal(format!("gas price lookup: {e}")))
            })?;

        let opts = TxOptions {
            from: broker,
            nonce,
            gas_price,
            gas_limit: self.gas_limit,
            value: 0,
        };

        match self
            .bounded(
                "mint submission",
                self.chain.mint(&opts, recipient, token_uri, category_id),
            )
            .await
        {
            Ok(Ok(submission)) => Ok(submission),
            Ok(Err(e)) => {
                error!(error = %e, nonce, "Mint submission failed");
                Err(SubmitFailure {
                    maybe_sent: matches!(e, ChainError::Transport(_) | ChainError::Decode(_)),
                    error: ClaimError::internal(format!("mint submission: {e}")),
                })
            }
            Err(error) => Err(SubmitFailure {
                error,
                maybe_sent: true,
            }),
        }
    }

    /// A wallet's claims with token id and status read from chain receipts.
    ///
    /// A claim whose receipt is missing fails the whole call with `NotFound`.
    #[instrument(skip_all, fields(wallet = %wallet, limit))]
    pub async fn resolve_previews(&self, wallet: &str, limit: usize) -> Result<Vec<ClaimPreview>> {
        let claims = self
            .bounded("ledger listing", self.ledger.list_by_wallet(wallet, limit))
            .await?
            .map_err(|e| ClaimError::internal(format!("ledger listing: {e}")))?;

        let contract = self.chain.contract_address();
        let mut previews = Vec::with_capacity(claims.len());

        for claim in claims {
            let tx_hash = claim
                .tx_hash
                .clone()
                .ok_or_else(|| ClaimError::not_found(format!("claim {} has no transaction", claim.catalog_id)))?;

            let receipt = self
                .bounded("receipt lookup", self.chain.transaction_receipt(&tx_hash))
                .await?
                .map_err(|e| {
                    error!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed");
                    ClaimError::internal(format!("receipt lookup: {e}"))
                })?
                .ok_or_else(|| ClaimError::not_found(format!("receipt for {tx_hash}")))?;

            previews.push(ClaimPreview {
                token_id: token_id_from_receipt(&receipt, contract),
                tx_status: receipt.status,
                claim,
            });
        }

        Ok(previews)
    }

    /// The typed-data document the wallet must sign for `catalog`.
    ///
    /// Refused with `Exists` once the pair has been claimed.
    #[instrument(skip_all, fields(wallet = %wallet))]
    pub async fn signing_payload(&self, catalog: Option<&Catalog>, wallet: &str) -> Result<TypedData> {
        let catalog = catalog.ok_or_else(|| ClaimError::not_found("catalog"))?;

        match self
            .bounded("ledger lookup", self.ledger.get(&catalog.id, wallet))
            .await?
        {
            Ok(_) => Err(ClaimError::Exists {
                wallet: wallet.to_string(),
                catalog_id: catalog.id.clone(),
            }),
            Err(LedgerError::NotFound) => Ok(self.verifier.signing_payload(&catalog.id, wallet)),
            Err(e) => Err(ClaimError::internal(format!("ledger lookup: {e}"))),
        }
    }

    /// The recorded claim of one pair.
    pub async fn get_claim(&self, catalog_id: &str, wallet: &str) -> Result<Claim> {
        match self
            .bounded("ledger lookup", self.ledger.get(catalog_id, wallet))
            .await?
        {
            Ok(claim) => Ok(claim),
            Err(LedgerError::NotFound) => Err(ClaimError::not_found(format!(
                "claim {wallet}_{catalog_id}"
            ))),
            Err(e) => Err(ClaimError::internal(format!("ledger lookup: {e}"))),
        }
    }

    /// Most recent claims across all wallets.
    pub async fn list_claims(&self, limit: usize) -> Result<Vec<Claim>> {
        self.bounded("ledger listing", self.ledger.list_recent(limit))
            .await?
            .map_err(|e| ClaimError::internal(format!("ledger listing: {e}")))
    }

    /// Broker wallet balance in wei.
    pub async fn broker_balance(&self) -> Result<u128> {
        let broker = self.chain.broker_address();
        self.bounded("balance lookup", self.chain.balance(broker))
            .await?
            .map_err(|e| ClaimError::internal(format!("balance lookup: {e}")))
    }

    #[cfg(test)]
    fn held_locks(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MockChain, ReceiptLog};
    use crate::ledger::MemoryClaimLedger;
    use async_trait::async_trait;
    use crate::model::ClaimKeyword;
    use crate::publisher::MockPublisher;
    use crate::signature::ClaimSigner;

    const CATALOG_ID: &str = "9m4e2mr0ui3e8a215n4g";

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Fault {
        Get,
        Put,
    }

    /// Memory ledger whose lookups or writes fail.
    struct FaultyLedger {
        inner: MemoryClaimLedger,
        fault: Fault,
    }

    impl FaultyLedger {
        fn new(fault: Fault) -> Self {
            Self {
                inner: MemoryClaimLedger::new(),
                fault,
            }
        }
    }

    #[async_trait]
    impl ClaimLedger for FaultyLedger {
        async fn get(&self, catalog_id: &str, wallet: &str) -> std::result::Result<Claim, LedgerError> {
            if self.fault == Fault::Get {
                return Err(LedgerError::Connection("connection reset".into()));
            }
            self.inner.get(catalog_id, wallet).await
        }

        async fn put(&self, claim: Claim) -> std::result::Result<Claim, LedgerError> {
            if self.fault == Fault::Put {
                return Err(LedgerError::Query("disk full".into()));
            }
            self.inner.put(claim).await
        }

        async fn list_recent(&self, limit: usize) -> std::result::Result<Vec<Claim>, LedgerError> {
            self.inner.list_recent(limit).await
        }

        async fn list_by_wallet(
            &self,
            wallet: &str,
            limit: usize,
        ) -> std::result::Result<Vec<Claim>, LedgerError> {
            self.inner.list_by_wallet(wallet, limit).await
        }

        async fn reserve(&self, catalog_id: &str, wallet: &str) -> std::result::Result<(), LedgerError> {
            self.inner.reserve(catalog_id, wallet).await
        }

        async fn release(&self, catalog_id: &str, wallet: &str) -> std::result::Result<(), LedgerError> {
            self.inner.release(catalog_id, wallet).await
        }
    }

    struct Harness {
        orchestrator: ClaimOrchestrator,
        ledger: Arc<MemoryClaimLedger>,
        publisher: Arc<MockPublisher>,
        chain: Arc<MockChain>,
        signer: ClaimSigner,
    }

    fn harness_with(publisher: MockPublisher) -> Harness {
        let ledger = Arc::new(MemoryClaimLedger::new());
        let publisher = Arc::new(publisher);
        let chain = Arc::new(MockChain::default());
        let orchestrator = ClaimOrchestrator::new(
            DomainConfig::default(),
            ledger.clone(),
            publisher.clone(),
            chain.clone(),
        );
        Harness {
            orchestrator,
            ledger,
            publisher,
            chain,
            signer: ClaimSigner::from_hex(&"11".repeat(32)).unwrap(),
        }
    }

    fn harness() -> Harness {
        harness_with(MockPublisher::default())
    }

    fn catalog() -> Catalog {
        Catalog {
            id: CATALOG_ID.into(),
            name: "Rollups".into(),
            description: "Intro".into(),
            keywords: "alpha, beta".into(),
            image_link: "QmImage".into(),
            content_link: "https://example.org".into(),
            video_link: None,
        }
    }

    fn request(h: &Harness) -> ClaimRequest {
        ClaimRequest {
            catalog_id: CATALOG_ID.into(),
            wallet_address: h.signer.address().to_string(),
            mailio_address: Some("alice@mail.io".into()),
            signature: h.signer.sign_claim(&DomainConfig::default(), CATALOG_ID).unwrap(),
            recaptcha_token: String::new(),
            visitor_id: "v1".into(),
            keywords: vec![ClaimKeyword::new("beta"), ClaimKeyword::new("alpha")],
        }
    }

    #[tokio::test]
    async fn test_missing_catalog_is_not_found() {
        let h = harness();
        let result = h.orchestrator.mint_for_user(&request(&h), None).await;
        assert!(matches!(result, Err(ClaimError::NotFound(_))));
        assert_eq!(h.publisher.calls(), 0);
    }

    #[tokio::test]
    async fn test_keyword_mismatch_before_side_effects() {
        let h = harness();
        let mut req = request(&h);
        req.keywords.pop();
        let result = h.orchestrator.mint_for_user(&req, Some(&catalog())).await;
        assert_eq!(result, Err(ClaimError::Keyword));
        assert_eq!(h.publisher.calls(), 0);
        assert_eq!(h.chain.calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_is_internal() {
        let h = harness_with(MockPublisher::failing());
        let result = h.orchestrator.mint_for_user(&request(&h), Some(&catalog())).await;
        assert!(matches!(result, Err(ClaimError::Internal(_))));
        assert_eq!(h.chain.mints(), 0);
        assert!(h.ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_upload_is_internal() {
        let h = harness_with(MockPublisher::empty());
        let result = h.orchestrator.mint_for_user(&request(&h), Some(&catalog())).await;
        assert!(matches!(result, Err(ClaimError::Internal(_))));
        assert_eq!(h.chain.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_category_is_internal() {
        let h = harness();
        let mut bad = catalog();
        bad.id = "not-an-xid".into();
        let mut req = request(&h);
        req.signature = h.signer.sign_claim(&DomainConfig::default(), "not-an-xid").unwrap();
        let result = h.orchestrator.mint_for_user(&req, Some(&bad)).await;
        assert!(matches!(result, Err(ClaimError::Internal(_))));
        assert_eq!(h.publisher.calls(), 0);
    }

    #[tokio::test]
    async fn test_chain_failure_leaves_ledger_empty() {
        let h = harness();
        h.chain.set_fail_mints(true);
        let result = h.orchestrator.mint_for_user(&request(&h), Some(&catalog())).await;
        assert!(matches!(result, Err(ClaimError::Internal(_))));
        assert!(h.ledger.is_empty().await);
        assert!(!h.ledger.is_reserved(CATALOG_ID, &h.signer.address().to_string()).await);
        assert_eq!(h.orchestrator.held_locks(), 0);

        // Rejected by the node, so the claim can be retried
        h.chain.set_fail_mints(false);
        h.orchestrator
            .mint_for_user(&request(&h), Some(&catalog()))
            .await
            .unwrap();
        assert_eq!(h.chain.mints(), 1);
    }

    #[tokio::test]
    async fn test_ledger_lookup_failure_is_internal() {
        let h = harness();
        let ledger = Arc::new(FaultyLedger::new(Fault::Get));
        let chain = Arc::new(MockChain::default());
        let orchestrator = ClaimOrchestrator::new(
            DomainConfig::default(),
            ledger.clone(),
            Arc::new(MockPublisher::default()),
            chain.clone(),
        );

        let result = orchestrator.mint_for_user(&request(&h), Some(&catalog())).await;
        assert!(matches!(result, Err(ClaimError::Internal(msg)) if msg.contains("ledger lookup")));
        assert_eq!(chain.calls(), 0);
        assert!(!ledger.inner.is_reserved(CATALOG_ID, &h.signer.address().to_string()).await);
        assert_eq!(orchestrator.held_locks(), 0);
    }

    #[tokio::test]
    async fn test_ledger_write_failure_after_mint() {
        let h = harness();
        let ledger = Arc::new(FaultyLedger::new(Fault::Put));
        let chain = Arc::new(MockChain::default());
        let orchestrator = ClaimOrchestrator::new(
            DomainConfig::default(),
            ledger.clone(),
            Arc::new(MockPublisher::default()),
            chain.clone(),
        );
        let req = request(&h);

        let result = orchestrator.mint_for_user(&req, Some(&catalog())).await;
        assert!(matches!(result, Err(ClaimError::Internal(msg)) if msg.contains("ledger write")));
        assert_eq!(chain.mints(), 1);
        assert_eq!(orchestrator.held_locks(), 0);
        assert!(ledger.inner.is_empty().await);

        // The pair stays reserved, so a retry cannot mint twice
        let retry = orchestrator.mint_for_user(&req, Some(&catalog())).await;
        assert!(matches!(retry, Err(ClaimError::Exists { .. })));
        assert_eq!(chain.mints(), 1);
    }

    #[tokio::test]
    async fn test_mint_records_claim_and_metadata() {
        let h = harness();
        let claim = h
            .orchestrator
            .mint_for_user(&request(&h), Some(&catalog()))
            .await
            .unwrap();

        assert!(claim.tx_hash.as_deref().unwrap().starts_with("0x"));
        assert!(claim.token_uri.as_deref().unwrap().starts_with("ipfs://"));
        assert_eq!(claim.gas_price, 30_000_000_000);
        assert_eq!(claim.mailio_address.as_deref(), Some("alice@mail.io"));
        assert!(claim.created > 0);

        let uploads = h.publisher.uploads();
        assert_eq!(
            uploads[0].0,
            format!("{}_{CATALOG_ID}.json", h.signer.address())
        );
        let metadata: serde_json::Value = serde_json::from_slice(&uploads[0].1).unwrap();
        assert_eq!(metadata["image"], "ipfs://QmImage");
        assert_eq!(
            claim.token_uri.unwrap(),
            format!("ipfs://{}", MockPublisher::content_id(&uploads[0].1))
        );
        assert_eq!(h.orchestrator.held_locks(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_rejected_with_pair() {
        let h = harness();
        let req = request(&h);
        h.orchestrator.mint_for_user(&req, Some(&catalog())).await.unwrap();

        let err = h
            .orchestrator
            .mint_for_user(&req, Some(&catalog()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClaimError::Exists {
                wallet: req.wallet_address.clone(),
                catalog_id: CATALOG_ID.into()
            }
        );
        assert_eq!(h.chain.mints(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_with_other_wallet_case() {
        let h = harness();
        let req = request(&h);
        h.orchestrator.mint_for_user(&req, Some(&catalog())).await.unwrap();

        let mut lower = req.clone();
        lower.wallet_address = h.signer.address().to_lower_hex();
        let result = h.orchestrator.mint_for_user(&lower, Some(&catalog())).await;
        assert!(matches!(result, Err(ClaimError::Exists { .. })));
        assert_eq!(h.chain.mints(), 1);
    }

    #[tokio::test]
    async fn test_call_timeout_is_internal() {
        let ledger = Arc::new(MemoryClaimLedger::new());
        let chain = Arc::new(MockChain::default().with_mint_delay(Duration::from_millis(200)));
        let orchestrator = ClaimOrchestrator::new(
            DomainConfig::default(),
            ledger.clone(),
            Arc::new(MockPublisher::default()),
            chain,
        )
        .with_call_timeout(Duration::from_millis(20));

        let h = harness();
        let result = orchestrator.mint_for_user(&request(&h), Some(&catalog())).await;
        assert!(matches!(result, Err(ClaimError::Internal(msg)) if msg.contains("timed out")));
        assert!(ledger.is_empty().await);
        // The transaction may still land, so the pair is not released
        assert!(ledger.is_reserved(CATALOG_ID, &h.signer.address().to_string()).await);
    }

    #[tokio::test]
    async fn test_signing_payload_refused_after_claim() {
        let h = harness();
        let wallet = h.signer.address().to_string();
        let payload = h
            .orchestrator
            .signing_payload(Some(&catalog()), &wallet)
            .await
            .unwrap();
        assert_eq!(payload.primary_type, "claim");

        h.orchestrator.mint_for_user(&request(&h), Some(&catalog())).await.unwrap();
        let result = h.orchestrator.signing_payload(Some(&catalog()), &wallet).await;
        assert!(matches!(result, Err(ClaimError::Exists { .. })));
        assert!(matches!(
            h.orchestrator.signing_payload(None, &wallet).await,
            Err(ClaimError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_and_list_claims() {
        let h = harness();
        let wallet = h.signer.address().to_string();
        assert!(matches!(
            h.orchestrator.get_claim(CATALOG_ID, &wallet).await,
            Err(ClaimError::NotFound(_))
        ));

        h.orchestrator.mint_for_user(&request(&h), Some(&catalog())).await.unwrap();
        assert!(h.orchestrator.get_claim(CATALOG_ID, &wallet).await.is_ok());
        assert_eq!(h.orchestrator.list_claims(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_broker_balance() {
        let h = harness();
        assert_eq!(
            h.orchestrator.broker_balance().await.unwrap(),
            5_000_000_000_000_000_000
        );
    }

    #[test]
    fn test_token_id_from_receipt() {
        let contract = Address([0xc0; 20]);
        let mut id_topic = [0u8; 32];
        id_topic[31] = 9;
        let mut wide = [0u8; 32];
        wide[0] = 1;

        let receipt = TransactionReceipt {
            status: 1,
            logs: vec![
                // Other contract
                ReceiptLog {
                    address: Address([1; 20]),
                    topics: vec![[0; 32], [0; 32], [0; 32], [0xff; 32]],
                },
                // Three topics only
                ReceiptLog {
                    address: contract,
                    topics: vec![[0; 32], [0; 32], [0; 32]],
                },
                ReceiptLog {
                    address: contract,
                    topics: vec![[0; 32], [0; 32], [0; 32], id_topic],
                },
                ReceiptLog {
                    address: contract,
                    topics: vec![[0; 32], [0; 32], [0; 32], wide],
                },
            ],
        };
        assert_eq!(token_id_from_receipt(&receipt, contract), Some(9));
        assert_eq!(
            token_id_from_receipt(&TransactionReceipt { status: 1, logs: vec![] }, contract),
            None
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(MintStage::DuplicateChecked.to_string(), "duplicate_checked");
        assert_eq!(MintStage::Complete.to_string(), "complete");
    }
}
