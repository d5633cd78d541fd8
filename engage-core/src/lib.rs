//! Engage Core - claim verification and minting for proof-of-engagement tokens
//!
//! A wallet claims a catalog entry by signing an EIP-712 `claim` document.
//! The orchestrator checks the signature and the claimant's keywords,
//! publishes ERC-721 metadata to IPFS, submits a broker-signed `safeMint`
//! transaction and records the claim. At most one claim exists per
//! (wallet, catalog) pair.
//!
//! # Features
//!
//! - EIP-712 typed-data hashing and secp256k1 signer recovery
//! - Keyword check against the catalog's comma-separated list
//! - Claim ledger with in-memory and PostgreSQL (`postgres` feature) backends
//! - IPFS publisher and JSON-RPC chain client (`network` feature)
//! - Per-pair locking so concurrent duplicate claims mint once
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use engage_core::{
//!     Catalog, ClaimKeyword, ClaimOrchestrator, ClaimRequest, ClaimSigner, DomainConfig,
//!     MemoryClaimLedger, MockChain, MockPublisher,
//! };
//!
//! # async fn example() -> engage_core::Result<()> {
//! let domain = DomainConfig::default();
//! let orchestrator = ClaimOrchestrator::new(
//!     domain.clone(),
//!     Arc::new(MemoryClaimLedger::new()),
//!     Arc::new(MockPublisher::default()),
//!     Arc::new(MockChain::default()),
//! );
//!
//! let catalog = Catalog {
//!     id: "9m4e2mr0ui3e8a215n4g".into(),
//!     name: "Rollups".into(),
//!     description: String::new(),
//!     keywords: "alpha, beta".into(),
//!     image_link: "QmImage".into(),
//!     content_link: String::new(),
//!     video_link: None,
//! };
//!
//! let wallet = ClaimSigner::from_hex(&"11".repeat(32))?;
//! let request = ClaimRequest {
//!     catalog_id: catalog.id.clone(),
//!     wallet_address: wallet.address().to_string(),
//!     mailio_address: None,
//!     signature: wallet.sign_claim(&domain, &catalog.id)?,
//!     recaptcha_token: String::new(),
//!     visitor_id: String::new(),
//!     keywords: vec![ClaimKeyword::new("alpha"), ClaimKeyword::new("beta")],
//! };
//!
//! let claim = orchestrator.mint_for_user(&request, Some(&catalog)).await?;
//! println!("minted in {:?}", claim.tx_hash);
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod broker;
pub mod category;
pub mod chain;
pub mod config;
pub mod error;
pub mod hash;
pub mod keywords;
pub mod ledger;
pub mod model;
pub mod orchestrator;
pub mod publisher;
pub mod signature;
pub mod typed_data;

pub use address::{canonical_wallet, Address, AddressError};
pub use broker::BrokerKey;
pub use category::{CategoryId, CategoryIdError};
pub use chain::{
    ChainError, ChainMinter, MintSubmission, MockChain, ReceiptLog, TransactionReceipt, TxOptions,
};
pub use config::{ChainConfig, DomainConfig, EngageConfig, IpfsConfig};
pub use error::{ClaimError, Result};
pub use keywords::keywords_match;
pub use ledger::{ledger_key, ClaimLedger, LedgerError, MemoryClaimLedger};
pub use model::{
    Catalog, Claim, ClaimFingerprint, ClaimKeyword, ClaimPreview, ClaimRequest, MetadataAttribute,
    TokenMetadata,
};
pub use orchestrator::{token_id_from_receipt, ClaimOrchestrator, MintStage};
pub use publisher::{MetadataPublisher, MockPublisher, PublishError, UploadedObject};
pub use signature::{ClaimSigner, SignatureVerifier};
pub use typed_data::{TypedData, TypedDataDomain, TypedDataError};

#[cfg(feature = "network")]
pub use chain::JsonRpcChain;
#[cfg(feature = "network")]
pub use publisher::IpfsPublisher;

#[cfg(feature = "postgres")]
pub use ledger::PostgresClaimLedger;
