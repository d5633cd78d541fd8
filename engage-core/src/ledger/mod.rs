//! Persisted claim records, one per (wallet, catalog) pair.
//!
//! Records live under the `claim` namespace at `/claim/<wallet>_<catalogId>`,
//! with the wallet in canonical lowercase form. Listing walks keys in
//! descending order. `put` never refuses an overwrite. Writers that must mint
//! a pair once take a reservation first: `reserve` is an atomic
//! insert-if-absent, so processes sharing one store cannot both proceed.

pub mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use error::LedgerError;
pub use memory::MemoryClaimLedger;
#[cfg(feature = "postgres")]
pub use postgres::PostgresClaimLedger;

use async_trait::async_trait;

use crate::address::canonical_wallet;
use crate::model::Claim;

/// Namespace of claim records.
pub const CLAIM_TABLE: &str = "claim";

/// `<wallet>_<catalogId>` with the wallet canonicalised.
pub fn pair_key(wallet: &str, catalog_id: &str) -> String {
    format!("{}_{}", canonical_wallet(wallet), catalog_id)
}

/// Full ledger key: `/claim/<wallet>_<catalogId>`.
pub fn ledger_key(wallet: &str, catalog_id: &str) -> String {
    format!("/{CLAIM_TABLE}/{}", pair_key(wallet, catalog_id))
}

/// Key prefix shared by every claim of one wallet.
pub fn wallet_prefix(wallet: &str) -> String {
    format!("/{CLAIM_TABLE}/{}_", canonical_wallet(wallet))
}

/// Current time in epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Claim record store.
#[async_trait]
pub trait ClaimLedger: Send + Sync {
    /// Fetch the claim for a pair; `LedgerError::NotFound` when absent.
    async fn get(&self, catalog_id: &str, wallet: &str) -> Result<Claim, LedgerError>;

    /// Insert or overwrite the pair's record, stamping `created` with the current time.
    async fn put(&self, claim: Claim) -> Result<Claim, LedgerError>;

    /// All claims, keys descending, at most `limit`.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Claim>, LedgerError>;

    /// Claims of one wallet, keys descending, at most `limit`.
    async fn list_by_wallet(&self, wallet: &str, limit: usize) -> Result<Vec<Claim>, LedgerError>;

    /// Mark the pair as being minted.
    ///
    /// Fails with `LedgerError::Exists` when the pair is already reserved or
    /// has a recorded claim. A reservation outlives the claim write.
    async fn reserve(&self, catalog_id: &str, wallet: &str) -> Result<(), LedgerError>;

    /// Drop a reservation whose mint was never submitted.
    async fn release(&self, catalog_id: &str, wallet: &str) -> Result<(), LedgerError>;
}
