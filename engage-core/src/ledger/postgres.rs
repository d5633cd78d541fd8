//! PostgreSQL claim ledger.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{ledger_key, now_millis, ClaimLedger, LedgerError};
use crate::address::canonical_wallet;
use crate::model::Claim;

// Keys compare bytewise so listings match the in-memory ledger.
const LIST_RECENT_SQL: &str =
    r#"SELECT record FROM claims ORDER BY ledger_key COLLATE "C" DESC LIMIT $1"#;
const LIST_BY_WALLET_SQL: &str =
    r#"SELECT record FROM claims WHERE wallet = $1 ORDER BY ledger_key COLLATE "C" DESC LIMIT $2"#;

/// Claims stored as JSONB rows keyed by their ledger key.
#[derive(Clone)]
pub struct PostgresClaimLedger {
    pool: PgPool,
}

impl PostgresClaimLedger {
    /// Connect and apply migrations.
    pub async fn connect(database_url: &str) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| LedgerError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Claim ledger connected and migrations applied");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClaimLedger for PostgresClaimLedger {
    async fn get(&self, catalog_id: &str, wallet: &str) -> Result<Claim, LedgerError> {
        let row: Option<(Json<Claim>,)> =
            sqlx::query_as("SELECT record FROM claims WHERE ledger_key = $1")
                .bind(ledger_key(wallet, catalog_id))
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(Json(claim),)| claim).ok_or(LedgerError::NotFound)
    }

    async fn put(&self, mut claim: Claim) -> Result<Claim, LedgerError> {
        claim.created = now_millis();
        let key = ledger_key(&claim.wallet_address, &claim.catalog_id);

        sqlx::query(
            r#"
            INSERT INTO claims (ledger_key, wallet, catalog_id, record, created)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (ledger_key) DO UPDATE SET
                record = EXCLUDED.record,
                created = EXCLUDED.created
            "#,
        )
        .bind(&key)
        .bind(canonical_wallet(&claim.wallet_address))
        .bind(&claim.catalog_id)
        .bind(Json(&claim))
        .bind(claim.created)
        .execute(&self.pool)
        .await?;

        tracing::debug!(key = %key, "Stored claim");

        Ok(claim)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Claim>, LedgerError> {
        let rows: Vec<(Json<Claim>,)> = sqlx::query_as(LIST_RECENT_SQL)
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(Json(claim),)| claim).collect())
    }

    async fn list_by_wallet(&self, wallet: &str, limit: usize) -> Result<Vec<Claim>, LedgerError> {
        let rows: Vec<(Json<Claim>,)> = sqlx::query_as(LIST_BY_WALLET_SQL)
            .bind(canonical_wallet(wallet))
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(Json(claim),)| claim).collect())
    }

    async fn reserve(&self, catalog_id: &str, wallet: &str) -> Result<(), LedgerError> {
        let key = ledger_key(wallet, catalog_id);

        let result = sqlx::query(
            r#"
            INSERT INTO claim_reservations (ledger_key, created)
            SELECT $1, $2
            WHERE NOT EXISTS (SELECT 1 FROM claims WHERE ledger_key = $1)
            ON CONFLICT (ledger_key) DO NOTHING
            "#,
        )
        .bind(&key)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(key = %key, "Pair already reserved or claimed");
            return Err(LedgerError::Exists);
        }
        Ok(())
    }

    async fn release(&self, catalog_id: &str, wallet: &str) -> Result<(), LedgerError> {
        sqlx::query("DELETE FROM claim_reservations WHERE ledger_key = $1")
            .bind(ledger_key(wallet, catalog_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listings_order_bytewise() {
        for sql in [LIST_RECENT_SQL, LIST_BY_WALLET_SQL] {
            assert!(sql.contains(r#"ORDER BY ledger_key COLLATE "C" DESC"#), "{sql}");
        }
    }

    #[test]
    fn test_limit_param_saturates() {
        assert_eq!(limit_param(20), 20);
        assert_eq!(limit_param(usize::MAX), i64::MAX);
    }
}
