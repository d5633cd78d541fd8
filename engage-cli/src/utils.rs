//! Helpers shared across commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{TimeZone, Utc};
use serde::de::DeserializeOwned;
use tracing::debug;

use engage_core::{
    ClaimOrchestrator, EngageConfig, IpfsPublisher, JsonRpcChain, PostgresClaimLedger,
};

/// Read a JSON document from disk.
pub fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {what} file: {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("Invalid argument: {what} file is not valid JSON"))
}

/// Read a hex private key from a file, ignoring surrounding whitespace.
pub fn read_key_file(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read key file: {}", path.display()))?;
    Ok(contents.trim().to_string())
}

/// Format epoch milliseconds as a UTC timestamp.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{timestamp_ms}ms"),
    }
}

/// Render a wei amount as ether with up to 6 decimals.
pub fn format_ether(wei: u128) -> String {
    const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;
    let whole = wei / WEI_PER_ETHER;
    let micro = (wei % WEI_PER_ETHER) / 1_000_000_000_000;
    format!("{whole}.{micro:06}")
}

/// Wire the orchestrator to Postgres, IPFS and the chain node from the environment.
pub async fn build_orchestrator(config: &EngageConfig) -> Result<ClaimOrchestrator> {
    let database_url = std::env::var("DATABASE_URL")
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("DATABASE_URL is not configured"))?;
    if config.chain.broker_private_key.is_none() {
        return Err(anyhow!("BROKER_PRIVATE_KEY is not configured"));
    }

    let chain = JsonRpcChain::new(&config.chain).context("Invalid chain configuration")?;
    let publisher = IpfsPublisher::new(config.ipfs.clone()).context("Invalid IPFS configuration")?;
    let ledger = PostgresClaimLedger::connect(&database_url)
        .await
        .context("Failed to connect to claim database")?;

    debug!(rpc_url = %config.chain.rpc_url, "Orchestrator configured");

    Ok(ClaimOrchestrator::from_config(
        config,
        Arc::new(ledger),
        Arc::new(publisher),
        Arc::new(chain),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        // 2024-01-15 12:30:45.123 UTC
        let formatted = format_timestamp(1705321845123);
        assert!(formatted.contains("2024-01-15"));
        assert!(formatted.contains("UTC"));
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(0), "0.000000");
        assert_eq!(format_ether(1_500_000_000_000_000_000), "1.500000");
        assert_eq!(format_ether(123_456_789_000_000), "0.000123");
    }
}
