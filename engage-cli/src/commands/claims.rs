//! Read-side commands: previews, recent claims and broker balance.

use anyhow::{Context, Result};
use colored::Colorize;
use engage_core::{Address, EngageConfig};

use crate::utils::{build_orchestrator, format_ether, format_timestamp};

pub async fn previews(wallet: &str, limit: usize, quiet: bool) -> Result<()> {
    wallet
        .parse::<Address>()
        .with_context(|| format!("Invalid argument: wallet address {wallet}"))?;

    let orchestrator = build_orchestrator(&EngageConfig::from_env()).await?;
    let previews = orchestrator
        .resolve_previews(wallet, limit)
        .await
        .context("Failed to resolve claim previews")?;

    if quiet {
        println!("{}", serde_json::to_string(&previews)?);
        return Ok(());
    }

    if previews.is_empty() {
        println!("{}", "No claims for this wallet".dimmed());
        return Ok(());
    }
    for preview in &previews {
        let status = if preview.tx_status == 1 {
            "success".green()
        } else {
            "failed".red()
        };
        let token = preview
            .token_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}  token {}  {}  {}",
            preview.claim.catalog_id,
            token,
            status,
            format_timestamp(preview.claim.created).dimmed()
        );
    }
    Ok(())
}

pub async fn recent(limit: usize, quiet: bool) -> Result<()> {
    let orchestrator = build_orchestrator(&EngageConfig::from_env()).await?;
    let claims = orchestrator
        .list_claims(limit)
        .await
        .context("Failed to list claims")?;

    if quiet {
        println!("{}", serde_json::to_string(&claims)?);
        return Ok(());
    }
    for claim in &claims {
        println!(
            "{}  {}  {}  {}",
            format_timestamp(claim.created).dimmed(),
            claim.wallet_address,
            claim.catalog_id,
            claim.tx_hash.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub async fn balance(quiet: bool) -> Result<()> {
    let orchestrator = build_orchestrator(&EngageConfig::from_env()).await?;
    let wei = orchestrator
        .broker_balance()
        .await
        .context("Failed to read broker balance")?;

    if quiet {
        println!("{wei}");
    } else {
        println!("   {} {} ({} wei)", "Balance:".dimmed(), format_ether(wei), wei);
    }
    Ok(())
}
