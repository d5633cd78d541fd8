//! Mint command - run the full claim workflow for one request.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use engage_core::{Catalog, ClaimRequest, EngageConfig};
use tracing::info;

use crate::utils::{build_orchestrator, format_timestamp, load_json};

pub async fn execute(catalog_path: &Path, request_path: &Path, quiet: bool) -> Result<()> {
    let catalog: Catalog = load_json(catalog_path, "catalog")?;
    let request: ClaimRequest = load_json(request_path, "request")?;

    if request.catalog_id != catalog.id {
        anyhow::bail!(
            "Invalid argument: request is for catalog {} but catalog file holds {}",
            request.catalog_id,
            catalog.id
        );
    }

    let config = EngageConfig::from_env();
    let orchestrator = build_orchestrator(&config).await?;

    let claim = orchestrator
        .mint_for_user(&request, Some(&catalog))
        .await
        .context("Claim was not minted")?;

    info!(tx_hash = ?claim.tx_hash, "Mint submitted");

    if !quiet {
        println!("{}", "MINTED".green().bold());
        println!("   {} {}", "Wallet:".dimmed(), claim.wallet_address);
        println!("   {} {}", "Catalog:".dimmed(), claim.catalog_id);
        println!(
            "   {} {}",
            "Transaction:".dimmed(),
            claim.tx_hash.as_deref().unwrap_or("-")
        );
        println!(
            "   {} {}",
            "Token URI:".dimmed(),
            claim.token_uri.as_deref().unwrap_or("-")
        );
        println!("   {} {}", "Recorded:".dimmed(), format_timestamp(claim.created));
    }
    Ok(())
}
