//! Sign command - produce a claim signature from a local key.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use engage_core::{ClaimSigner, DomainConfig};

use crate::utils::read_key_file;

pub fn execute(catalog_id: &str, key_file: &Path, quiet: bool) -> Result<()> {
    let key = read_key_file(key_file)?;
    let signer = ClaimSigner::from_hex(&key).map_err(|e| {
        anyhow!("Invalid argument: key file does not hold a secp256k1 private key ({e})")
    })?;

    let signature = signer
        .sign_claim(&DomainConfig::from_env(), catalog_id)
        .context("Failed to sign claim")?;

    if quiet {
        println!("{signature}");
    } else {
        println!("   {} {}", "Wallet:".dimmed(), signer.address());
        println!("   {} {}", "Catalog:".dimmed(), catalog_id);
        println!("   {} {}", "Signature:".dimmed(), signature.green());
    }
    Ok(())
}
