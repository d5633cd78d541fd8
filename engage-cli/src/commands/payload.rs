//! Payload command - print the claim document for a wallet to sign.

use anyhow::{Context, Result};
use engage_core::{Address, DomainConfig, SignatureVerifier};

pub fn execute(catalog_id: &str, wallet: &str) -> Result<()> {
    wallet
        .parse::<Address>()
        .with_context(|| format!("Invalid argument: wallet address {wallet}"))?;

    let verifier = SignatureVerifier::new(DomainConfig::from_env());
    let payload = verifier.signing_payload(catalog_id, wallet);

    let json = serde_json::to_string_pretty(&payload).context("Failed to serialize payload")?;
    println!("{json}");
    Ok(())
}
