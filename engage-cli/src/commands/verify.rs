//! Verify command - check a claim signature without touching the network.

use anyhow::Result;
use colored::Colorize;
use engage_core::{DomainConfig, SignatureVerifier};
use tracing::{debug, error};

pub fn execute(catalog_id: &str, wallet: &str, signature: &str, quiet: bool) -> Result<()> {
    let domain = DomainConfig::from_env();
    debug!(name = %domain.name, chain_id = domain.chain_id, "Using signing domain");

    let verifier = SignatureVerifier::new(domain);
    match verifier.verify(wallet, signature, catalog_id) {
        Ok(()) => {
            if !quiet {
                println!("{}", "VALID".green().bold());
                println!("   {} {}", "Wallet:".dimmed(), wallet);
                println!("   {} {}", "Catalog:".dimmed(), catalog_id);
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Signature rejected");
            if !quiet {
                println!("{}", "REJECTED".red().bold());
                println!("   {} {}", "Reason:".dimmed(), e.to_string().red());
            }
            Err(anyhow::Error::new(e).context("Verification failed"))
        }
    }
}
