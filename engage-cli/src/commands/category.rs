//! Category command - show the bytes12 category id of a catalog id.

use anyhow::{Context, Result};
use engage_core::CategoryId;

pub fn execute(catalog_id: &str) -> Result<()> {
    let category: CategoryId = catalog_id
        .parse()
        .with_context(|| format!("Invalid argument: catalog id {catalog_id}"))?;

    println!("bytes12: 0x{}", hex::encode(category.as_bytes()));
    println!("word:    0x{}", hex::encode(category.to_word()));
    Ok(())
}
