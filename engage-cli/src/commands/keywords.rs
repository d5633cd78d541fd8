//! Keywords command.

use anyhow::Result;
use colored::Colorize;
use engage_core::{keywords_match, ClaimError, ClaimKeyword};

pub fn execute(catalog: &str, words: Vec<String>, quiet: bool) -> Result<()> {
    let claim_words: Vec<ClaimKeyword> = words.into_iter().map(ClaimKeyword::new).collect();

    if keywords_match(&claim_words, catalog) {
        if !quiet {
            println!("{}", "MATCH".green().bold());
        }
        Ok(())
    } else {
        if !quiet {
            println!("{}", "MISMATCH".red().bold());
        }
        Err(ClaimError::Keyword.into())
    }
}
