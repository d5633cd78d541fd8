//! Keyword check for claims.

use crate::model::ClaimKeyword;

/// Check the claimant's keywords against the catalog's comma-separated list.
///
/// Each catalog token (trimmed) must be matched by a distinct claim word with
/// identical text, and the two lists must have the same length. Matching is
/// case-sensitive and order-independent. An empty catalog string or an empty
/// claim list never matches.
pub fn keywords_match(claim_words: &[ClaimKeyword], catalog_keywords: &str) -> bool {
    if catalog_keywords.is_empty() || claim_words.is_empty() {
        return false;
    }

    let expected: Vec<&str> = catalog_keywords.split(',').map(str::trim).collect();
    if expected.len() != claim_words.len() {
        return false;
    }

    let mut used = vec![false; claim_words.len()];
    for token in expected {
        let slot = claim_words
            .iter()
            .enumerate()
            .find(|(i, kw)| !used[*i] && kw.word.trim() == token)
            .map(|(i, _)| i);
        match slot {
            Some(i) => used[i] = true,
            None => return false,
        }
    }
    true
}
