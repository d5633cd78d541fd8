//! Records exchanged with the claim workflow.

use serde::{Deserialize, Serialize};

/// Background color of every minted token card.
pub const TOKEN_BACKGROUND_COLOR: &str = "212529";

/// A catalog entry that can be claimed. Owned by the caller's catalog store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// xid text form; decodes to the on-chain category id.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Comma-separated keyword list a claimant must reproduce.
    #[serde(default)]
    pub keywords: String,
    /// IPFS content hash of the token image.
    #[serde(default)]
    pub image_link: String,
    #[serde(default)]
    pub content_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimKeyword {
    pub word: String,
}

impl ClaimKeyword {
    pub fn new(word: impl Into<String>) -> Self {
        Self { word: word.into() }
    }
}

/// What a claimant submits. Keywords are checked, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub catalog_id: String,
    pub wallet_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailio_address: Option<String>,
    /// 65-byte `r ‖ s ‖ v` hex.
    pub signature: String,
    #[serde(default)]
    pub recaptcha_token: String,
    #[serde(default)]
    pub visitor_id: String,
    #[serde(default)]
    pub keywords: Vec<ClaimKeyword>,
}

/// A persisted claim. Written once after the mint transaction is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub catalog_id: String,
    pub wallet_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailio_address: Option<String>,
    pub signature: String,
    pub gas_price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    /// Epoch milliseconds, set by the ledger on write.
    #[serde(default)]
    pub created: i64,
}

/// Browser fingerprint attached to a claim attempt.
///
/// At most one record per (catalog, visitor). Not consulted by the mint workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimFingerprint {
    pub catalog_id: String,
    pub visitor_id: String,
}

impl ClaimFingerprint {
    pub fn key(&self) -> String {
        format!("{}_{}", self.catalog_id, self.visitor_id)
    }
}

/// A claim enriched with on-chain state at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPreview {
    #[serde(flatten)]
    pub claim: Claim,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<u128>,
    /// Receipt status: 1 success, 0 reverted.
    pub tx_status: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub display_type: String,
    pub trait_type: String,
    pub value: u64,
}

/// ERC-721 metadata document published for each claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    pub attributes: Vec<MetadataAttribute>,
}

impl TokenMetadata {
    pub fn for_catalog(catalog: &Catalog) -> Self {
        Self {
            name: catalog.name.clone(),
            description: catalog.description.clone(),
            image: format!("ipfs://{}", catalog.image_link),
            external_url: Some(catalog.content_link.clone()).filter(|s| !s.is_empty()),
            youtube_url: catalog.video_link.clone().filter(|s| !s.is_empty()),
            background_color: Some(TOKEN_BACKGROUND_COLOR.to_string()),
            attributes: vec![MetadataAttribute {
                display_type: "boost_number".to_string(),
                trait_type: "informed".to_string(),
                value: 5,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog {
            id: "9m4e2mr0ui3e8a215n4g".into(),
            name: "Rollups 101".into(),
            description: "Intro to rollups".into(),
            keywords: "a, b".into(),
            image_link: "QmImage".into(),
            content_link: "https://example.org/rollups".into(),
            video_link: None,
        }
    }

    #[test]
    fn test_metadata_for_catalog() {
        let meta = TokenMetadata::for_catalog(&catalog());
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["image"], "ipfs://QmImage");
        assert_eq!(json["external_url"], "https://example.org/rollups");
        assert_eq!(json["background_color"], "212529");
        assert!(json.get("youtube_url").is_none());
        assert_eq!(json["attributes"][0]["display_type"], "boost_number");
        assert_eq!(json["attributes"][0]["trait_type"], "informed");
        assert_eq!(json["attributes"][0]["value"], 5);
    }

    #[test]
    fn test_metadata_includes_video() {
        let mut with_video = catalog();
        with_video.video_link = Some("https://youtu.be/x".into());
        let meta = TokenMetadata::for_catalog(&with_video);
        assert_eq!(meta.youtube_url.as_deref(), Some("https://youtu.be/x"));
    }

    #[test]
    fn test_claim_json_shape() {
        let claim = Claim {
            catalog_id: "c".into(),
            wallet_address: "0xabc".into(),
            mailio_address: None,
            signature: "0x00".into(),
            gas_price: 30,
            tx_hash: Some("0xdead".into()),
            token_uri: None,
            created: 1,
        };
        let json = serde_json::to_value(&claim).unwrap();
        assert_eq!(json["walletAddress"], "0xabc");
        assert_eq!(json["txHash"], "0xdead");
        assert!(json.get("tokenUri").is_none());
        assert!(json.get("keywords").is_none());
    }

    #[test]
    fn test_preview_flattens_claim() {
        let preview = ClaimPreview {
            claim: Claim {
                catalog_id: "c".into(),
                wallet_address: "w".into(),
                mailio_address: None,
                signature: "s".into(),
                gas_price: 0,
                tx_hash: None,
                token_uri: None,
                created: 0,
            },
            token_id: Some(7),
            tx_status: 1,
        };
        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["catalogId"], "c");
        assert_eq!(json["tokenId"], 7);
        assert_eq!(json["txStatus"], 1);
    }

    #[test]
    fn test_fingerprint_key() {
        let fp = ClaimFingerprint {
            catalog_id: "cat".into(),
            visitor_id: "visitor".into(),
        };
        assert_eq!(fp.key(), "cat_visitor");
    }
}
