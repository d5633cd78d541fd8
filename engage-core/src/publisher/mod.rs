//! Content-addressed publishing of token metadata.

#[cfg(feature = "network")]
mod ipfs;
mod mock;

#[cfg(feature = "network")]
pub use ipfs::IpfsPublisher;
pub use mock::{MockPublisher, MockUploadMode};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of an upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedObject {
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
    /// Content identifier.
    #[serde(rename = "Hash", alias = "hash")]
    pub hash: String,
    #[serde(rename = "Size", alias = "size", default)]
    pub size: String,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Publisher configuration error: {0}")]
    Config(String),

    #[error("Could not reach publisher: {0}")]
    Connect(String),

    #[error("Upload request failed: {0}")]
    Request(String),

    #[error("Upload rejected with status {0}")]
    Status(u16),

    #[error("Malformed upload response: {0}")]
    Response(String),
}

/// Uploads a document to content-addressed storage.
#[async_trait]
pub trait MetadataPublisher: Send + Sync {
    /// Upload `bytes` under `name`, returning the stored objects in response order.
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<Vec<UploadedObject>, PublishError>;
}

/// Parse a newline-delimited JSON upload response, skipping blank lines.
pub fn parse_upload_response(body: &str) -> Result<Vec<UploadedObject>, PublishError> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| PublishError::Response(e.to_string()))
        })
        .collect()
}
