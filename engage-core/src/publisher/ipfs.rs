//! IPFS HTTP API publisher (`/api/v0/add`).
//!
//! Each upload is a single POST. The only retry is opt-in
//! (`IpfsConfig::connect_retries`) and covers failures where the request
//! never reached the node.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use super::{parse_upload_response, MetadataPublisher, PublishError, UploadedObject};
use crate::config::IpfsConfig;

/// Publishes documents through an IPFS node or pinning service.
pub struct IpfsPublisher {
    client: Client,
    config: IpfsConfig,
}

impl IpfsPublisher {
    pub fn new(config: IpfsConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PublishError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn add_url(&self) -> String {
        format!("{}/api/v0/add", self.config.api_endpoint.trim_end_matches('/'))
    }

    fn connect_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(200),
            max_interval: Duration::from_secs(2),
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    async fn upload_once(&self, name: &str, bytes: &[u8]) -> Result<Vec<UploadedObject>, PublishError> {
        let start = Instant::now();

        let part = Part::bytes(bytes.to_vec()).file_name(name.to_string());
        let mut request = self
            .client
            .post(self.add_url())
            .multipart(Form::new().part("file", part));

        if let Some(key) = &self.config.project_key {
            let secret = self.config.project_secret.as_ref().map(|s| s.as_str());
            request = request.basic_auth(key, secret);
        }

        let response = request.send().await.map_err(|e| {
            if is_connect_error(&e) {
                PublishError::Connect(e.to_string())
            } else {
                PublishError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        debug!(status = %status, "Received IPFS response");

        if status != StatusCode::OK {
            return Err(PublishError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PublishError::Response(e.to_string()))?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            "Upload completed"
        );

        parse_upload_response(&body)
    }
}

#[async_trait]
impl MetadataPublisher for IpfsPublisher {
    #[instrument(skip_all, fields(name = %name, bytes = bytes.len()))]
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<Vec<UploadedObject>, PublishError> {
        let retries = self.config.connect_retries;
        if retries == 0 {
            return self.upload_once(name, &bytes).await;
        }

        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let bytes = bytes.as_slice();
        retry_notify(
            self.connect_backoff(),
            || async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                match self.upload_once(name, bytes).await {
                    Err(err @ PublishError::Connect(_)) if attempt < retries => {
                        Err(backoff::Error::transient(err))
                    }
                    other => other.map_err(backoff::Error::permanent),
                }
            },
            |err: PublishError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Publisher unreachable, retrying"
                );
            },
        )
        .await
    }
}

/// Failures where the request was never delivered.
pub fn is_connect_error(error: &reqwest::Error) -> bool {
    error.is_connect()
}
