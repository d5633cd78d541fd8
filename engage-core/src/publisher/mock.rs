//! Mock publisher for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{MetadataPublisher, PublishError, UploadedObject};
use crate::hash::keccak256;

/// Behaviour of the next uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockUploadMode {
    /// Return one object whose hash is derived from the content.
    Succeed,
    /// Return an empty object list.
    Empty,
    /// Fail every upload.
    Fail,
}

/// In-process publisher that records uploads.
/// WARNING: content is not stored anywhere.
pub struct MockPublisher {
    mode: MockUploadMode,
    calls: AtomicUsize,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new(MockUploadMode::Succeed)
    }
}

impl MockPublisher {
    pub fn new(mode: MockUploadMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::new(MockUploadMode::Fail)
    }

    pub fn empty() -> Self {
        Self::new(MockUploadMode::Empty)
    }

    /// Number of upload calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Names and contents of successful uploads.
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    /// Deterministic fake content identifier.
    pub fn content_id(bytes: &[u8]) -> String {
        format!("Qm{}", hex::encode(&keccak256(bytes)[..16]))
    }
}

#[async_trait]
impl MetadataPublisher for MockPublisher {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<Vec<UploadedObject>, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.mode {
            MockUploadMode::Fail => Err(PublishError::Status(503)),
            MockUploadMode::Empty => Ok(Vec::new()),
            MockUploadMode::Succeed => {
                let object = UploadedObject {
                    name: name.to_string(),
                    hash: Self::content_id(&bytes),
                    size: bytes.len().to_string(),
                };
                if let Ok(mut uploads) = self.uploads.lock() {
                    uploads.push((name.to_string(), bytes));
                }
                Ok(vec![object])
            }
        }
    }
}
