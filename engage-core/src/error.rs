use thiserror::Error;

/// Errors surfaced by the claim workflow.
///
/// Every collaborator failure is folded into one of these kinds at the
/// orchestrator boundary so callers can map them without inspecting strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid signature: {0}")]
    Signature(String),

    #[error("Keywords do not match")]
    Keyword,

    #[error("Claim already exists: wallet={wallet}, catalog={catalog_id}")]
    Exists { wallet: String, catalog_id: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClaimError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn signature(message: impl Into<String>) -> Self {
        Self::Signature(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Signature(_) => "INVALID_SIGNATURE",
            Self::Keyword => "KEYWORD_MISMATCH",
            Self::Exists { .. } => "ALREADY_CLAIMED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClaimError>;
