//! Exit codes following sysexits.h conventions.

use engage_core::ClaimError;

pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Invalid arguments. EX_USAGE.
pub const USAGE_ERROR: i32 = 64;

/// Claim rejected: bad signature, keyword mismatch or already claimed. EX_DATAERR.
pub const VERIFICATION_FAILED: i32 = 65;

/// Input file or record missing. EX_NOINPUT.
pub const INPUT_ERROR: i32 = 66;

/// Chain node, IPFS or database unavailable. EX_UNAVAILABLE.
pub const NETWORK_ERROR: i32 = 69;

/// Required configuration missing or invalid. EX_CONFIG.
pub const CONFIG_ERROR: i32 = 78;

/// Exit code with the message to print.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        let code = match err.downcast_ref::<ClaimError>() {
            Some(ClaimError::Signature(_) | ClaimError::Keyword | ClaimError::Exists { .. }) => {
                VERIFICATION_FAILED
            }
            Some(ClaimError::NotFound(_)) => INPUT_ERROR,
            Some(ClaimError::Internal(_)) => NETWORK_ERROR,
            None if message.contains("Failed to read") => INPUT_ERROR,
            None if message.contains("not configured") => CONFIG_ERROR,
            None if message.contains("Invalid argument") => USAGE_ERROR,
            None if message.contains("Verification failed") => VERIFICATION_FAILED,
            None if message.contains("database") || message.contains("RPC") => NETWORK_ERROR,
            None => GENERAL_ERROR,
        };

        Self {
            code,
            message: Some(message),
        }
    }
}
