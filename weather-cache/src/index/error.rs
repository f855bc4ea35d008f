//! Index store error types.

use super::types::ErrorResponse;

/// Errors that can occur when talking to the index engine.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Engine unreachable or request failed in flight
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// Engine answered with an error status
    #[error("[{status}] {message}")]
    Status { status: u16, message: String },

    /// Engine response did not match the expected shape
    #[error("JSON parse error: {message}")]
    Decode { message: String },

    /// A document could not be serialized
    #[error("unable to encode document {id}: {message}")]
    Encode { id: String, message: String },

    /// Bulk session ran past its deadline
    #[error("bulk session on {index} timed out after {secs}s")]
    Timeout { index: String, secs: u64 },

    /// Bulk session workers are gone
    #[error("bulk session on {index} is closed")]
    SessionClosed { index: String },

    /// Some documents in a bulk session were rejected
    #[error("indexed [{written}] documents into {index} with [{failed}] errors")]
    PartialBulkFailure {
        index: String,
        written: u64,
        failed: u64,
    },
}

impl IndexError {
    /// Build a status error from a non-2xx response body.
    ///
    /// Uses the engine's `error.type` and `error.reason` when the body
    /// carries them, otherwise the raw body.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(e) => format!("{}: {}", e.error.kind, e.error.reason),
            Err(_) => body.chars().take(500).collect(),
        };
        IndexError::Status { status, message }
    }
}
