//! Typed errors for the Apify client.

use thiserror::Error;

/// Errors returned by the Apify API client.
#[derive(Debug, Error)]
pub enum ApifyError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the Apify API.
    #[error("Apify API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The actor run ended in a non-success terminal state.
    #[error("actor run ended with status {0}")]
    RunFailed(String),

    /// The run did not finish within the polling deadline.
    #[error("actor run {run_id} timed out after {waited_secs}s")]
    RunTimedOut { run_id: String, waited_secs: u64 },
}

/// Result type alias for Apify client operations.
pub type Result<T> = std::result::Result<T, ApifyError>;
