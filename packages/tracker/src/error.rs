//! Typed errors for the tracker library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! The taxonomy separates three severities:
//! - drop-and-continue: [`TrackerError::MalformedListing`]
//! - per-job, batch continues: [`TrackerError::AnalysisMalformed`],
//!   [`TrackerError::ExportRejected`]
//! - run-fatal: [`TrackerError::ScrapeUnavailable`],
//!   [`TrackerError::AnalysisUnavailable`], [`TrackerError::ExportUnavailable`],
//!   [`TrackerError::InvalidTransition`]

use thiserror::Error;

use crate::types::record::JobState;

/// Errors that can occur during tracking and pipeline operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Listing carries no resolvable stable identifier. Dropped, never persisted.
    #[error("malformed listing: {reason}")]
    MalformedListing { reason: String },

    /// A state transition violated the forward-only lifecycle.
    ///
    /// This indicates a programming or interleaving bug. It must not occur
    /// under correct per-job serialization and is treated as run-fatal.
    #[error("invalid transition for job {job_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        job_id: String,
        from: JobState,
        to: JobState,
    },

    /// No record exists for the given job id.
    #[error("job not found: {job_id}")]
    RecordNotFound { job_id: String },

    /// Scraper collaborator unreachable after retries. Run-fatal.
    #[error("scraper unavailable: {0}")]
    ScrapeUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Analyzer collaborator hit a quota/auth/transport failure that will
    /// recur for every remaining job. Run-fatal.
    #[error("analyzer unavailable: {0}")]
    AnalysisUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Analyzer produced a response we could not parse. Per-job recoverable:
    /// the job is marked FAILED and the batch continues.
    #[error("malformed analysis response: {reason}")]
    AnalysisMalformed { reason: String },

    /// Exporter collaborator unreachable. Run-fatal; unexported jobs stay
    /// ANALYZED and are retried on the next run.
    #[error("exporter unavailable: {0}")]
    ExportUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Exporter rejected a specific row. Per-job recoverable.
    #[error("export rejected for job {job_id}: {reason}")]
    ExportRejected { job_id: String, reason: String },

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Payload archive operation failed.
    #[error("archive error: {0}")]
    Archive(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl TrackerError {
    /// Shorthand for a [`TrackerError::Config`] from a plain message.
    pub fn config(msg: impl Into<String>) -> Self {
        TrackerError::Config(msg.into().into())
    }

    /// Shorthand for a [`TrackerError::Storage`] from a plain message.
    pub fn storage(msg: impl Into<String>) -> Self {
        TrackerError::Storage(msg.into().into())
    }

    /// Whether this error aborts the run rather than a single job.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            TrackerError::ScrapeUnavailable(_)
                | TrackerError::AnalysisUnavailable(_)
                | TrackerError::ExportUnavailable(_)
                | TrackerError::InvalidTransition { .. }
                | TrackerError::Storage(_)
                | TrackerError::Archive(_)
                | TrackerError::Cancelled
                | TrackerError::Config(_)
        )
    }
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
