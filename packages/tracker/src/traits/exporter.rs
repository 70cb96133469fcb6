//! Exporter collaborator trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::record::JobRecord;

/// One spreadsheet row for an analyzed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRow {
    pub exported_at: DateTime<Utc>,
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub match_score: f64,
    pub recommendation: String,
    pub model_tag: String,
}

impl ExportRow {
    /// Build a row from an ANALYZED record.
    ///
    /// Missing analysis fields default to zero/REVIEW rather than failing;
    /// the caller only feeds records that passed the threshold filter.
    pub fn from_record(record: &JobRecord, exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at,
            job_id: record.job_id.clone(),
            title: record.title.clone(),
            company: record.company.clone(),
            location: record.location.clone(),
            url: record.url.clone(),
            match_score: record.score.unwrap_or(0.0),
            recommendation: record
                .recommendation
                .map(|r| r.as_str().to_string())
                .unwrap_or_else(|| "REVIEW".to_string()),
            model_tag: record.analysis_model.clone().unwrap_or_default(),
        }
    }
}

/// Result of an append operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Rows actually written.
    pub appended: usize,

    /// Rows skipped because their job id was already present.
    pub skipped: usize,
}

/// Appends rows to a spreadsheet-like destination.
///
/// Must be idempotent keyed by `job_id`: re-appending a row whose id is
/// already present is a no-op, so retries after partial failures never
/// produce duplicates. Transport failures surface as `ExportUnavailable`.
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn append_if_absent(&self, rows: &[ExportRow]) -> Result<ExportOutcome>;
}

#[async_trait]
impl<T: Exporter + ?Sized> Exporter for Box<T> {
    async fn append_if_absent(&self, rows: &[ExportRow]) -> Result<ExportOutcome> {
        (**self).append_if_absent(rows).await
    }
}

#[async_trait]
impl<T: Exporter + ?Sized> Exporter for std::sync::Arc<T> {
    async fn append_if_absent(&self, rows: &[ExportRow]) -> Result<ExportOutcome> {
        (**self).append_if_absent(rows).await
    }
}
