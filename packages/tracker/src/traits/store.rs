//! Record store trait: the durable table of job lifecycle state.
//!
//! Backends must enforce the forward-only transition rules identically
//! (the rules themselves live on [`JobState`] and [`JobRecord`]), keep every
//! mutation atomic with respect to a single `job_id`, and persist durably
//! before returning. Concurrent calls for different ids must not block each
//! other; concurrent calls for the same id serialize, with the loser of an
//! illegal interleaving failing `InvalidTransition`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{
    analysis::AnalysisResult,
    listing::RawListing,
    record::{JobRecord, JobState},
    run::{RunRecord, StoreStats},
};

/// Filter for [`RecordStore::query`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Only records in this state.
    pub state: Option<JobState>,

    /// Only records with a score at or above this value.
    pub min_score: Option<f64>,

    /// Only records analyzed under this model tag.
    pub model_tag: Option<String>,
}

impl RecordFilter {
    /// Empty filter (matches all records).
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter to a single state.
    pub fn for_state(state: JobState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    /// Set the minimum score.
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Set the model tag.
    pub fn with_model_tag(mut self, model_tag: impl Into<String>) -> Self {
        self.model_tag = Some(model_tag.into());
        self
    }

    /// Whether a record passes this filter.
    pub fn matches(&self, record: &JobRecord) -> bool {
        if let Some(state) = self.state {
            if record.state != state {
                return false;
            }
        }
        if let Some(min) = self.min_score {
            match record.score {
                Some(score) if score >= min => {}
                _ => return false,
            }
        }
        if let Some(tag) = self.model_tag.as_deref() {
            if record.analysis_model.as_deref() != Some(tag) {
                return false;
            }
        }
        true
    }
}

/// Durable store of job records, keyed by stable job id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Record a sighting of `job_id`.
    ///
    /// Creates a NEW record when absent (with `first_seen_at = last_seen_at
    /// = seen_at`); otherwise refreshes `last_seen_at` and the payload ref,
    /// leaving the lifecycle state untouched. Returns the stored record.
    async fn upsert_seen(
        &self,
        job_id: &str,
        seen_at: DateTime<Utc>,
        payload_ref: Option<&str>,
        listing: &RawListing,
    ) -> Result<JobRecord>;

    /// Fetch a record by id.
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>>;

    /// Commit an analysis: moves the record to ANALYZED and overwrites
    /// score, recommendation, and model tag.
    ///
    /// Fails `InvalidTransition` from SKIPPED, and from EXPORTED unless the
    /// model tag changed (the controlled re-analysis path).
    async fn set_analysis(&self, job_id: &str, analysis: &AnalysisResult) -> Result<JobRecord>;

    /// Move an ANALYZED record to EXPORTED. Any other source state fails
    /// `InvalidTransition`.
    async fn mark_exported(&self, job_id: &str) -> Result<JobRecord>;

    /// Move a NEW or ANALYZED record to FAILED, recording the reason.
    async fn mark_failed(&self, job_id: &str, reason: &str) -> Result<JobRecord>;

    /// Move a NEW or ANALYZED record to SKIPPED, recording the reason.
    /// Terminal until an explicit external reset.
    async fn mark_skipped(&self, job_id: &str, reason: &str) -> Result<JobRecord>;

    /// Query records, ordered by `first_seen_at` ascending with ties broken
    /// by `job_id`.
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<JobRecord>>;

    /// Persist a run history row.
    async fn record_run(&self, run: &RunRecord) -> Result<()>;

    /// Most recent run history rows, newest first.
    async fn run_history(&self, limit: usize) -> Result<Vec<RunRecord>>;

    /// Aggregate counts; `since` bounds the "recent" figures.
    async fn stats(&self, since: DateTime<Utc>) -> Result<StoreStats>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for std::sync::Arc<T> {
    async fn upsert_seen(
        &self,
        job_id: &str,
        seen_at: DateTime<Utc>,
        payload_ref: Option<&str>,
        listing: &RawListing,
    ) -> Result<JobRecord> {
        (**self).upsert_seen(job_id, seen_at, payload_ref, listing).await
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        (**self).get(job_id).await
    }

    async fn set_analysis(&self, job_id: &str, analysis: &AnalysisResult) -> Result<JobRecord> {
        (**self).set_analysis(job_id, analysis).await
    }

    async fn mark_exported(&self, job_id: &str) -> Result<JobRecord> {
        (**self).mark_exported(job_id).await
    }

    async fn mark_failed(&self, job_id: &str, reason: &str) -> Result<JobRecord> {
        (**self).mark_failed(job_id, reason).await
    }

    async fn mark_skipped(&self, job_id: &str, reason: &str) -> Result<JobRecord> {
        (**self).mark_skipped(job_id, reason).await
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<JobRecord>> {
        (**self).query(filter).await
    }

    async fn record_run(&self, run: &RunRecord) -> Result<()> {
        (**self).record_run(run).await
    }

    async fn run_history(&self, limit: usize) -> Result<Vec<RunRecord>> {
        (**self).run_history(limit).await
    }

    async fn stats(&self, since: DateTime<Utc>) -> Result<StoreStats> {
        (**self).stats(since).await
    }
}
