//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, TrackerError};
use crate::traits::store::{RecordFilter, RecordStore};
use crate::types::{
    analysis::AnalysisResult,
    listing::RawListing,
    record::{JobRecord, JobState},
    run::{RunRecord, StoreStats},
};

/// In-memory record store.
///
/// Useful for testing and development. Not suitable for production as data
/// is lost on restart; durability requirements are satisfied trivially.
/// Transition validation happens under the write lock, so per-id atomicity
/// holds.
pub struct MemoryStore {
    records: RwLock<HashMap<String, JobRecord>>,
    runs: RwLock<Vec<RunRecord>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            runs: RwLock::new(Vec::new()),
        }
    }

    /// Get the number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.records.write().unwrap().clear();
        self.runs.write().unwrap().clear();
    }

    fn update_record<F>(&self, job_id: &str, apply: F) -> Result<JobRecord>
    where
        F: FnOnce(&mut JobRecord) -> Result<()>,
    {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(job_id)
            .ok_or_else(|| TrackerError::RecordNotFound {
                job_id: job_id.to_string(),
            })?;
        apply(record)?;
        Ok(record.clone())
    }

    fn transition(&self, job_id: &str, to: JobState, reason: Option<&str>) -> Result<JobRecord> {
        self.update_record(job_id, |record| {
            if !record.state.can_transition(to) {
                return Err(TrackerError::InvalidTransition {
                    job_id: record.job_id.clone(),
                    from: record.state,
                    to,
                });
            }
            record.state = to;
            record.status_reason = reason.map(str::to_owned);
            Ok(())
        })
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert_seen(
        &self,
        job_id: &str,
        seen_at: DateTime<Utc>,
        payload_ref: Option<&str>,
        listing: &RawListing,
    ) -> Result<JobRecord> {
        let mut records = self.records.write().unwrap();
        let record = records
            .entry(job_id.to_string())
            .and_modify(|existing| {
                existing.last_seen_at = seen_at.max(existing.last_seen_at);
                if payload_ref.is_some() {
                    existing.raw_payload_ref = payload_ref.map(str::to_owned);
                }
            })
            .or_insert_with(|| JobRecord::first_seen(job_id, listing, seen_at, payload_ref));
        Ok(record.clone())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        Ok(self.records.read().unwrap().get(job_id).cloned())
    }

    async fn set_analysis(&self, job_id: &str, analysis: &AnalysisResult) -> Result<JobRecord> {
        self.update_record(job_id, |record| {
            if !record.allows_analysis(&analysis.model_tag) {
                return Err(TrackerError::InvalidTransition {
                    job_id: record.job_id.clone(),
                    from: record.state,
                    to: JobState::Analyzed,
                });
            }
            record.state = JobState::Analyzed;
            record.score = Some(analysis.score);
            record.recommendation = Some(analysis.recommendation);
            record.analysis_model = Some(analysis.model_tag.clone());
            record.status_reason = None;
            Ok(())
        })
    }

    async fn mark_exported(&self, job_id: &str) -> Result<JobRecord> {
        self.transition(job_id, JobState::Exported, None)
    }

    async fn mark_failed(&self, job_id: &str, reason: &str) -> Result<JobRecord> {
        self.transition(job_id, JobState::Failed, Some(reason))
    }

    async fn mark_skipped(&self, job_id: &str, reason: &str) -> Result<JobRecord> {
        self.transition(job_id, JobState::Skipped, Some(reason))
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<JobRecord>> {
        let records = self.records.read().unwrap();
        let mut matching: Vec<JobRecord> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.first_seen_at
                .cmp(&b.first_seen_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        Ok(matching)
    }

    async fn record_run(&self, run: &RunRecord) -> Result<()> {
        self.runs.write().unwrap().push(run.clone());
        Ok(())
    }

    async fn run_history(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let runs = self.runs.read().unwrap();
        let mut history: Vec<RunRecord> = runs.clone();
        history.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        history.truncate(limit);
        Ok(history)
    }

    async fn stats(&self, since: DateTime<Utc>) -> Result<StoreStats> {
        let records = self.records.read().unwrap();
        let mut stats = StoreStats {
            total_jobs: records.len(),
            ..Default::default()
        };
        for record in records.values() {
            match record.state {
                JobState::New => stats.new += 1,
                JobState::Analyzed => stats.analyzed += 1,
                JobState::Exported => stats.exported += 1,
                JobState::Skipped => stats.skipped += 1,
                JobState::Failed => stats.failed += 1,
            }
            if record.first_seen_at >= since {
                stats.seen_since += 1;
            }
        }
        stats.runs_since = self
            .runs
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.started_at >= since)
            .count();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::Recommendation;

    fn listing(id: &str) -> RawListing {
        RawListing::new(format!("Role {id}"), format!("https://jobs.example/view/{id}"))
            .with_source_id(id)
            .with_company("Acme")
            .with_location("Berlin")
    }

    fn analysis(score: f64, model: &str) -> AnalysisResult {
        AnalysisResult::new(score, Recommendation::Pursue, model)
    }

    #[tokio::test]
    async fn test_upsert_creates_then_refreshes() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::hours(24);

        let created = store
            .upsert_seen("A", t0, Some("batch-0.json"), &listing("A"))
            .await
            .unwrap();
        assert_eq!(created.state, JobState::New);
        assert_eq!(created.first_seen_at, t0);
        assert_eq!(created.last_seen_at, t0);

        let refreshed = store
            .upsert_seen("A", t1, Some("batch-1.json"), &listing("A"))
            .await
            .unwrap();
        assert_eq!(refreshed.state, JobState::New);
        assert_eq!(refreshed.first_seen_at, t0);
        assert_eq!(refreshed.last_seen_at, t1);
        assert_eq!(refreshed.raw_payload_ref.as_deref(), Some("batch-1.json"));
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn test_export_requires_analyzed() {
        let store = MemoryStore::new();
        store
            .upsert_seen("A", Utc::now(), None, &listing("A"))
            .await
            .unwrap();

        let err = store.mark_exported("A").await.unwrap_err();
        assert!(matches!(err, TrackerError::InvalidTransition { .. }));

        store.set_analysis("A", &analysis(8.0, "m1")).await.unwrap();
        let exported = store.mark_exported("A").await.unwrap();
        assert_eq!(exported.state, JobState::Exported);
    }

    #[tokio::test]
    async fn test_reanalysis_of_exported_needs_model_change() {
        let store = MemoryStore::new();
        store
            .upsert_seen("A", Utc::now(), None, &listing("A"))
            .await
            .unwrap();
        store.set_analysis("A", &analysis(8.0, "m1")).await.unwrap();
        store.mark_exported("A").await.unwrap();

        // Same model tag: refused.
        let err = store.set_analysis("A", &analysis(9.0, "m1")).await.unwrap_err();
        assert!(matches!(err, TrackerError::InvalidTransition { .. }));

        // New model tag: controlled re-processing.
        let record = store.set_analysis("A", &analysis(6.0, "m2")).await.unwrap();
        assert_eq!(record.state, JobState::Analyzed);
        assert_eq!(record.analysis_model.as_deref(), Some("m2"));
        assert_eq!(record.score, Some(6.0));
    }

    #[tokio::test]
    async fn test_skipped_is_terminal() {
        let store = MemoryStore::new();
        store
            .upsert_seen("A", Utc::now(), None, &listing("A"))
            .await
            .unwrap();
        store.mark_skipped("A", "not relevant").await.unwrap();

        assert!(store.set_analysis("A", &analysis(9.0, "m1")).await.is_err());
        assert!(store.mark_failed("A", "nope").await.is_err());
    }

    #[tokio::test]
    async fn test_retry_can_fail_again() {
        let store = MemoryStore::new();
        store
            .upsert_seen("A", Utc::now(), None, &listing("A"))
            .await
            .unwrap();
        store.mark_failed("A", "first failure").await.unwrap();

        let record = store.mark_failed("A", "second failure").await.unwrap();
        assert_eq!(record.state, JobState::Failed);
        assert_eq!(record.status_reason.as_deref(), Some("second failure"));
    }

    #[tokio::test]
    async fn test_failed_can_be_reanalyzed() {
        let store = MemoryStore::new();
        store
            .upsert_seen("A", Utc::now(), None, &listing("A"))
            .await
            .unwrap();
        store.mark_failed("A", "analyzer hiccup").await.unwrap();

        let record = store.set_analysis("A", &analysis(7.5, "m1")).await.unwrap();
        assert_eq!(record.state, JobState::Analyzed);
        assert!(record.status_reason.is_none());
    }

    #[tokio::test]
    async fn test_query_orders_by_first_seen_then_id() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::minutes(5);

        store.upsert_seen("B", t0, None, &listing("B")).await.unwrap();
        store.upsert_seen("A", t0, None, &listing("A")).await.unwrap();
        store.upsert_seen("C", t1, None, &listing("C")).await.unwrap();

        let all = store.query(&RecordFilter::new()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_query_filters_by_state_score_model() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for id in ["A", "B", "C"] {
            store.upsert_seen(id, now, None, &listing(id)).await.unwrap();
        }
        store.set_analysis("A", &analysis(8.0, "m1")).await.unwrap();
        store.set_analysis("B", &analysis(5.0, "m1")).await.unwrap();

        let filter = RecordFilter::for_state(JobState::Analyzed)
            .with_min_score(7.0)
            .with_model_tag("m1");
        let hits = store.query(&filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].job_id, "A");
    }

    #[tokio::test]
    async fn test_missing_record() {
        let store = MemoryStore::new();
        assert!(store.get("ghost").await.unwrap().is_none());
        assert!(matches!(
            store.mark_exported("ghost").await.unwrap_err(),
            TrackerError::RecordNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for id in ["A", "B", "C"] {
            store.upsert_seen(id, now, None, &listing(id)).await.unwrap();
        }
        store.set_analysis("A", &analysis(8.0, "m1")).await.unwrap();
        store.mark_skipped("B", "meh").await.unwrap();

        let stats = store.stats(now - chrono::Duration::days(7)).await.unwrap();
        assert_eq!(stats.total_jobs, 3);
        assert_eq!(stats.new, 1);
        assert_eq!(stats.analyzed, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.seen_since, 3);
    }
}
