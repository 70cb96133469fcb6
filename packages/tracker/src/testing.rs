//! Testing utilities including mock collaborators.
//!
//! These are useful for testing applications that use the tracker library
//! without making real scraper, LLM, or spreadsheet calls.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{Result, TrackerError};
use crate::traits::{
    analyzer::Analyzer,
    cv::CvSource,
    exporter::{ExportOutcome, ExportRow, Exporter},
    scraper::Scraper,
};
use crate::types::{
    analysis::AnalysisResult,
    config::SearchConfig,
    listing::RawListing,
    record::Recommendation,
};

/// Build a well-formed listing for tests.
pub fn sample_listing(id: &str) -> RawListing {
    RawListing::new(
        format!("Role {id}"),
        format!("https://www.linkedin.com/jobs/view/{id}"),
    )
    .with_source_id(id)
    .with_company("Acme")
    .with_location("Lisbon")
    .with_description(format!("Description for role {id}"))
}

/// A mock scraper returning a fixed batch.
///
/// Can be told to fail a number of times first, for retry/backoff tests.
#[derive(Default)]
pub struct MockScraper {
    listings: RwLock<Vec<RawListing>>,
    failures_remaining: AtomicUsize,
    calls: AtomicUsize,
}

impl MockScraper {
    /// Scraper returning the given batch on every call.
    pub fn new(listings: Vec<RawListing>) -> Self {
        Self {
            listings: RwLock::new(listings),
            ..Default::default()
        }
    }

    /// Fail with `ScrapeUnavailable` this many times before succeeding.
    pub fn with_failures(self, failures: usize) -> Self {
        self.failures_remaining.store(failures, Ordering::SeqCst);
        self
    }

    /// Replace the batch returned by subsequent calls.
    pub fn set_listings(&self, listings: Vec<RawListing>) {
        *self.listings.write().unwrap() = listings;
    }

    /// Number of scrape calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn scrape(&self, _config: &SearchConfig) -> Result<Vec<RawListing>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TrackerError::ScrapeUnavailable(
                "mock scraper transport failure".into(),
            ));
        }
        Ok(self.listings.read().unwrap().clone())
    }
}

/// A mock analyzer with deterministic, configurable scores.
#[derive(Default)]
pub struct MockAnalyzer {
    /// Fixed scores by job id; unknown ids get a hash-derived score.
    scores: RwLock<HashMap<String, f64>>,

    /// Job ids whose responses are malformed (per-job failure).
    malformed: RwLock<HashSet<String>>,

    /// When set, every call fails run-fatally.
    unavailable: AtomicBool,

    /// Job ids analyzed, in call order.
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockAnalyzer {
    /// Analyzer with hash-derived default scores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the score for a job id.
    pub fn with_score(self, job_id: impl Into<String>, score: f64) -> Self {
        self.scores.write().unwrap().insert(job_id.into(), score);
        self
    }

    /// Make a job id produce a malformed response.
    pub fn with_malformed(self, job_id: impl Into<String>) -> Self {
        self.malformed.write().unwrap().insert(job_id.into());
        self
    }

    /// Make every call fail with `AnalysisUnavailable`.
    pub fn unavailable(self) -> Self {
        self.unavailable.store(true, Ordering::SeqCst);
        self
    }

    /// Job ids analyzed so far.
    pub fn analyzed_ids(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Deterministic pseudo-score in [0, 10] derived from the job id.
    fn derived_score(job_id: &str) -> f64 {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(job_id.as_bytes());
        let hash = hasher.finalize();
        (hash[0] as f64) * 10.0 / 255.0
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(
        &self,
        listing: &RawListing,
        _cv_text: &str,
        model_tag: &str,
    ) -> Result<AnalysisResult> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TrackerError::AnalysisUnavailable(
                "mock analyzer quota exhausted".into(),
            ));
        }

        let job_id = listing.job_id().unwrap_or_default();
        self.calls.write().unwrap().push(job_id.clone());

        if self.malformed.read().unwrap().contains(&job_id) {
            return Err(TrackerError::AnalysisMalformed {
                reason: format!("mock malformed response for {job_id}"),
            });
        }

        let score = self
            .scores
            .read()
            .unwrap()
            .get(&job_id)
            .copied()
            .unwrap_or_else(|| Self::derived_score(&job_id));

        let recommendation = if score >= 7.5 {
            Recommendation::Pursue
        } else if score >= 5.0 {
            Recommendation::Consider
        } else {
            Recommendation::Avoid
        };

        Ok(AnalysisResult::new(score, recommendation, model_tag)
            .with_summary(format!("Mock analysis of {}", listing.title)))
    }
}

/// A mock exporter collecting rows in memory.
#[derive(Default)]
pub struct MockExporter {
    rows: RwLock<Vec<ExportRow>>,
    reject_ids: RwLock<HashSet<String>>,
    failures_remaining: AtomicUsize,
    unavailable: AtomicBool,
}

impl MockExporter {
    /// Exporter accepting everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject rows for this job id with a per-row error.
    pub fn with_rejected(self, job_id: impl Into<String>) -> Self {
        self.reject_ids.write().unwrap().insert(job_id.into());
        self
    }

    /// Fail with `ExportUnavailable` this many times before succeeding.
    pub fn with_failures(self, failures: usize) -> Self {
        self.failures_remaining.store(failures, Ordering::SeqCst);
        self
    }

    /// Make every call fail with `ExportUnavailable`.
    pub fn unavailable(self) -> Self {
        self.unavailable.store(true, Ordering::SeqCst);
        self
    }

    /// Rows appended so far.
    pub fn exported_rows(&self) -> Vec<ExportRow> {
        self.rows.read().unwrap().clone()
    }

    /// Job ids appended so far.
    pub fn exported_ids(&self) -> Vec<String> {
        self.rows
            .read()
            .unwrap()
            .iter()
            .map(|r| r.job_id.clone())
            .collect()
    }
}

#[async_trait]
impl Exporter for MockExporter {
    async fn append_if_absent(&self, rows: &[ExportRow]) -> Result<ExportOutcome> {
        if self.unavailable.load(Ordering::SeqCst)
            || self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(TrackerError::ExportUnavailable(
                "mock exporter transport failure".into(),
            ));
        }

        for row in rows {
            if self.reject_ids.read().unwrap().contains(&row.job_id) {
                return Err(TrackerError::ExportRejected {
                    job_id: row.job_id.clone(),
                    reason: "mock rejection".to_string(),
                });
            }
        }

        let mut stored = self.rows.write().unwrap();
        let existing: HashSet<String> = stored.iter().map(|r| r.job_id.clone()).collect();
        let mut outcome = ExportOutcome::default();
        for row in rows {
            if existing.contains(&row.job_id) {
                outcome.skipped += 1;
            } else {
                stored.push(row.clone());
                outcome.appended += 1;
            }
        }
        Ok(outcome)
    }
}

/// A CV source returning a fixed string.
pub struct StaticCv(pub String);

impl StaticCv {
    /// A small but non-empty CV.
    pub fn sample() -> Self {
        Self("Summary:\nSeasoned product leader.\n\nSkills:\nRoadmaps, SQL".to_string())
    }
}

#[async_trait]
impl CvSource for StaticCv {
    async fn load(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
