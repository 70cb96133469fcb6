//! Run-level result and bookkeeping types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage a run is in, for logging and failure attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Scraping,
    Deduping,
    Analyzing,
    Exporting,
    Done,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStage::Scraping => "scraping",
            RunStage::Deduping => "deduping",
            RunStage::Analyzing => "analyzing",
            RunStage::Exporting => "exporting",
            RunStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Counts and failures from one end-to-end run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique id of this run.
    pub run_id: String,

    /// Listings returned by the scraper.
    pub scraped_count: usize,

    /// Listings the dedup gate routed to analysis.
    pub new_count: usize,

    /// Listings already processed under the current model tag.
    pub already_done_count: usize,

    /// Listings dropped for lacking a stable identifier.
    pub malformed_count: usize,

    /// Jobs successfully analyzed this run.
    pub analyzed_count: usize,

    /// Jobs confirmed exported this run.
    pub exported_count: usize,

    /// Jobs marked FAILED this run.
    pub failed_job_ids: Vec<String>,
}

impl RunSummary {
    /// Start an empty summary for a run id.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }
}

/// Persisted history row for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub scraped_count: usize,
    pub new_count: usize,
    pub analyzed_count: usize,
    pub exported_count: usize,
    pub failed_count: usize,
}

impl RunRecord {
    /// Build a history row from a finished run's summary.
    pub fn from_summary(summary: &RunSummary, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: summary.run_id.clone(),
            started_at,
            scraped_count: summary.scraped_count,
            new_count: summary.new_count,
            analyzed_count: summary.analyzed_count,
            exported_count: summary.exported_count,
            failed_count: summary.failed_job_ids.len(),
        }
    }
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_jobs: usize,
    pub new: usize,
    pub analyzed: usize,
    pub exported: usize,
    pub skipped: usize,
    pub failed: usize,

    /// Jobs first seen at or after the requested cutoff.
    pub seen_since: usize,

    /// Runs recorded at or after the requested cutoff.
    pub runs_since: usize,
}
