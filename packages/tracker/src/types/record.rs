//! Job lifecycle records.
//!
//! A [`JobRecord`] exists once per unique posting and only moves forward:
//! NEW -> ANALYZED -> EXPORTED, with SKIPPED and FAILED as terminal side
//! exits. Records are never physically deleted; stale postings simply stop
//! being re-seen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::listing::RawListing;

/// Lifecycle state of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    New,
    Analyzed,
    Exported,
    Skipped,
    Failed,
}

impl JobState {
    /// Stable lowercase name, used for storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::New => "new",
            JobState::Analyzed => "analyzed",
            JobState::Exported => "exported",
            JobState::Skipped => "skipped",
            JobState::Failed => "failed",
        }
    }

    /// Parse a stored state name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(JobState::New),
            "analyzed" => Some(JobState::Analyzed),
            "exported" => Some(JobState::Exported),
            "skipped" => Some(JobState::Skipped),
            "failed" => Some(JobState::Failed),
            _ => None,
        }
    }

    /// Whether the state admits no further transitions at all.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Skipped)
    }

    /// Forward-only transition rules.
    ///
    /// ANALYZED -> ANALYZED covers re-analysis overwrites; FAILED -> ANALYZED
    /// and FAILED -> FAILED cover the retry path (a retry may fail again).
    /// EXPORTED -> ANALYZED is legal only through the model-change
    /// re-analysis rule, which [`JobRecord::allows_analysis`] layers on top
    /// of this table.
    pub fn can_transition(self, to: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, to),
            (New, Analyzed)
                | (Analyzed, Analyzed)
                | (Failed, Analyzed)
                | (Exported, Analyzed)
                | (Analyzed, Exported)
                | (New, Failed)
                | (Analyzed, Failed)
                | (Failed, Failed)
                | (New, Skipped)
                | (Analyzed, Skipped)
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical outcome of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Pursue,
    Consider,
    Avoid,
    Review,
}

impl Recommendation {
    /// Uppercase code as exported to the spreadsheet.
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Pursue => "PURSUE",
            Recommendation::Consider => "CONSIDER",
            Recommendation::Avoid => "AVOID",
            Recommendation::Review => "REVIEW",
        }
    }

    /// Parse a stored recommendation code.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PURSUE" => Some(Recommendation::Pursue),
            "CONSIDER" => Some(Recommendation::Consider),
            "AVOID" => Some(Recommendation::Avoid),
            "REVIEW" => Some(Recommendation::Review),
            _ => None,
        }
    }

    /// Extract a recommendation code from free-form LLM text.
    ///
    /// Prefers a leading code, then any occurrence, then falls back to
    /// REVIEW for a human to triage.
    pub fn from_text(text: &str) -> Self {
        let upper = text.to_uppercase();
        for code in [
            Recommendation::Pursue,
            Recommendation::Consider,
            Recommendation::Avoid,
        ] {
            if upper.trim_start().starts_with(code.as_str()) {
                return code;
            }
        }
        for code in [
            Recommendation::Pursue,
            Recommendation::Consider,
            Recommendation::Avoid,
        ] {
            if upper.contains(code.as_str()) {
                return code;
            }
        }
        Recommendation::Review
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked job posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Stable identifier from the source platform. Immutable once created.
    pub job_id: String,

    /// Denormalized listing fields for human-readable queries.
    pub title: String,
    pub company: String,
    pub location: String,

    /// Posting URL from the most recent sighting.
    pub url: String,

    /// Set once on first sighting, never updated.
    pub first_seen_at: DateTime<Utc>,

    /// Refreshed every time the job reappears in a scrape batch.
    pub last_seen_at: DateTime<Utc>,

    /// Lifecycle state.
    pub state: JobState,

    /// Match score from the most recent analysis (0-10).
    pub score: Option<f64>,

    /// Recommendation code from the most recent analysis.
    pub recommendation: Option<Recommendation>,

    /// Model tag that produced the current analysis. Differing from the
    /// configured tag makes the record eligible for re-analysis.
    pub analysis_model: Option<String>,

    /// Path of the archived scrape payload (for audit/replay).
    pub raw_payload_ref: Option<String>,

    /// Why the record was marked FAILED or SKIPPED.
    pub status_reason: Option<String>,
}

impl JobRecord {
    /// Create a fresh NEW record from a first sighting.
    pub fn first_seen(
        job_id: impl Into<String>,
        listing: &RawListing,
        seen_at: DateTime<Utc>,
        payload_ref: Option<&str>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            title: listing.title.clone(),
            company: listing.company.clone(),
            location: listing.location.clone(),
            url: listing.url.clone(),
            first_seen_at: seen_at,
            last_seen_at: seen_at,
            state: JobState::New,
            score: None,
            recommendation: None,
            analysis_model: None,
            raw_payload_ref: payload_ref.map(str::to_owned),
            status_reason: None,
        }
    }

    /// Whether `set_analysis` with `model_tag` is legal from the current state.
    ///
    /// NEW, ANALYZED, and FAILED records always accept analysis. An EXPORTED
    /// record accepts it only when the model tag changed (controlled
    /// re-processing); SKIPPED never does.
    pub fn allows_analysis(&self, model_tag: &str) -> bool {
        match self.state {
            JobState::New | JobState::Analyzed | JobState::Failed => true,
            JobState::Exported => self.analysis_model.as_deref() != Some(model_tag),
            JobState::Skipped => false,
        }
    }
}
