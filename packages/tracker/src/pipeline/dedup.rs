//! Dedup gate - classify scraped listings against the record store.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{Result, TrackerError};
use crate::traits::store::RecordStore;
use crate::types::{
    listing::RawListing,
    record::{JobRecord, JobState},
};

/// How the gate routed a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Analyze this run: NEW, FAILED (retry), or stale model tag.
    Analyze,

    /// Already processed under the current model tag.
    AlreadyDone,

    /// SKIPPED: permanently ignored until an explicit external reset.
    Ignore,
}

/// Classify a stored record against the currently configured model tag.
pub fn classify_record(record: &JobRecord, current_model_tag: &str) -> Disposition {
    match record.state {
        JobState::New | JobState::Failed => Disposition::Analyze,
        JobState::Analyzed | JobState::Exported => {
            if record.analysis_model.as_deref() == Some(current_model_tag) {
                Disposition::AlreadyDone
            } else {
                Disposition::Analyze
            }
        }
        JobState::Skipped => Disposition::Ignore,
    }
}

/// A listing paired with its stored record, ready for analysis.
#[derive(Debug, Clone)]
pub struct TrackedListing {
    pub record: JobRecord,
    pub listing: RawListing,
}

/// Result of partitioning one scrape batch.
#[derive(Debug, Clone, Default)]
pub struct PartitionOutcome {
    /// Listings to analyze this run, in batch order.
    pub to_analyze: Vec<TrackedListing>,

    /// Records already processed under the current model tag, in batch order.
    pub already_done: Vec<JobRecord>,

    /// Listings dropped for lacking a resolvable identifier.
    pub malformed_count: usize,
}

/// Partition a scrape batch into new work and already-done records.
///
/// Every resolvable listing is upserted as seen (creating NEW records on
/// first sighting, refreshing `last_seen_at` otherwise) and then classified.
/// Listings with no resolvable identifier are dropped and never persisted.
/// Output order preserves batch order.
pub async fn partition<S: RecordStore + ?Sized>(
    store: &S,
    batch: &[RawListing],
    current_model_tag: &str,
    seen_at: DateTime<Utc>,
    payload_ref: Option<&str>,
) -> Result<PartitionOutcome> {
    let mut outcome = PartitionOutcome::default();

    for listing in batch {
        let job_id = match listing.job_id() {
            Ok(id) => id,
            Err(TrackerError::MalformedListing { reason }) => {
                warn!(%reason, "dropping malformed listing");
                outcome.malformed_count += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let record = store
            .upsert_seen(&job_id, seen_at, payload_ref, listing)
            .await?;

        match classify_record(&record, current_model_tag) {
            Disposition::Analyze => outcome.to_analyze.push(TrackedListing {
                record,
                listing: listing.clone(),
            }),
            Disposition::AlreadyDone => outcome.already_done.push(record),
            Disposition::Ignore => {
                debug!(%job_id, "ignoring skipped job");
            }
        }
    }

    Ok(outcome)
}
