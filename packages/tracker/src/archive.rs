//! Raw payload archive.
//!
//! Every scrape batch is written to disk before processing so any record's
//! `raw_payload_ref` can be replayed or audited later. One JSON file per
//! run; files are never rewritten.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::types::listing::RawListing;

/// One archived scrape batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedBatch {
    pub run_id: String,
    pub listings: Vec<RawListing>,
}

/// File-based payload archive.
#[derive(Debug, Clone)]
pub struct PayloadArchive {
    dir: PathBuf,
}

impl PayloadArchive {
    /// Archive rooted at the given directory (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write a scrape batch; returns the path used as `raw_payload_ref`.
    pub fn archive_batch(&self, run_id: &str, listings: &[RawListing]) -> Result<String> {
        fs::create_dir_all(&self.dir).map_err(|e| TrackerError::Archive(e.into()))?;

        let path = self.dir.join(format!("scrape_{run_id}.json"));
        let batch = ArchivedBatch {
            run_id: run_id.to_string(),
            listings: listings.to_vec(),
        };
        let data = serde_json::to_vec_pretty(&batch)?;
        fs::write(&path, data).map_err(|e| TrackerError::Archive(e.into()))?;

        Ok(path.to_string_lossy().into_owned())
    }

    /// Load an archived batch back from a `raw_payload_ref`.
    pub fn load(&self, payload_ref: &str) -> Result<ArchivedBatch> {
        let data = fs::read(payload_ref).map_err(|e| TrackerError::Archive(e.into()))?;
        Ok(serde_json::from_slice(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = PayloadArchive::new(dir.path());

        let listings = vec![
            RawListing::new("PM", "https://jobs.example/view/1").with_source_id("1"),
            RawListing::new("CoS", "https://jobs.example/view/2").with_source_id("2"),
        ];
        let payload_ref = archive.archive_batch("run_1", &listings).unwrap();
        assert!(payload_ref.contains("scrape_run_1.json"));

        let batch = archive.load(&payload_ref).unwrap();
        assert_eq!(batch.run_id, "run_1");
        assert_eq!(batch.listings.len(), 2);
        assert_eq!(batch.listings[0].source_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_load_missing_ref_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = PayloadArchive::new(dir.path());
        assert!(matches!(
            archive.load("/nonexistent/scrape.json").unwrap_err(),
            TrackerError::Archive(_)
        ));
    }
}
