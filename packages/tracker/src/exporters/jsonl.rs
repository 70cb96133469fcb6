//! Append-only JSON Lines exporter.
//!
//! A local-file destination useful without spreadsheet credentials and as
//! the durable local copy of exported matches. Idempotence comes from
//! scanning the existing file for job ids before appending.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{Result, TrackerError};
use crate::traits::exporter::{ExportOutcome, ExportRow, Exporter};

/// Exporter writing one JSON object per line to a local file.
pub struct JsonlExporter {
    path: PathBuf,
}

impl JsonlExporter {
    /// Export to the given file (created on first append).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn existing_job_ids(&self) -> Result<HashSet<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(TrackerError::ExportUnavailable(e.into())),
        };

        // Unreadable lines are ignored rather than blocking the export.
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str::<ExportRow>(line).ok())
            .map(|row| row.job_id)
            .collect())
    }
}

#[async_trait]
impl Exporter for JsonlExporter {
    async fn append_if_absent(&self, rows: &[ExportRow]) -> Result<ExportOutcome> {
        let existing = self.existing_job_ids()?;

        let fresh: Vec<&ExportRow> = rows
            .iter()
            .filter(|row| !existing.contains(&row.job_id))
            .collect();
        let skipped = rows.len() - fresh.len();

        if fresh.is_empty() {
            return Ok(ExportOutcome { appended: 0, skipped });
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| TrackerError::ExportUnavailable(e.into()))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TrackerError::ExportUnavailable(e.into()))?;

        for row in &fresh {
            let line = serde_json::to_string(row)?;
            writeln!(file, "{line}").map_err(|e| TrackerError::ExportUnavailable(e.into()))?;
        }
        file.sync_all()
            .map_err(|e| TrackerError::ExportUnavailable(e.into()))?;

        Ok(ExportOutcome {
            appended: fresh.len(),
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(job_id: &str, score: f64) -> ExportRow {
        ExportRow {
            exported_at: Utc::now(),
            job_id: job_id.to_string(),
            title: format!("Role {job_id}"),
            company: "Acme".to_string(),
            location: "Warsaw".to_string(),
            url: format!("https://jobs.example/view/{job_id}"),
            match_score: score,
            recommendation: "PURSUE".to_string(),
            model_tag: "m1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_then_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = JsonlExporter::new(dir.path().join("matches.jsonl"));

        let first = exporter
            .append_if_absent(&[row("A", 8.0), row("B", 7.5)])
            .await
            .unwrap();
        assert_eq!(first, ExportOutcome { appended: 2, skipped: 0 });

        // Re-appending the same rows plus one new is idempotent per job id.
        let second = exporter
            .append_if_absent(&[row("A", 8.0), row("B", 7.5), row("C", 9.0)])
            .await
            .unwrap();
        assert_eq!(second, ExportOutcome { appended: 1, skipped: 2 });
    }

    #[tokio::test]
    async fn test_empty_append_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = JsonlExporter::new(dir.path().join("matches.jsonl"));
        let outcome = exporter.append_if_absent(&[]).await.unwrap();
        assert_eq!(outcome, ExportOutcome { appended: 0, skipped: 0 });
    }
}
