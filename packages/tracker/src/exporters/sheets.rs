//! Google Sheets exporter.
//!
//! Appends match rows to a sheet through the Sheets REST API. Idempotence
//! keyed by job id: existing rows are read first and already-present ids are
//! skipped, so retried runs never duplicate rows.
//!
//! Authentication is a bearer access token supplied by the caller (e.g.
//! minted from a service account by external tooling); the full OAuth dance
//! is out of scope here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Result, TrackerError};
use crate::traits::exporter::{ExportOutcome, ExportRow, Exporter};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// Column layout: exported_at, title, company, score, recommendation, url,
// job_id, location, model_tag. Job id is column 7.
const JOB_ID_COLUMN: usize = 6;
const DATA_RANGE: &str = "A2:I";

/// Exporter appending to a Google Sheet.
pub struct SheetsExporter {
    client: Client,
    access_token: String,
    spreadsheet_id: String,
    sheet_name: String,
}

impl SheetsExporter {
    /// Create a new exporter for one sheet tab.
    pub fn new(
        access_token: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client builds with static config");
        Self {
            client,
            access_token: access_token.into(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    fn range(&self) -> String {
        format!("{}!{}", self.sheet_name, DATA_RANGE)
    }

    async fn existing_job_ids(&self) -> Result<Vec<String>> {
        let url = format!(
            "{SHEETS_BASE_URL}/{}/values/{}",
            self.spreadsheet_id,
            self.range()
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| TrackerError::ExportUnavailable(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::ExportUnavailable(
                format!("Sheets API returned {status}: {body}").into(),
            ));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| TrackerError::ExportUnavailable(e.into()))?;

        Ok(range
            .values
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| {
                row.get(JOB_ID_COLUMN)
                    .and_then(|v| v.as_str())
                    .map(str::to_owned)
            })
            .collect())
    }

    fn to_values(row: &ExportRow) -> Vec<Value> {
        vec![
            json!(row.exported_at.to_rfc3339()),
            json!(row.title),
            json!(row.company),
            json!(row.match_score),
            json!(row.recommendation),
            json!(row.url),
            json!(row.job_id),
            json!(row.location),
            json!(row.model_tag),
        ]
    }
}

#[async_trait]
impl Exporter for SheetsExporter {
    async fn append_if_absent(&self, rows: &[ExportRow]) -> Result<ExportOutcome> {
        let existing = self.existing_job_ids().await?;

        let fresh: Vec<Vec<Value>> = rows
            .iter()
            .filter(|row| !existing.contains(&row.job_id))
            .map(Self::to_values)
            .collect();
        let skipped = rows.len() - fresh.len();

        if fresh.is_empty() {
            return Ok(ExportOutcome { appended: 0, skipped });
        }

        let url = format!(
            "{SHEETS_BASE_URL}/{}/values/{}:append?valueInputOption=RAW",
            self.spreadsheet_id,
            self.range()
        );
        let appended = fresh.len();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": fresh }))
            .send()
            .await
            .map_err(|e| TrackerError::ExportUnavailable(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::ExportUnavailable(
                format!("Sheets API returned {status}: {body}").into(),
            ));
        }

        Ok(ExportOutcome { appended, skipped })
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    values: Option<Vec<Vec<Value>>>,
}
