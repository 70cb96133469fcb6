//! Validated listing value object constructed at the scraper boundary.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TrackerError};

/// A single scraped job listing.
///
/// Built by scraper implementations from the raw platform payload. The
/// payload is otherwise untrusted; the only hard requirement is that a
/// stable identifier can be resolved via [`RawListing::job_id`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    /// Identifier straight from the platform payload, when present.
    pub source_id: Option<String>,

    pub title: String,
    pub company: String,
    pub location: String,

    /// Full description text used for analysis.
    pub description: String,

    /// Posting URL.
    pub url: String,

    /// Platform's posting-age label (e.g. "2 weeks ago").
    pub posted_at: Option<String>,

    pub seniority_level: Option<String>,
    pub employment_type: Option<String>,

    /// Salary fragments as reported by the platform.
    pub salary_info: Vec<String>,
}

impl RawListing {
    /// Create a listing with the required fields; the rest default empty.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source_id: None,
            title: title.into(),
            company: String::new(),
            location: String::new(),
            description: String::new(),
            url: url.into(),
            posted_at: None,
            seniority_level: None,
            employment_type: None,
            salary_info: Vec::new(),
        }
    }

    /// Set the payload identifier.
    pub fn with_source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self
    }

    /// Set the company name.
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    /// Set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the description text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Resolve the stable job identifier.
    ///
    /// Prefers the payload id; falls back to the id embedded in a
    /// `/jobs/view/<id>` posting URL. A listing where neither resolves is
    /// malformed and must never be persisted.
    pub fn job_id(&self) -> Result<String> {
        if let Some(id) = self.source_id.as_deref() {
            let id = id.trim();
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }

        if let Some(id) = extract_id_from_url(&self.url) {
            return Ok(id);
        }

        Err(TrackerError::MalformedListing {
            reason: format!(
                "no source id and no id in url {:?} (title {:?})",
                self.url, self.title
            ),
        })
    }
}

/// Extract a numeric job id from a LinkedIn-style posting URL.
///
/// Handles both `/jobs/view/4011223344` and slugged variants like
/// `/jobs/view/senior-product-manager-at-acme-4011223344`, plus search URLs
/// carrying a `currentJobId` query parameter.
fn extract_id_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;

    if let Some(mut segments) = url.path_segments() {
        while let Some(segment) = segments.next() {
            if segment != "view" {
                continue;
            }
            let candidate = segments.next()?;
            let digits: String = candidate
                .chars()
                .rev()
                .take_while(|c| c.is_ascii_digit())
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            if !digits.is_empty() {
                return Some(digits);
            }
            return None;
        }
    }

    url.query_pairs()
        .find(|(k, _)| k == "currentJobId")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
}
