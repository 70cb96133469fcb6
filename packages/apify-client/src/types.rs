use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input for the curious_coder/linkedin-jobs-scraper actor.
///
/// The actor expects its input at the top level (not wrapped in a
/// `runInput` object) and requires a count of at least 100.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedInJobsInput {
    pub urls: Vec<String>,
    pub count: u32,
    #[serde(rename = "scrapeCompany")]
    pub scrape_company: bool,
    #[serde(rename = "debugLog")]
    pub debug_log: bool,
}

impl LinkedInJobsInput {
    /// Input for a batch of search URLs. The actor's 100-record minimum is
    /// enforced here.
    pub fn new(urls: Vec<String>, count: u32) -> Self {
        Self {
            urls,
            count: count.max(100),
            scrape_company: true,
            debug_log: false,
        }
    }
}

/// A single job listing from the actor's dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct JobListing {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "companyName")]
    pub company_name: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "descriptionText")]
    pub description_text: Option<String>,
    /// Posting URL.
    pub link: Option<String>,
    #[serde(rename = "seniorityLevel")]
    pub seniority_level: Option<String>,
    #[serde(rename = "employmentType")]
    pub employment_type: Option<String>,
    #[serde(rename = "jobFunction")]
    pub job_function: Option<String>,
    pub industries: Option<String>,
    #[serde(rename = "postedAt")]
    pub posted_at: Option<String>,
    #[serde(rename = "companyWebsite")]
    pub company_website: Option<String>,
    #[serde(rename = "companyLinkedinUrl")]
    pub company_linkedin_url: Option<String>,
    #[serde(rename = "salaryInfo")]
    pub salary_info: Option<Vec<String>>,
}

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}
