//! Pure Apify REST API client.
//!
//! A minimal client for the Apify platform API. Supports starting actor
//! runs, polling for completion, and fetching dataset results, specialized
//! for the LinkedIn jobs scraper actor.
//!
//! # Example
//!
//! ```rust,ignore
//! use apify_client::ApifyClient;
//!
//! let client = ApifyClient::new("your-api-token".into());
//!
//! let jobs = client.scrape_job_listings(search_urls, 100).await?;
//! for job in &jobs {
//!     println!("{}", job.title.as_deref().unwrap_or("(no title)"));
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{JobListing, LinkedInJobsInput, RunData};

use std::time::Duration;

use serde::de::DeserializeOwned;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for curious_coder/linkedin-jobs-scraper.
const LINKEDIN_JOBS_SCRAPER: &str = "curious_coder~linkedin-jobs-scraper";

/// How long to poll a run before giving up.
const MAX_WAIT: Duration = Duration::from_secs(300);

/// Interval between run status checks.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Start a LinkedIn job search run. Returns immediately with run metadata.
    pub async fn start_job_search(&self, input: &LinkedInJobsInput) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", BASE_URL, LINKEDIN_JOBS_SCRAPER);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run reaches a terminal state, bounded by [`MAX_WAIT`].
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        let mut waited = Duration::ZERO;
        loop {
            let url = format!("{}/actor-runs/{}", BASE_URL, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed(api_resp.data.status));
                }
                _ => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                }
            }

            if waited >= MAX_WAIT {
                return Err(ApifyError::RunTimedOut {
                    run_id: run_id.to_string(),
                    waited_secs: waited.as_secs(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            waited += POLL_INTERVAL;
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", BASE_URL, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Scrape job listings end-to-end: start run, poll, fetch results.
    pub async fn scrape_job_listings(
        &self,
        urls: Vec<String>,
        count_per_url: u32,
    ) -> Result<Vec<JobListing>> {
        tracing::info!(
            url_count = urls.len(),
            count_per_url,
            "Starting LinkedIn jobs scrape"
        );

        let input = LinkedInJobsInput::new(urls, count_per_url);
        let run = self.start_job_search(&input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        let jobs: Vec<JobListing> = self
            .get_dataset_items(&completed.default_dataset_id)
            .await?;
        tracing::info!(count = jobs.len(), "Fetched job listings");

        Ok(jobs)
    }
}
