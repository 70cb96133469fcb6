//! Apify-backed scraper implementation.
//!
//! Expands a [`SearchConfig`] into LinkedIn search URLs and drives the
//! LinkedIn jobs actor through the `apify-client` crate, in small URL
//! batches to stay inside the actor's limits.

use std::time::Duration;

use apify_client::{ApifyClient, JobListing};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{Result, TrackerError};
use crate::traits::scraper::Scraper;
use crate::types::{config::SearchConfig, listing::RawListing};

/// URLs per actor run.
const URL_BATCH_SIZE: usize = 5;

/// Pause between actor runs.
const BATCH_DELAY: Duration = Duration::from_secs(5);

/// Scraper driving the Apify LinkedIn jobs actor.
pub struct ApifyScraper {
    client: ApifyClient,
}

impl ApifyScraper {
    /// Create a scraper with the given Apify API token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: ApifyClient::new(token.into()),
        }
    }

    /// Create from the `APIFY_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("APIFY_API_KEY")
            .map_err(|_| TrackerError::config("APIFY_API_KEY not set"))?;
        Ok(Self::new(token))
    }
}

#[async_trait]
impl Scraper for ApifyScraper {
    async fn scrape(&self, config: &SearchConfig) -> Result<Vec<RawListing>> {
        let urls = config.search_urls();
        if urls.is_empty() {
            return Err(TrackerError::config(
                "search config expands to no search URLs",
            ));
        }

        let total_batches = urls.len().div_ceil(URL_BATCH_SIZE);
        info!(
            url_count = urls.len(),
            total_batches, "scraping LinkedIn searches via Apify"
        );

        let mut listings = Vec::new();
        for (batch_num, batch) in urls.chunks(URL_BATCH_SIZE).enumerate() {
            info!(batch = batch_num + 1, total_batches, "running scrape batch");

            let jobs = self
                .client
                .scrape_job_listings(batch.to_vec(), config.jobs_per_search)
                .await
                .map_err(|e| TrackerError::ScrapeUnavailable(e.into()))?;

            listings.extend(jobs.into_iter().map(into_raw_listing));

            if batch_num + 1 < total_batches {
                tokio::time::sleep(BATCH_DELAY).await;
            }
        }

        if listings.is_empty() {
            warn!("scrape returned no listings");
        }
        Ok(listings)
    }
}

fn into_raw_listing(job: JobListing) -> RawListing {
    RawListing {
        source_id: job.id,
        title: job.title.unwrap_or_default(),
        company: job.company_name.unwrap_or_default(),
        location: job.location.unwrap_or_default(),
        description: job.description_text.unwrap_or_default(),
        url: job.link.unwrap_or_default(),
        posted_at: job.posted_at,
        seniority_level: job.seniority_level,
        employment_type: job.employment_type,
        salary_info: job.salary_info.unwrap_or_default(),
    }
}
