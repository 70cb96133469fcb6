//! Scraper collaborator trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{config::SearchConfig, listing::RawListing};

/// Fetches job listings for a search configuration.
///
/// Implementations construct validated [`RawListing`] values at this
/// boundary; malformed platform payloads must not leak past it. Transport
/// failures surface as `ScrapeUnavailable`; the orchestrator owns retries.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, config: &SearchConfig) -> Result<Vec<RawListing>>;
}

#[async_trait]
impl<T: Scraper + ?Sized> Scraper for std::sync::Arc<T> {
    async fn scrape(&self, config: &SearchConfig) -> Result<Vec<RawListing>> {
        (**self).scrape(config).await
    }
}
