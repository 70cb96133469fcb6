//! Scraper implementations.

#[cfg(feature = "apify")]
pub mod apify;

#[cfg(feature = "apify")]
pub use apify::ApifyScraper;
