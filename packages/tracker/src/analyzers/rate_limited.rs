//! Rate-limited analyzer wrapper.
//!
//! Wraps any Analyzer implementation with rate limiting using the governor
//! crate, for providers with strict per-minute quotas.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::Result;
use crate::traits::analyzer::Analyzer;
use crate::types::{analysis::AnalysisResult, listing::RawListing};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// An analyzer wrapper that enforces a request rate limit.
pub struct RateLimitedAnalyzer<A: Analyzer> {
    inner: A,
    limiter: Arc<DefaultRateLimiter>,
}

impl<A: Analyzer> RateLimitedAnalyzer<A> {
    /// Create a new rate-limited analyzer.
    ///
    /// # Arguments
    /// * `analyzer` - The underlying analyzer to wrap
    /// * `requests_per_minute` - Maximum analyze calls per minute
    pub fn new(analyzer: A, requests_per_minute: u32) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(requests_per_minute).expect("requests_per_minute must be > 0"),
        );
        Self {
            inner: analyzer,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with a conservative default of 50 requests per minute.
    pub fn with_default_quota(analyzer: A) -> Self {
        Self {
            inner: analyzer,
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(nonzero!(50u32)))),
        }
    }

    /// Create with a custom quota.
    pub fn with_quota(analyzer: A, quota: Quota) -> Self {
        Self {
            inner: analyzer,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl<A: Analyzer> Analyzer for RateLimitedAnalyzer<A> {
    async fn analyze(
        &self,
        listing: &RawListing,
        cv_text: &str,
        model_tag: &str,
    ) -> Result<AnalysisResult> {
        self.limiter.until_ready().await;
        self.inner.analyze(listing, cv_text, model_tag).await
    }
}
