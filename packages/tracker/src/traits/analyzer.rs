//! Analyzer collaborator trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{analysis::AnalysisResult, listing::RawListing};

/// Scores a job listing against the candidate CV with an LLM.
///
/// Error contract:
/// - `AnalysisMalformed`: the response could not be parsed. Per-job
///   recoverable; the orchestrator marks that job FAILED and continues.
/// - `AnalysisUnavailable`: quota, auth, or transport failure that will
///   recur for every remaining job. Run-fatal.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        listing: &RawListing,
        cv_text: &str,
        model_tag: &str,
    ) -> Result<AnalysisResult>;
}

#[async_trait]
impl<T: Analyzer + ?Sized> Analyzer for std::sync::Arc<T> {
    async fn analyze(
        &self,
        listing: &RawListing,
        cv_text: &str,
        model_tag: &str,
    ) -> Result<AnalysisResult> {
        (**self).analyze(listing, cv_text, model_tag).await
    }
}
