//! Data types for the job tracking pipeline.

pub mod analysis;
pub mod config;
pub mod listing;
pub mod record;
pub mod run;

pub use analysis::AnalysisResult;
pub use config::{AnalysisConfig, RetryPolicy, SearchConfig};
pub use listing::RawListing;
pub use record::{JobRecord, JobState, Recommendation};
pub use run::{RunRecord, RunStage, RunSummary, StoreStats};
