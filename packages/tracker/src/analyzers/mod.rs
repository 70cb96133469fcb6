//! Analyzer implementations and shared prompt/response plumbing.

pub mod prompt;
pub mod rate_limited;
pub mod response;

#[cfg(feature = "claude")]
pub mod claude;

pub use prompt::{build_prompt, ANALYSIS_PROMPT_TEMPLATE};
pub use rate_limited::RateLimitedAnalyzer;
pub use response::parse_analysis_response;

#[cfg(feature = "claude")]
pub use claude::ClaudeAnalyzer;
