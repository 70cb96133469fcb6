//! Configuration types for scraping, analysis, and retry behavior.
//!
//! These are explicit immutable value objects passed into `Runner::run`,
//! never read from ambient state.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Search parameters expanded into platform search URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Countries to search in.
    pub countries: Vec<String>,

    /// Role category -> role titles. Order is preserved in URL expansion.
    pub roles: IndexMap<String, Vec<String>>,

    /// Job type filters ("full-time", "contract", ...).
    #[serde(default)]
    pub job_types: Vec<String>,

    /// Experience level filters ("mid-senior", "director", ...).
    #[serde(default)]
    pub experience_levels: Vec<String>,

    /// Remote work filters ("on-site", "remote", "hybrid").
    #[serde(default)]
    pub remote_settings: Vec<String>,

    /// Restrict to recently posted jobs.
    #[serde(default)]
    pub recent_only: bool,

    /// Platform time filter code (e.g. "r2592000" for the last 30 days).
    #[serde(default)]
    pub time_filter: String,

    /// Listings requested per search URL.
    pub jobs_per_search: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            countries: Vec::new(),
            roles: IndexMap::new(),
            job_types: vec!["full-time".to_string()],
            experience_levels: Vec::new(),
            remote_settings: Vec::new(),
            recent_only: false,
            time_filter: String::new(),
            jobs_per_search: 30,
        }
    }
}

impl SearchConfig {
    /// Single-country, single-role config.
    pub fn for_role(country: impl Into<String>, role: impl Into<String>) -> Self {
        let mut roles = IndexMap::new();
        roles.insert("Default".to_string(), vec![role.into()]);
        Self {
            countries: vec![country.into()],
            roles,
            ..Default::default()
        }
    }

    /// Expand into one LinkedIn search URL per (country, role) pair.
    ///
    /// Filter codes follow LinkedIn's query parameters: f_JT for job type,
    /// f_E for experience level, f_WT for remote setting, f_TPR for recency.
    pub fn search_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();

        for country in &self.countries {
            for roles in self.roles.values() {
                for role in roles {
                    let mut params: Vec<String> = Vec::new();
                    params.push(format!("keywords={}", encode(role)));
                    params.push(format!("location={}", encode(country)));

                    for code in codes(&self.job_types, job_type_code) {
                        params.push(format!("f_JT={code}"));
                    }
                    for code in codes(&self.experience_levels, experience_code) {
                        params.push(format!("f_E={code}"));
                    }
                    for code in codes(&self.remote_settings, remote_code) {
                        params.push(format!("f_WT={code}"));
                    }

                    if !self.time_filter.is_empty() {
                        params.push(format!("f_TPR={}", self.time_filter));
                    } else if self.recent_only {
                        // Last 30 days
                        params.push("f_TPR=r2592000".to_string());
                    }

                    urls.push(format!(
                        "https://www.linkedin.com/jobs/search/?{}",
                        params.join("&")
                    ));
                }
            }
        }

        urls
    }
}

fn encode(value: &str) -> String {
    value.replace(' ', "%20")
}

fn codes(values: &[String], map: fn(&str) -> Option<&'static str>) -> Vec<&'static str> {
    values
        .iter()
        .filter_map(|v| map(&v.to_lowercase()))
        .collect()
}

fn job_type_code(value: &str) -> Option<&'static str> {
    match value {
        "full-time" => Some("F"),
        "part-time" => Some("P"),
        "contract" => Some("C"),
        "temporary" => Some("T"),
        "volunteer" => Some("V"),
        "internship" => Some("I"),
        "other" => Some("O"),
        _ => None,
    }
}

fn experience_code(value: &str) -> Option<&'static str> {
    match value {
        "internship" => Some("1"),
        "entry" => Some("2"),
        "associate" => Some("3"),
        "mid-senior" => Some("4"),
        "director" => Some("5"),
        "executive" => Some("6"),
        _ => None,
    }
}

fn remote_code(value: &str) -> Option<&'static str> {
    match value {
        "on-site" => Some("1"),
        "remote" => Some("2"),
        "hybrid" => Some("3"),
        _ => None,
    }
}

/// Analysis-stage parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Model/version tag handed to the analyzer and recorded on each job.
    pub model_tag: String,

    /// Minimum score (out of 10) for a job to be exported.
    pub match_score_threshold: f64,

    /// Cap on jobs analyzed per run, to bound API cost.
    pub max_jobs_to_analyze: usize,

    /// Concurrent analyzer calls. 1 preserves strictly sequential behavior.
    pub concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model_tag: "claude-3-opus-20240229".to_string(),
            match_score_threshold: 7.0,
            max_jobs_to_analyze: 50,
            concurrency: 1,
        }
    }
}

impl AnalysisConfig {
    /// Config with a given model tag and defaults for the rest.
    pub fn for_model(model_tag: impl Into<String>) -> Self {
        Self {
            model_tag: model_tag.into(),
            ..Default::default()
        }
    }

    /// Set the export threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.match_score_threshold = threshold;
        self
    }

    /// Set analyzer concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Bounded exponential backoff for collaborator calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles per attempt after that.
    pub base_delay: Duration,

    /// Ceiling on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries (single attempt).
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before the attempt with the given 1-based index.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        delay.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_expansion() {
        let mut roles = IndexMap::new();
        roles.insert(
            "Product".to_string(),
            vec!["Senior Product Manager".to_string()],
        );
        let config = SearchConfig {
            countries: vec!["Poland".to_string(), "Spain".to_string()],
            roles,
            job_types: vec!["full-time".to_string()],
            experience_levels: vec!["mid-senior".to_string(), "director".to_string()],
            remote_settings: vec!["remote".to_string()],
            recent_only: false,
            time_filter: "r2592000".to_string(),
            jobs_per_search: 30,
        };

        let urls = config.search_urls();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("keywords=Senior%20Product%20Manager"));
        assert!(urls[0].contains("location=Poland"));
        assert!(urls[0].contains("f_JT=F"));
        assert!(urls[0].contains("f_E=4"));
        assert!(urls[0].contains("f_E=5"));
        assert!(urls[0].contains("f_WT=2"));
        assert!(urls[0].contains("f_TPR=r2592000"));
        assert!(urls[1].contains("location=Spain"));
    }

    #[test]
    fn test_recent_only_fallback() {
        let mut config = SearchConfig::for_role("Germany", "Chief of Staff");
        config.recent_only = true;
        let urls = config.search_urls();
        assert!(urls[0].contains("f_TPR=r2592000"));
    }

    #[test]
    fn test_retry_delay_is_bounded() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(8), Duration::from_secs(30));
    }
}
