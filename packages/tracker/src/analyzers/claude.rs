//! Anthropic Messages API implementation of the Analyzer trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use tracker::analyzers::ClaudeAnalyzer;
//!
//! let analyzer = ClaudeAnalyzer::from_env()?;
//! let result = analyzer.analyze(&listing, &cv_text, "claude-3-opus-20240229").await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::analyzers::{prompt::build_prompt, response::parse_analysis_response};
use crate::error::{Result, TrackerError};
use crate::traits::analyzer::Analyzer;
use crate::types::{analysis::AnalysisResult, listing::RawListing};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Analyzer backed by the Anthropic Messages API.
///
/// The model id is the `model_tag` passed per call, so a model change flows
/// through re-analysis without reconstructing the client.
#[derive(Clone)]
pub struct ClaudeAnalyzer {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl ClaudeAnalyzer {
    /// Create a new analyzer with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client builds with static config");
        Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4000,
        }
    }

    /// Create from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| TrackerError::config("ANTHROPIC_API_KEY not set"))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for proxies and test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the response token budget (default: 4000).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn complete(&self, model: &str, prompt: String) -> Result<String> {
        let request = MessagesRequest {
            model: model.to_string(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| TrackerError::AnalysisUnavailable(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // A 400 is specific to this prompt; quota/auth/server failures
            // will recur for every remaining job.
            if status == StatusCode::BAD_REQUEST {
                return Err(TrackerError::AnalysisMalformed {
                    reason: format!("API rejected request: {body}"),
                });
            }
            return Err(TrackerError::AnalysisUnavailable(
                format!("API returned {status}: {body}").into(),
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| TrackerError::AnalysisUnavailable(e.into()))?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if text.is_empty() {
            return Err(TrackerError::AnalysisMalformed {
                reason: "response contains no text content".to_string(),
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl Analyzer for ClaudeAnalyzer {
    async fn analyze(
        &self,
        listing: &RawListing,
        cv_text: &str,
        model_tag: &str,
    ) -> Result<AnalysisResult> {
        let prompt = build_prompt(cv_text, listing);
        let text = self.complete(model_tag, prompt).await?;
        parse_analysis_response(&text, model_tag)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}
