//! Analyzer output types.

use serde::{Deserialize, Serialize};

use crate::types::record::Recommendation;

/// Structured result of analyzing one job against the candidate CV.
///
/// `score` is the primary match score on a 0-10 scale; everything else is
/// supporting signal carried through to the export and the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Overall match score, 0-10.
    pub score: f64,

    /// Categorical recommendation.
    pub recommendation: Recommendation,

    /// Free-form recommendation rationale.
    pub recommendation_details: String,

    /// Where the candidate is strong for this role.
    pub strengths: String,

    /// Requirements the candidate does not clearly meet.
    pub gaps: String,

    /// Concrete suggestions for tailoring the CV to this posting.
    pub tailoring_notes: String,

    /// Secondary signals from the enhanced analysis prompt.
    pub human_fit: Option<f64>,
    pub ats_fit: Option<f64>,
    pub experience_positioning: String,
    pub talking_points: String,

    /// One-paragraph summary of the match.
    pub summary: String,

    /// Model/version tag that produced this analysis.
    pub model_tag: String,
}

impl AnalysisResult {
    /// Minimal result with just score, recommendation, and model tag.
    pub fn new(score: f64, recommendation: Recommendation, model_tag: impl Into<String>) -> Self {
        Self {
            score,
            recommendation,
            recommendation_details: String::new(),
            strengths: String::new(),
            gaps: String::new(),
            tailoring_notes: String::new(),
            human_fit: None,
            ats_fit: None,
            experience_positioning: String::new(),
            talking_points: String::new(),
            summary: String::new(),
            model_tag: model_tag.into(),
        }
    }

    /// Set the summary text.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Set strengths and gaps.
    pub fn with_assessment(
        mut self,
        strengths: impl Into<String>,
        gaps: impl Into<String>,
    ) -> Self {
        self.strengths = strengths.into();
        self.gaps = gaps.into();
        self
    }
}
