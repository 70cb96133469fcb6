//! Parsing of tagged LLM analysis responses.
//!
//! The analyzer prompt asks for XML-style tagged sections. Anything the
//! model wraps around them is ignored. A response without a parseable
//! `<score>` is malformed; every other section degrades to empty.

use regex::Regex;

use crate::error::{Result, TrackerError};
use crate::types::{analysis::AnalysisResult, record::Recommendation};

/// Extract the trimmed content of `<name>...</name>`.
fn tag(text: &str, name: &str) -> Option<String> {
    let pattern = format!(r"(?s)<{name}>\s*(.+?)\s*</{name}>");
    let re = Regex::new(&pattern).expect("tag pattern is valid");
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the first number from a tag's content.
fn tag_number(text: &str, name: &str) -> Option<f64> {
    let content = tag(text, name)?;
    let re = Regex::new(r"(\d+(?:\.\d+)?)").expect("number pattern is valid");
    re.captures(&content)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a tagged analysis response into an [`AnalysisResult`].
pub fn parse_analysis_response(text: &str, model_tag: &str) -> Result<AnalysisResult> {
    let score = tag_number(text, "score").ok_or_else(|| TrackerError::AnalysisMalformed {
        reason: "response has no parseable <score> section".to_string(),
    })?;

    let recommendation_details = tag(text, "recommendation").unwrap_or_default();
    let recommendation = if recommendation_details.is_empty() {
        Recommendation::Review
    } else {
        Recommendation::from_text(&recommendation_details)
    };

    Ok(AnalysisResult {
        score,
        recommendation,
        recommendation_details,
        strengths: tag(text, "key_strengths").unwrap_or_default(),
        gaps: tag(text, "critical_gaps").unwrap_or_default(),
        tailoring_notes: tag(text, "cv_tailoring").unwrap_or_default(),
        human_fit: tag_number(text, "human_fit"),
        ats_fit: tag_number(text, "ats_fit"),
        experience_positioning: tag(text, "experience_positioning").unwrap_or_default(),
        talking_points: tag(text, "talking_points").unwrap_or_default(),
        summary: tag(text, "summary").unwrap_or_default(),
        model_tag: model_tag.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = r#"Here is my analysis.

<score>8.5</score>
<human_fit>9 - a reviewer would see a near-perfect background</human_fit>
<ats_fit>7 - some keywords missing</ats_fit>
<key_strengths>Deep product leadership experience</key_strengths>
<critical_gaps>No fintech background</critical_gaps>
<cv_tailoring>Lead with the platform migration project</cv_tailoring>
<experience_positioning>Frame the ops role as product-adjacent</experience_positioning>
<talking_points>Scaling the team from 3 to 20</talking_points>
<recommendation>PURSUE - strong overall match</recommendation>
<summary>An excellent fit for this role.</summary>"#;

    #[test]
    fn test_parse_full_response() {
        let result = parse_analysis_response(FULL_RESPONSE, "m1").unwrap();
        assert_eq!(result.score, 8.5);
        assert_eq!(result.recommendation, Recommendation::Pursue);
        assert_eq!(result.human_fit, Some(9.0));
        assert_eq!(result.ats_fit, Some(7.0));
        assert_eq!(result.strengths, "Deep product leadership experience");
        assert_eq!(result.gaps, "No fintech background");
        assert_eq!(result.summary, "An excellent fit for this role.");
        assert_eq!(result.model_tag, "m1");
    }

    #[test]
    fn test_missing_score_is_malformed() {
        let err = parse_analysis_response("<summary>nice role</summary>", "m1").unwrap_err();
        assert!(matches!(err, TrackerError::AnalysisMalformed { .. }));
    }

    #[test]
    fn test_score_only_degrades_gracefully() {
        let result = parse_analysis_response("<score>4</score>", "m1").unwrap();
        assert_eq!(result.score, 4.0);
        assert_eq!(result.recommendation, Recommendation::Review);
        assert!(result.strengths.is_empty());
        assert!(result.human_fit.is_none());
    }

    #[test]
    fn test_recommendation_keyword_anywhere() {
        let text = "<score>3</score><recommendation>Probably best to AVOID this one</recommendation>";
        let result = parse_analysis_response(text, "m1").unwrap();
        assert_eq!(result.recommendation, Recommendation::Avoid);
    }

    #[test]
    fn test_score_embedded_in_text() {
        let text = "<score>I would rate this 6.5 out of 10</score>";
        let result = parse_analysis_response(text, "m1").unwrap();
        assert_eq!(result.score, 6.5);
    }
}
