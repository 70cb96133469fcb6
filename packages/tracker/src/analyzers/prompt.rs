//! Job analysis prompt construction.

use crate::types::listing::RawListing;

/// Default analysis prompt.
///
/// Asks for every section as an XML-style tagged block so the response can
/// be parsed without depending on provider-side structured output. Keep the
/// tag set in sync with `response::parse_analysis_response`.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are an expert career advisor. Analyze how well this job matches the candidate's CV.

Here is the candidate's CV:

{candidate_cv}

Here is the job description:

{job_description}

Respond with exactly these tagged sections:

<score>Overall match score from 0 to 10</score>
<human_fit>Score 0-10 for how a human reviewer would rate the fit, with a short justification</human_fit>
<ats_fit>Score 0-10 for how an applicant tracking system would rate the keyword fit, with a short justification</ats_fit>
<key_strengths>The candidate's strongest qualifications for this specific role</key_strengths>
<critical_gaps>Requirements the candidate does not clearly meet</critical_gaps>
<cv_tailoring>Concrete suggestions for tailoring the CV to this posting</cv_tailoring>
<experience_positioning>How to position the candidate's experience for this role</experience_positioning>
<talking_points>Interview talking points connecting the candidate to this role</talking_points>
<recommendation>One of PURSUE, CONSIDER, or AVOID, followed by a one-sentence rationale</recommendation>
<summary>A one-paragraph summary of the match</summary>"#;

/// Fill the template with the CV and the job's description.
pub fn build_prompt(cv_text: &str, listing: &RawListing) -> String {
    let mut job_description = String::new();
    if !listing.title.is_empty() {
        job_description.push_str(&format!("Title: {}\n", listing.title));
    }
    if !listing.company.is_empty() {
        job_description.push_str(&format!("Company: {}\n", listing.company));
    }
    if !listing.location.is_empty() {
        job_description.push_str(&format!("Location: {}\n", listing.location));
    }
    job_description.push('\n');
    job_description.push_str(&listing.description);

    ANALYSIS_PROMPT_TEMPLATE
        .replace("{candidate_cv}", cv_text)
        .replace("{job_description}", &job_description)
}
