//! Markdown CV parsing and prompt formatting.
//!
//! The CV is a markdown document with `#`/`##` headings. It is parsed into
//! named sections and flattened into a prompt block with the most relevant
//! sections first, capped in length to keep prompts inside token limits.

use std::path::PathBuf;

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::warn;

use crate::error::{Result, TrackerError};
use crate::traits::cv::CvSource;

/// Sections ordered by importance for the analysis prompt.
const PRIORITY_SECTIONS: [&str; 5] = ["Summary", "Skills", "Experience", "Education", "Projects"];

/// Default cap on formatted CV length, in characters.
pub const DEFAULT_MAX_CV_LENGTH: usize = 4000;

/// Parse a markdown CV into sections keyed by heading.
///
/// `#` starts a section, `##` a subsection; subsections get their own keys
/// so `format_cv_for_prompt` can prioritize them individually. Content
/// before the first heading is ignored. Insertion order is preserved.
pub fn parse_markdown_cv(content: &str) -> IndexMap<String, String> {
    let mut sections: IndexMap<String, String> = IndexMap::new();
    let mut current_section: Option<String> = None;
    let mut current_subsection: Option<String> = None;

    for line in content.lines() {
        if let Some(heading) = line.strip_prefix("# ") {
            let heading = heading.trim().to_string();
            sections.entry(heading.clone()).or_default();
            current_section = Some(heading);
            current_subsection = None;
        } else if let Some(heading) = line.strip_prefix("## ") {
            if current_section.is_some() {
                let heading = heading.trim().to_string();
                sections.entry(heading.clone()).or_default();
                current_subsection = Some(heading);
            }
        } else if current_section.is_some() {
            let key = current_subsection
                .as_ref()
                .or(current_section.as_ref())
                .expect("a section is active");
            let entry = sections.entry(key.clone()).or_default();
            entry.push_str(line);
            entry.push('\n');
        }
    }

    for value in sections.values_mut() {
        *value = value.trim().to_string();
    }
    sections.retain(|_, v| !v.is_empty());
    sections
}

/// Flatten parsed sections into a prompt block.
///
/// Priority sections come first; Skills bullet lists collapse into a
/// comma-separated line. Output longer than `max_length` is truncated with
/// a marker.
pub fn format_cv_for_prompt(sections: &IndexMap<String, String>, max_length: usize) -> String {
    let mut parts: Vec<String> = Vec::new();

    for name in PRIORITY_SECTIONS {
        if let Some(content) = sections.get(name) {
            if name == "Skills" {
                let skills: Vec<&str> = content
                    .lines()
                    .map(|line| line.trim_start_matches(['-', ' ']).trim())
                    .filter(|line| !line.is_empty())
                    .collect();
                parts.push(format!("{name}:\n{}", skills.join(", ")));
            } else {
                parts.push(format!("{name}:\n{content}"));
            }
        }
    }

    for (name, content) in sections {
        if !PRIORITY_SECTIONS.contains(&name.as_str()) {
            parts.push(format!("{name}:\n{content}"));
        }
    }

    let mut formatted = parts.join("\n\n");
    if formatted.len() > max_length {
        warn!(
            length = formatted.len(),
            max_length, "CV content exceeds max length, trimming"
        );
        let mut cut = max_length;
        while !formatted.is_char_boundary(cut) {
            cut -= 1;
        }
        formatted.truncate(cut);
        formatted.push_str("...\n[Content truncated due to length]");
    }
    formatted
}

/// CV source reading a markdown file from disk.
pub struct FileCvSource {
    path: PathBuf,
    max_length: usize,
}

impl FileCvSource {
    /// Read the CV from the given markdown file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_length: DEFAULT_MAX_CV_LENGTH,
        }
    }

    /// Override the formatted-length cap.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }
}

#[async_trait]
impl CvSource for FileCvSource {
    async fn load(&self) -> Result<String> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            TrackerError::Config(
                format!("cannot read CV file {}: {e}", self.path.display()).into(),
            )
        })?;
        let sections = parse_markdown_cv(&content);
        if sections.is_empty() {
            return Err(TrackerError::Config(
                format!("CV file {} has no sections", self.path.display()).into(),
            ));
        }
        Ok(format_cv_for_prompt(&sections, self.max_length))
    }
}
