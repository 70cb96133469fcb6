//! Configuration profiles.
//!
//! A profile is a YAML file under `<data-dir>/profiles/` overriding parts
//! of the built-in search and analysis defaults. Command-line flags win
//! over the profile, the profile wins over the defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracker::{AnalysisConfig, SearchConfig};

/// Optional overrides loaded from a profile file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub countries: Option<Vec<String>>,
    pub roles: Option<Vec<String>>,
    pub job_types: Option<Vec<String>>,
    pub experience_levels: Option<Vec<String>>,
    pub remote_settings: Option<Vec<String>>,
    pub time_filter: Option<String>,
    pub jobs_per_search: Option<u32>,
    pub model: Option<String>,
    pub match_threshold: Option<f64>,
    pub max_analyze: Option<usize>,
    pub cv_file: Option<PathBuf>,
}

impl Profile {
    /// Load `<data_dir>/profiles/<name>.yaml`.
    pub fn load(data_dir: &Path, name: &str) -> Result<Self> {
        let path = data_dir.join("profiles").join(format!("{name}.yaml"));
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("profile not found at {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid profile {}", path.display()))
    }

    /// Apply the profile on top of the given configs.
    pub fn apply(&self, search: &mut SearchConfig, analysis: &mut AnalysisConfig) {
        if let Some(countries) = &self.countries {
            search.countries = countries.clone();
        }
        if let Some(roles) = &self.roles {
            search.roles.clear();
            search.roles.insert("Custom".to_string(), roles.clone());
        }
        if let Some(job_types) = &self.job_types {
            search.job_types = job_types.clone();
        }
        if let Some(levels) = &self.experience_levels {
            search.experience_levels = levels.clone();
        }
        if let Some(remote) = &self.remote_settings {
            search.remote_settings = remote.clone();
        }
        if let Some(filter) = &self.time_filter {
            search.time_filter = filter.clone();
        }
        if let Some(count) = self.jobs_per_search {
            search.jobs_per_search = count;
        }
        if let Some(model) = &self.model {
            analysis.model_tag = model.clone();
        }
        if let Some(threshold) = self.match_threshold {
            analysis.match_score_threshold = threshold;
        }
        if let Some(max) = self.max_analyze {
            analysis.max_jobs_to_analyze = max;
        }
    }
}

/// Built-in search defaults.
pub fn default_search_config() -> SearchConfig {
    let mut search = SearchConfig {
        countries: [
            "Poland",
            "Portugal",
            "Spain",
            "France",
            "Germany",
            "United Kingdom",
        ]
        .map(str::to_string)
        .to_vec(),
        job_types: vec!["full-time".to_string()],
        experience_levels: vec!["mid-senior".to_string(), "director".to_string()],
        remote_settings: ["on-site", "remote", "hybrid"].map(str::to_string).to_vec(),
        recent_only: true,
        // Last 30 days
        time_filter: "r2592000".to_string(),
        jobs_per_search: 30,
        ..Default::default()
    };
    search.roles.insert(
        "Product Leadership".to_string(),
        vec![
            "Senior Product Manager".to_string(),
            "Director of Product".to_string(),
        ],
    );
    search.roles.insert(
        "Strategic Operations".to_string(),
        vec![
            "Director of Operations".to_string(),
            "Chief of Staff".to_string(),
        ],
    );
    search
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let profiles = dir.path().join("profiles");
        std::fs::create_dir_all(&profiles).unwrap();
        std::fs::write(
            profiles.join("berlin.yaml"),
            "countries:\n  - Germany\nroles:\n  - Staff Engineer\nmatch_threshold: 8.5\n",
        )
        .unwrap();

        let profile = Profile::load(dir.path(), "berlin").unwrap();
        let mut search = default_search_config();
        let mut analysis = AnalysisConfig::default();
        profile.apply(&mut search, &mut analysis);

        assert_eq!(search.countries, ["Germany"]);
        assert_eq!(search.roles["Custom"], ["Staff Engineer"]);
        assert_eq!(analysis.match_score_threshold, 8.5);
        // Untouched fields keep their defaults.
        assert_eq!(search.job_types, ["full-time"]);
    }

    #[test]
    fn test_missing_profile_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Profile::load(dir.path(), "ghost").is_err());
    }
}
