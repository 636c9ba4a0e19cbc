use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// The search API accepts between 10 and 100 results per page.
pub const MAX_RESULTS_RANGE: std::ops::RangeInclusive<u32> = 10..=100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateConfig {
    /// Label written to the `candidato` column.
    pub name: String,
    /// Search query; defaults to `name` when absent.
    #[serde(default)]
    pub query: Option<String>,
}

impl CandidateConfig {
    #[must_use]
    pub fn search_query(&self) -> &str {
        self.query.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchDefaults {
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_tweets_prefix")]
    pub tweets_prefix: String,
    #[serde(default = "default_users_prefix")]
    pub users_prefix: String,
    /// Inclusive start of the search range (`YYYY-MM-DD` or RFC 3339).
    #[serde(default)]
    pub start: Option<String>,
    /// Exclusive end of the search range.
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default = "default_pages_per_window")]
    pub pages_per_window: u32,
}

impl Default for FetchDefaults {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            tweets_prefix: default_tweets_prefix(),
            users_prefix: default_users_prefix(),
            start: None,
            end: None,
            pages_per_window: default_pages_per_window(),
        }
    }
}

fn default_max_results() -> u32 {
    10
}

fn default_tweets_prefix() -> String {
    "tw_".to_string()
}

fn default_users_prefix() -> String {
    "us_".to_string()
}

fn default_pages_per_window() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidatesFile {
    #[serde(default)]
    pub fetch: FetchDefaults,
    pub candidates: Vec<CandidateConfig>,
}

/// Load and validate the candidates configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_candidates(path: &Path) -> Result<CandidatesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CandidatesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_candidates(&content)
}

/// Parse and validate candidates YAML already held in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_candidates(content: &str) -> Result<CandidatesFile, ConfigError> {
    let file: CandidatesFile = serde_yaml::from_str(content)?;
    validate_candidates(&file)?;
    Ok(file)
}

fn validate_candidates(file: &CandidatesFile) -> Result<(), ConfigError> {
    if file.candidates.is_empty() {
        return Err(ConfigError::Validation(
            "at least one candidate is required".to_string(),
        ));
    }

    if !MAX_RESULTS_RANGE.contains(&file.fetch.max_results) {
        return Err(ConfigError::Validation(format!(
            "max_results {} is outside {}..={}",
            file.fetch.max_results,
            MAX_RESULTS_RANGE.start(),
            MAX_RESULTS_RANGE.end()
        )));
    }

    if file.fetch.pages_per_window == 0 {
        return Err(ConfigError::Validation(
            "pages_per_window must be at least 1".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for candidate in &file.candidates {
        if candidate.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "candidate name must be non-empty".to_string(),
            ));
        }
        if !seen.insert(candidate.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate candidate: '{}'",
                candidate.name
            )));
        }
    }

    Ok(())
}
