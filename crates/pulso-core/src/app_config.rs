use std::path::PathBuf;

use crate::ConfigError;

#[derive(Clone)]
pub struct AppConfig {
    pub twitter_bearer_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub twitter_base_url: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub request_timeout_secs: u64,
    /// Total attempts per remote call, including the first one.
    pub max_attempts: u32,
    pub retry_backoff_base_ms: u64,
    /// Fixed sleep between classifier calls.
    pub pace_ms: u64,
    pub data_dir: PathBuf,
    pub candidates_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Bearer token for the search API.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if `TWITTER_BEARER_TOKEN` was not set.
    pub fn require_twitter_bearer_token(&self) -> Result<&str, ConfigError> {
        self.twitter_bearer_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("TWITTER_BEARER_TOKEN".to_string()))
    }

    /// API key for the language-model endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if `OPENAI_API_KEY` was not set.
    pub fn require_openai_api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))
    }

    #[must_use]
    pub fn tweets_path(&self) -> PathBuf {
        self.data_dir.join("tweets.csv")
    }

    #[must_use]
    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.csv")
    }

    #[must_use]
    pub fn features_path(&self) -> PathBuf {
        self.data_dir.join("tweets_gpt_features.csv")
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "twitter_bearer_token",
                &self.twitter_bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("twitter_base_url", &self.twitter_base_url)
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("pace_ms", &self.pace_ms)
            .field("data_dir", &self.data_dir)
            .field("candidates_path", &self.candidates_path)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}
