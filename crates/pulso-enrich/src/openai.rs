//! Chat-completions client used as the production [`Classifier`].

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::classification::Classification;
use crate::classifier::Classifier;
use crate::error::ClassifierError;
use crate::prompt::build_prompt;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Classifies posts with a chat model at temperature 0.
pub struct OpenAiClassifier {
    client: Client,
    api_key: String,
    endpoint: Url,
    model: String,
    max_attempts: u32,
    backoff_base_ms: u64,
}

impl OpenAiClassifier {
    /// Creates a classifier pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        max_attempts: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ClassifierError> {
        Self::with_base_url(
            api_key,
            model,
            timeout_secs,
            max_attempts,
            backoff_base_ms,
            DEFAULT_BASE_URL,
        )
    }

    /// Creates a classifier with a custom base URL (tests, proxies).
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ClassifierError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        max_attempts: u32,
        backoff_base_ms: u64,
        base_url: &str,
    ) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join(COMPLETIONS_PATH))
            .map_err(|e| ClassifierError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint,
            model: model.to_owned(),
            max_attempts: max_attempts.max(1),
            backoff_base_ms,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// One chat-completion round trip returning the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClassifierError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ClassifierError::Malformed(format!("unexpected response body: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ClassifierError::Malformed("response has no completion".to_owned()))
    }
}

impl Classifier for OpenAiClassifier {
    async fn classify(&self, text: &str, prefix: &str) -> Result<Classification, ClassifierError> {
        let prompt = build_prompt(text, prefix);
        let completion =
            retry_with_backoff(self.max_attempts, self.backoff_base_ms, || self.complete(&prompt))
                .await?;
        Classification::parse(&completion, prefix)
    }
}
