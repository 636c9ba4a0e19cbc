//! HTTP client for the v2 recent-search endpoint.
//!
//! Wraps `reqwest` with bearer authentication, typed errors for 429 and other
//! non-2xx statuses, and back-off retry on rate limiting and timeouts.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use crate::error::TwitterError;
use crate::retry::retry_with_backoff;
use crate::types::{SearchResponse, EXPANSIONS, TWEET_FIELDS, USER_FIELDS};
use crate::window::Window;

const DEFAULT_BASE_URL: &str = "https://api.twitter.com";
const SEARCH_PATH: &str = "2/tweets/search/recent";

/// Appended to every query so that only original posts come back.
const QUERY_SUFFIX: &str = "-is:retweet -is:reply";

/// Client for the recent-search API.
///
/// Use [`TwitterClient::new`] for production or
/// [`TwitterClient::with_base_url`] to point at a mock server in tests.
pub struct TwitterClient {
    client: Client,
    bearer_token: String,
    base_url: Url,
    max_attempts: u32,
    backoff_base_ms: u64,
}

impl TwitterClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`TwitterError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        bearer_token: &str,
        timeout_secs: u64,
        max_attempts: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, TwitterError> {
        Self::with_base_url(
            bearer_token,
            timeout_secs,
            max_attempts,
            backoff_base_ms,
            DEFAULT_BASE_URL,
        )
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`TwitterError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`TwitterError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        bearer_token: &str,
        timeout_secs: u64,
        max_attempts: u32,
        backoff_base_ms: u64,
        base_url: &str,
    ) -> Result<Self, TwitterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("pulso/0.1 (candidate-mentions)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| TwitterError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            bearer_token: bearer_token.to_owned(),
            base_url,
            max_attempts: max_attempts.max(1),
            backoff_base_ms,
        })
    }

    /// Fetches up to `max_pages` pages of results for `query` inside `window`,
    /// following `meta.next_token`, and merges them into one response.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`TwitterClient::search_page`].
    pub async fn search_window(
        &self,
        query: &str,
        window: &Window,
        max_results: u32,
        max_pages: u32,
    ) -> Result<SearchResponse, TwitterError> {
        let mut merged = self.search_page(query, window, max_results, None).await?;
        let mut pages = 1u32;

        while pages < max_pages {
            let Some(token) = merged.meta.next_token.clone() else {
                break;
            };
            let page = self
                .search_page(query, window, max_results, Some(&token))
                .await?;
            merged.merge(page);
            pages += 1;
        }

        tracing::info!(
            query,
            start = %window.start_param(),
            pages,
            tweets = merged.tweets().len(),
            "search window complete"
        );
        Ok(merged)
    }

    /// Fetches one page of search results, retrying on 429 and timeouts.
    ///
    /// # Errors
    ///
    /// - [`TwitterError::RateLimited`]: HTTP 429 after all attempts.
    /// - [`TwitterError::Http`]: network failure, or a timeout after all attempts.
    /// - [`TwitterError::Api`]: any other non-2xx status (not retried).
    /// - [`TwitterError::Deserialize`]: unexpected body shape (not retried).
    pub async fn search_page(
        &self,
        query: &str,
        window: &Window,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Result<SearchResponse, TwitterError> {
        let url = self.search_url(query, window, max_results, next_token);
        tracing::info!(query = %full_query(query), "making search request");

        retry_with_backoff(self.max_attempts, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .bearer_auth(&self.bearer_token)
                    .send()
                    .await?;
                let status = response.status();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let reset_at = response
                        .headers()
                        .get("x-rate-limit-reset")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<i64>().ok());
                    return Err(TwitterError::RateLimited { reset_at });
                }

                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(TwitterError::Api {
                        status: status.as_u16(),
                        body,
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<SearchResponse>(&body).map_err(|e| {
                    TwitterError::Deserialize {
                        context: format!("search page for {url}"),
                        source: e,
                    }
                })
            }
        })
        .await
    }

    /// Builds the search URL with every requested field and expansion.
    fn search_url(
        &self,
        query: &str,
        window: &Window,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Url {
        let mut url = self.base_url.clone();
        let path = format!("{}{SEARCH_PATH}", url.path());
        url.set_path(&path);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &full_query(query));
            pairs.append_pair("start_time", &window.start_param());
            pairs.append_pair("end_time", &window.end_param());
            pairs.append_pair("max_results", &max_results.to_string());
            pairs.append_pair("tweet.fields", &TWEET_FIELDS.join(","));
            pairs.append_pair("user.fields", &USER_FIELDS.join(","));
            pairs.append_pair("expansions", &EXPANSIONS.join(","));
            if let Some(token) = next_token {
                pairs.append_pair("next_token", token);
            }
        }
        url
    }
}

fn full_query(query: &str) -> String {
    format!("{query} {QUERY_SUFFIX}")
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
