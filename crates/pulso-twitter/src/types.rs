//! Search API response types.
//!
//! Tweets and users are kept as raw JSON objects: the reshape step flattens
//! whatever fields were requested instead of hard-coding a struct per field.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Tweet fields requested on every search.
pub const TWEET_FIELDS: &[&str] = &[
    "id",
    "author_id",
    "created_at",
    "text",
    "public_metrics",
    "possibly_sensitive",
    "lang",
];

/// User fields requested through the `author_id` expansion.
pub const USER_FIELDS: &[&str] = &[
    "id",
    "username",
    "name",
    "location",
    "created_at",
    "description",
    "profile_image_url",
    "verified",
    "public_metrics",
];

pub const EXPANSIONS: &[&str] = &["author_id", "referenced_tweets.id"];

pub type JsonObject = Map<String, Value>;

/// Body of `GET /2/tweets/search/recent`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SearchResponse {
    /// Absent when the window has no matching tweets.
    #[serde(default)]
    pub data: Option<Vec<JsonObject>>,
    #[serde(default)]
    pub includes: Includes,
    #[serde(default)]
    pub meta: Meta,
}

impl SearchResponse {
    #[must_use]
    pub fn tweets(&self) -> &[JsonObject] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Fold a further page into this one.
    pub fn merge(&mut self, page: SearchResponse) {
        if let Some(data) = page.data {
            self.data.get_or_insert_with(Vec::new).extend(data);
        }
        self.includes.users.extend(page.includes.users);
        self.meta.result_count += page.meta.result_count;
        self.meta.next_token = page.meta.next_token;
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<JsonObject>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub result_count: u64,
    #[serde(default)]
    pub next_token: Option<String>,
}
