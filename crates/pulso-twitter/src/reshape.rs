//! Turn a nested search response into flat `tweets` and `users` tables.
//!
//! The pipeline is a chain of independent steps, each taking and returning
//! an immutable [`Table`]:
//!
//! 1. [`flatten_objects`]: one row per tweet, `public_metrics` merged into
//!    top-level columns (users get the same treatment under a `user_` prefix);
//! 2. [`join_authors`]: attach each tweet's author by `author_id`;
//! 3. [`segregate`]: split the wide table by fixed column lists;
//! 4. [`rename_tweets`] / [`rename_users`]: destination names plus calendar dates.

use std::collections::HashMap;

use chrono::DateTime;
use pulso_core::Table;
use serde_json::Value;

use crate::error::TwitterError;
use crate::types::{JsonObject, SearchResponse};

/// Nested object whose entries are hoisted into top-level columns.
const METRICS_FIELD: &str = "public_metrics";

/// Prefix for user columns in the joined table.
pub const USER_PREFIX: &str = "user_";

pub const TWEET_COLUMNS: &[&str] = &[
    "id",
    "author_id",
    "created_at",
    "text",
    "possibly_sensitive",
    "retweet_count",
    "reply_count",
    "like_count",
    "quote_count",
    "impression_count",
    "lang",
];

pub const USER_COLUMNS: &[&str] = &[
    "user_id",
    "user_username",
    "user_name",
    "user_location",
    "user_created_at",
    "user_description",
    "user_profile_image_url",
    "user_verified",
    "user_followers_count",
    "user_following_count",
    "user_tweet_count",
    "user_listed_count",
];

const TWEET_RENAMES: &[(&str, &str)] = &[
    ("id", "tweet"),
    ("author_id", "usuario"),
    ("created_at", "fecha"),
    ("text", "texto"),
    ("possibly_sensitive", "sensitivo"),
    ("retweet_count", "retweets"),
    ("reply_count", "replies"),
    ("like_count", "likes"),
    ("quote_count", "quotes"),
    ("impression_count", "impresiones"),
    ("lang", "idioma"),
];

const USER_RENAMES: &[(&str, &str)] = &[
    ("user_id", "usuario"),
    ("user_username", "handle"),
    ("user_name", "nombre"),
    ("user_location", "ubicacion"),
    ("user_created_at", "fecha_creacion"),
    ("user_description", "descripcion"),
    ("user_profile_image_url", "imagen"),
    ("user_verified", "verificado"),
    ("user_followers_count", "seguidores"),
    ("user_following_count", "siguiendo"),
    ("user_tweet_count", "tweets"),
    ("user_listed_count", "listas"),
];

/// Render a JSON value as a CSV cell. `null` becomes the empty cell.
#[must_use]
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Flatten JSON objects into a table, prefixing every column with `prefix`.
///
/// Columns appear in first-seen order across all objects; objects lacking a
/// field get an empty cell.
#[must_use]
pub fn flatten_objects(objects: &[JsonObject], prefix: &str) -> Table {
    let flat: Vec<Vec<(String, String)>> = objects
        .iter()
        .map(|obj| flatten_object(obj, prefix))
        .collect();

    let mut columns: Vec<String> = Vec::new();
    for pairs in &flat {
        for (name, _) in pairs {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
    }

    let rows = flat
        .into_iter()
        .map(|pairs| {
            let mut lookup: HashMap<String, String> = pairs.into_iter().collect();
            columns
                .iter()
                .map(|c| lookup.remove(c).unwrap_or_default())
                .collect()
        })
        .collect();

    // Widths match by construction.
    Table::from_rows(columns, rows).unwrap_or_default()
}

fn flatten_object(obj: &JsonObject, prefix: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(obj.len());
    for (key, value) in obj {
        match value {
            Value::Object(metrics) if key == METRICS_FIELD => {
                for (metric, v) in metrics {
                    pairs.push((format!("{prefix}{metric}"), cell(v)));
                }
            }
            _ => pairs.push((format!("{prefix}{key}"), cell(value))),
        }
    }
    pairs
}

/// Left-join `users` onto `tweets` by `author_id == user_id`.
///
/// Tweets whose author is missing from `users` keep empty user cells.
///
/// # Errors
///
/// Returns [`TwitterError::Reshape`] if `tweets` has rows but no `author_id` column.
pub fn join_authors(tweets: &Table, users: &Table) -> Result<Table, TwitterError> {
    let mut columns: Vec<String> = tweets.columns().to_vec();
    columns.extend(users.columns().iter().cloned());

    if tweets.is_empty() {
        return Ok(Table::new(columns));
    }

    let author_idx = tweets
        .column_index("author_id")
        .ok_or_else(|| TwitterError::Reshape {
            column: "author_id".to_string(),
            reason: "tweets carry no author_id".to_string(),
        })?;

    let mut by_id: HashMap<&str, usize> = HashMap::new();
    if let Ok(ids) = users.column_values("user_id") {
        for (i, id) in ids.enumerate() {
            by_id.entry(id).or_insert(i);
        }
    }

    let empty_user = vec![String::new(); users.columns().len()];
    let mut joined = Table::new(columns);
    for row in tweets.rows() {
        let author = row[author_idx].as_str();
        let user_row = match by_id.get(author) {
            Some(&i) => &users.rows()[i],
            None => {
                tracing::debug!(author_id = author, "author missing from includes.users");
                &empty_user
            }
        };
        let mut wide = row.clone();
        wide.extend(user_row.iter().cloned());
        joined.push_row(wide)?;
    }
    Ok(joined)
}

/// Split the joined table into the tweet and user column sets.
#[must_use]
pub fn segregate(wide: &Table) -> (Table, Table) {
    (wide.select(TWEET_COLUMNS), wide.select(USER_COLUMNS))
}

/// Rename tweet columns to `{prefix}{destination}` and reduce `fecha` to a date.
///
/// # Errors
///
/// Returns [`TwitterError::Reshape`] if a `created_at` value is not RFC 3339.
pub fn rename_tweets(tweets: &Table, prefix: &str) -> Result<Table, TwitterError> {
    let renamed = tweets.rename(&prefixed(TWEET_RENAMES, prefix));
    let date_column = format!("{prefix}fecha");
    renamed.try_map_column(&date_column, |raw| to_calendar_date(&date_column, raw))
}

/// Rename user columns to `{prefix}{destination}` and reduce `fecha_creacion` to a date.
///
/// # Errors
///
/// Returns [`TwitterError::Reshape`] if a `created_at` value is not RFC 3339.
pub fn rename_users(users: &Table, prefix: &str) -> Result<Table, TwitterError> {
    let renamed = users.rename(&prefixed(USER_RENAMES, prefix));
    let date_column = format!("{prefix}fecha_creacion");
    renamed.try_map_column(&date_column, |raw| to_calendar_date(&date_column, raw))
}

fn prefixed(renames: &[(&'static str, &'static str)], prefix: &str) -> Vec<(&'static str, String)> {
    renames
        .iter()
        .map(|(old, new)| (*old, format!("{prefix}{new}")))
        .collect()
}

/// `2023-05-15T17:02:11.000Z` → `2023-05-15`.
///
/// # Errors
///
/// Returns [`TwitterError::Reshape`] naming `column` if `raw` is not RFC 3339.
pub fn to_calendar_date(column: &str, raw: &str) -> Result<String, TwitterError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive().to_string())
        .map_err(|e| TwitterError::Reshape {
            column: column.to_string(),
            reason: format!("'{raw}' is not a timestamp: {e}"),
        })
}

/// Run the full pipeline on one search response.
///
/// An empty response produces two empty tables that still carry the
/// destination columns, so results from many windows concatenate cleanly.
///
/// # Errors
///
/// Propagates errors from [`join_authors`], [`rename_tweets`], and [`rename_users`].
pub fn reshape(
    response: &SearchResponse,
    tweets_prefix: &str,
    users_prefix: &str,
) -> Result<(Table, Table), TwitterError> {
    let tweets = flatten_objects(response.tweets(), "");
    let users = flatten_objects(&response.includes.users, USER_PREFIX);
    let wide = join_authors(&tweets, &users)?;
    let (tweets, users) = segregate(&wide);
    Ok((
        rename_tweets(&tweets, tweets_prefix)?,
        rename_users(&users, users_prefix)?,
    ))
}

#[cfg(test)]
#[path = "reshape_test.rs"]
mod tests;
