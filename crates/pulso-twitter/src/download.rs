//! Candidate × window download loop.

use pulso_core::Table;

use crate::client::TwitterClient;
use crate::error::TwitterError;
use crate::reshape::reshape;
use crate::types::SearchResponse;
use crate::window::Window;

/// Column holding the candidate each tweet was found for.
pub const CANDIDATE_COLUMN: &str = "candidato";

/// One candidate to search for.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    /// Label written to [`CANDIDATE_COLUMN`].
    pub label: String,
    pub query: String,
}

/// Per-run download settings.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub max_results: u32,
    pub pages_per_window: u32,
    pub tweets_prefix: String,
    pub users_prefix: String,
}

/// The two tables produced by a run.
#[derive(Debug, Default)]
pub struct Downloaded {
    pub tweets: Table,
    pub users: Table,
}

/// Download every candidate over every window.
///
/// Results are concatenated first across windows, then across candidates.
/// Nothing is persisted here; any error aborts the whole run.
///
/// # Errors
///
/// Returns the first [`TwitterError`] from the client or the reshape step.
pub async fn download(
    client: &TwitterClient,
    candidates: &[CandidateQuery],
    windows: &[Window],
    settings: &DownloadSettings,
) -> Result<Downloaded, TwitterError> {
    // Seeded with an empty batch so the output keeps its header with no windows.
    let (empty_tweets, empty_users) = empty_batch(settings)?;
    let mut tweet_tables = Vec::with_capacity(candidates.len() + 1);
    let mut user_tables = Vec::with_capacity(candidates.len() + 1);
    tweet_tables.push(empty_tweets);
    user_tables.push(empty_users);

    for candidate in candidates {
        let mut window_tweets = Vec::with_capacity(windows.len());
        let mut window_users = Vec::with_capacity(windows.len());

        for window in windows {
            let (tweets, users) =
                fetch_batch(client, candidate, window, settings).await?;
            window_tweets.push(tweets);
            window_users.push(users);
        }

        tweet_tables.push(Table::concat(window_tweets)?);
        user_tables.push(Table::concat(window_users)?);
    }

    let downloaded = Downloaded {
        tweets: Table::concat(tweet_tables)?,
        users: Table::concat(user_tables)?,
    };
    tracing::info!(
        candidates = candidates.len(),
        windows = windows.len(),
        tweets = downloaded.tweets.len(),
        users = downloaded.users.len(),
        "download complete"
    );
    Ok(downloaded)
}

fn empty_batch(settings: &DownloadSettings) -> Result<(Table, Table), TwitterError> {
    let (tweets, users) = reshape(
        &SearchResponse::default(),
        &settings.tweets_prefix,
        &settings.users_prefix,
    )?;
    Ok((tweets.with_constant_column(CANDIDATE_COLUMN, ""), users))
}

async fn fetch_batch(
    client: &TwitterClient,
    candidate: &CandidateQuery,
    window: &Window,
    settings: &DownloadSettings,
) -> Result<(Table, Table), TwitterError> {
    let response = client
        .search_window(
            &candidate.query,
            window,
            settings.max_results,
            settings.pages_per_window,
        )
        .await?;

    if response.tweets().is_empty() {
        tracing::error!(
            candidate = %candidate.label,
            start = %window.start_param(),
            "no tweets returned from request"
        );
    }

    let (tweets, users) = reshape(&response, &settings.tweets_prefix, &settings.users_prefix)?;
    Ok((tweets.with_constant_column(CANDIDATE_COLUMN, &candidate.label), users))
}
