//! `pulso fetch`: windowed search for every configured candidate.

use anyhow::Context;
use pulso_core::candidates::{CandidateConfig, MAX_RESULTS_RANGE};
use pulso_core::AppConfig;
use pulso_twitter::{
    download, generate_windows, parse_bound, CandidateQuery, DownloadSettings, TwitterClient,
};

#[derive(Debug, Default)]
pub(crate) struct FetchOptions {
    pub start: Option<String>,
    pub end: Option<String>,
    pub candidates: Vec<String>,
    pub max_results: Option<u32>,
    pub pages: Option<u32>,
}

/// Download every selected candidate and write `tweets.csv` and `users.csv`.
///
/// All inputs are validated before the first request. Files are written once,
/// after the whole download succeeds.
///
/// # Errors
///
/// Returns an error for invalid bounds or options, a missing bearer token,
/// any search failure, or a failed write.
pub(crate) async fn run_fetch(config: &AppConfig, options: FetchOptions) -> anyhow::Result<()> {
    let file = pulso_core::load_candidates(&config.candidates_path)
        .with_context(|| format!("loading {}", config.candidates_path.display()))?;
    let defaults = &file.fetch;

    let start = options
        .start
        .or_else(|| defaults.start.clone())
        .context("no start bound: pass --start or set fetch.start")?;
    let end = options
        .end
        .or_else(|| defaults.end.clone())
        .context("no end bound: pass --end or set fetch.end")?;
    let windows = generate_windows(parse_bound(&start)?, parse_bound(&end)?)?;

    let max_results = options.max_results.unwrap_or(defaults.max_results);
    if !MAX_RESULTS_RANGE.contains(&max_results) {
        anyhow::bail!(
            "--max-results must be within {}..={}, got {max_results}",
            MAX_RESULTS_RANGE.start(),
            MAX_RESULTS_RANGE.end()
        );
    }
    let pages_per_window = options.pages.unwrap_or(defaults.pages_per_window);
    if pages_per_window == 0 {
        anyhow::bail!("--pages must be at least 1");
    }

    let candidates = select_candidates(&file.candidates, &options.candidates)?;
    let token = config.require_twitter_bearer_token()?;
    let client = TwitterClient::with_base_url(
        token,
        config.request_timeout_secs,
        config.max_attempts,
        config.retry_backoff_base_ms,
        &config.twitter_base_url,
    )?;

    tracing::info!(
        candidates = candidates.len(),
        windows = windows.len(),
        max_results,
        pages_per_window,
        "starting download"
    );

    let settings = DownloadSettings {
        max_results,
        pages_per_window,
        tweets_prefix: defaults.tweets_prefix.clone(),
        users_prefix: defaults.users_prefix.clone(),
    };
    let downloaded = download(&client, &candidates, &windows, &settings).await?;

    let tweets_path = config.tweets_path();
    let users_path = config.users_path();
    downloaded.tweets.write_csv(&tweets_path)?;
    downloaded.users.write_csv(&users_path)?;

    println!(
        "fetched {} tweets ({} users) -> {}, {}",
        downloaded.tweets.len(),
        downloaded.users.len(),
        tweets_path.display(),
        users_path.display()
    );
    Ok(())
}

/// Candidates to search, in file order. An empty filter selects all of them.
fn select_candidates(
    configured: &[CandidateConfig],
    filter: &[String],
) -> anyhow::Result<Vec<CandidateQuery>> {
    if let Some(unknown) = filter
        .iter()
        .find(|f| !configured.iter().any(|c| c.name.eq_ignore_ascii_case(f)))
    {
        anyhow::bail!("candidate '{unknown}' is not in the candidates file");
    }

    Ok(configured
        .iter()
        .filter(|c| filter.is_empty() || filter.iter().any(|f| c.name.eq_ignore_ascii_case(f)))
        .map(|c| CandidateQuery {
            label: c.name.clone(),
            query: c.search_query().to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Vec<CandidateConfig> {
        vec![
            CandidateConfig {
                name: "sandra torres".to_string(),
                query: None,
            },
            CandidateConfig {
                name: "zury ríos".to_string(),
                query: Some("\"zury ríos\"".to_string()),
            },
        ]
    }

    #[test]
    fn empty_filter_selects_all_in_file_order() {
        let selected = select_candidates(&configured(), &[]).unwrap();
        let labels: Vec<&str> = selected.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["sandra torres", "zury ríos"]);
        assert_eq!(selected[1].query, "\"zury ríos\"");
    }

    #[test]
    fn filter_matches_case_insensitively() {
        let selected = select_candidates(&configured(), &["Sandra Torres".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].label, "sandra torres");
    }

    #[test]
    fn unknown_candidate_is_rejected() {
        let err = select_candidates(&configured(), &["nadie".to_string()]).unwrap_err();
        assert!(err.to_string().contains("nadie"));
    }
}
