//! `pulso enrich`: resumable classification of fetched posts.

use std::path::PathBuf;
use std::time::Duration;

use pulso_core::AppConfig;
use pulso_enrich::{CheckpointMode, FailurePolicy, MatchKey, OpenAiClassifier, RunnerSettings};

#[derive(Debug)]
pub(crate) struct EnrichOptions {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub prefix: String,
    pub match_key: MatchKey,
    pub on_failure: FailurePolicy,
    pub checkpoint: CheckpointMode,
    pub dry_run: bool,
}

fn runner_settings(config: &AppConfig, options: &EnrichOptions) -> RunnerSettings {
    let mut settings = RunnerSettings::new(
        options.input.clone().unwrap_or_else(|| config.tweets_path()),
        options.output.clone().unwrap_or_else(|| config.features_path()),
    );
    settings.prefix.clone_from(&options.prefix);
    settings.match_key = options.match_key;
    settings.on_failure = options.on_failure;
    settings.checkpoint = options.checkpoint;
    settings.pace = Duration::from_millis(config.pace_ms);
    settings
}

/// Classify every pending post, or only report the pending count on a dry run.
///
/// # Errors
///
/// Returns an error if the API key is missing, the tables cannot be read or
/// written, or the classifier becomes unavailable mid-run. Rows checkpointed
/// before the failure are kept.
pub(crate) async fn run_enrich(config: &AppConfig, options: EnrichOptions) -> anyhow::Result<()> {
    let settings = runner_settings(config, &options);

    if options.dry_run {
        let plan = pulso_enrich::plan(&settings)?;
        println!(
            "dry-run: {} of {} unique posts would be classified ({} already in {}, {} incomplete)",
            plan.work.len(),
            plan.input_records,
            plan.output.len(),
            settings.output.display(),
            plan.incomplete
        );
        return Ok(());
    }

    let api_key = config.require_openai_api_key()?;
    let classifier = OpenAiClassifier::with_base_url(
        api_key,
        &config.openai_model,
        config.request_timeout_secs,
        config.max_attempts,
        config.retry_backoff_base_ms,
        &config.openai_base_url,
    )?;
    tracing::info!(
        model = classifier.model(),
        input = %settings.input.display(),
        output = %settings.output.display(),
        "starting enrichment"
    );

    let summary = pulso_enrich::run(&classifier, &settings).await?;
    println!(
        "enrich complete: {} pending, {} classified, {} failed, {} skipped",
        summary.pending, summary.classified, summary.failed, summary.skipped
    );
    Ok(())
}
