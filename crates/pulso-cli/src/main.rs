mod enrich;
mod fetch;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "pulso")]
#[command(about = "Collect and classify social-media mentions of election candidates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search recent posts for each candidate and write tweets.csv and users.csv
    Fetch {
        /// Start of the search range (YYYY-MM-DD or RFC 3339); overrides the candidates file
        #[arg(long)]
        start: Option<String>,

        /// End of the search range (YYYY-MM-DD or RFC 3339); overrides the candidates file
        #[arg(long)]
        end: Option<String>,

        /// Only fetch this candidate (repeatable)
        #[arg(long = "candidate")]
        candidates: Vec<String>,

        /// Results per page, 10 to 100
        #[arg(long)]
        max_results: Option<u32>,

        /// Pages to follow per one-day window
        #[arg(long)]
        pages: Option<u32>,
    },
    /// Classify every post not yet present in the features file
    Enrich {
        /// Raw tweets table [default: <data dir>/tweets.csv]
        #[arg(long)]
        input: Option<PathBuf>,

        /// Features table [default: <data dir>/tweets_gpt_features.csv]
        #[arg(long)]
        output: Option<PathBuf>,

        /// Column prefix of the tweets table and of the generated fields
        #[arg(long, default_value = "tw_")]
        prefix: String,

        /// Column deciding whether a post was already classified
        #[arg(long, value_enum, default_value = "text")]
        match_key: MatchKeyArg,

        /// What to record for a post the model could not classify
        #[arg(long, value_enum, default_value = "placeholder")]
        on_failure: FailurePolicyArg,

        /// How progress is persisted after each post
        #[arg(long, value_enum, default_value = "rewrite")]
        checkpoint: CheckpointArg,

        /// Report how many posts would be classified without calling the model
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MatchKeyArg {
    Text,
    Id,
}

impl From<MatchKeyArg> for pulso_enrich::MatchKey {
    fn from(arg: MatchKeyArg) -> Self {
        match arg {
            MatchKeyArg::Text => Self::Text,
            MatchKeyArg::Id => Self::Id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FailurePolicyArg {
    Placeholder,
    Skip,
}

impl From<FailurePolicyArg> for pulso_enrich::FailurePolicy {
    fn from(arg: FailurePolicyArg) -> Self {
        match arg {
            FailurePolicyArg::Placeholder => Self::Placeholder,
            FailurePolicyArg::Skip => Self::Skip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CheckpointArg {
    Rewrite,
    Append,
}

impl From<CheckpointArg> for pulso_enrich::CheckpointMode {
    fn from(arg: CheckpointArg) -> Self {
        match arg {
            CheckpointArg::Rewrite => Self::Rewrite,
            CheckpointArg::Append => Self::Append,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = match pulso_core::load_app_config()
        .map_err(anyhow::Error::from)
        .and_then(|config| logging::init(&config).map(|()| config))
    {
        Ok(config) => config,
        Err(e) => {
            logging::report_startup_error(&e);
            return Err(e);
        }
    };

    let result = match cli.command {
        Commands::Fetch {
            start,
            end,
            candidates,
            max_results,
            pages,
        } => {
            let options = fetch::FetchOptions {
                start,
                end,
                candidates,
                max_results,
                pages,
            };
            fetch::run_fetch(&config, options).await
        }
        Commands::Enrich {
            input,
            output,
            prefix,
            match_key,
            on_failure,
            checkpoint,
            dry_run,
        } => {
            let options = enrich::EnrichOptions {
                input,
                output,
                prefix,
                match_key: match_key.into(),
                on_failure: on_failure.into(),
                checkpoint: checkpoint.into(),
                dry_run,
            };
            enrich::run_enrich(&config, options).await
        }
    };

    if let Err(ref e) = result {
        tracing::error!("command failed: {e:#}");
    }
    result
}
