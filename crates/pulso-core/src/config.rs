use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Credentials are optional here; each subcommand asks for the one it needs
/// via [`AppConfig::require_twitter_bearer_token`] and friends.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let non_empty = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let twitter_bearer_token = non_empty("TWITTER_BEARER_TOKEN");
    let openai_api_key = non_empty("OPENAI_API_KEY");

    let twitter_base_url = or_default("PULSO_TWITTER_BASE_URL", "https://api.twitter.com");
    let openai_base_url = or_default("PULSO_OPENAI_BASE_URL", "https://api.openai.com/v1");
    let openai_model = or_default("PULSO_OPENAI_MODEL", "gpt-3.5-turbo");

    let request_timeout_secs = parse_u64("PULSO_REQUEST_TIMEOUT_SECS", "60")?;
    let max_attempts = parse_u32("PULSO_MAX_ATTEMPTS", "5")?;
    if max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PULSO_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let retry_backoff_base_ms = parse_u64("PULSO_RETRY_BACKOFF_BASE_MS", "1000")?;
    let pace_ms = parse_u64("PULSO_PACE_MS", "1000")?;

    let data_dir = PathBuf::from(or_default("PULSO_DATA_DIR", "./data"));
    let candidates_path = PathBuf::from(or_default(
        "PULSO_CANDIDATES_PATH",
        "./config/candidates.yaml",
    ));
    let log_level = or_default("PULSO_LOG_LEVEL", "info");
    let log_dir = non_empty("PULSO_LOG_DIR").map(PathBuf::from);

    Ok(AppConfig {
        twitter_bearer_token,
        openai_api_key,
        twitter_base_url,
        openai_base_url,
        openai_model,
        request_timeout_secs,
        max_attempts,
        retry_backoff_base_ms,
        pace_ms,
        data_dir,
        candidates_path,
        log_level,
        log_dir,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
