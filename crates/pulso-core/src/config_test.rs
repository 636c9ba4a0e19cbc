use std::collections::HashMap;
use std::env::VarError;
use std::path::PathBuf;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn build_app_config_uses_defaults_when_env_is_empty() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();

    assert!(cfg.twitter_bearer_token.is_none());
    assert!(cfg.openai_api_key.is_none());
    assert_eq!(cfg.twitter_base_url, "https://api.twitter.com");
    assert_eq!(cfg.openai_base_url, "https://api.openai.com/v1");
    assert_eq!(cfg.openai_model, "gpt-3.5-turbo");
    assert_eq!(cfg.request_timeout_secs, 60);
    assert_eq!(cfg.max_attempts, 5);
    assert_eq!(cfg.retry_backoff_base_ms, 1000);
    assert_eq!(cfg.pace_ms, 1000);
    assert_eq!(cfg.data_dir, PathBuf::from("./data"));
    assert_eq!(
        cfg.candidates_path,
        PathBuf::from("./config/candidates.yaml")
    );
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.log_dir.is_none());
}

#[test]
fn build_app_config_reads_credentials() {
    let mut map = HashMap::new();
    map.insert("TWITTER_BEARER_TOKEN", "bearer");
    map.insert("OPENAI_API_KEY", "sk-test");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();

    assert_eq!(cfg.require_twitter_bearer_token().unwrap(), "bearer");
    assert_eq!(cfg.require_openai_api_key().unwrap(), "sk-test");
}

#[test]
fn blank_credentials_count_as_missing() {
    let mut map = HashMap::new();
    map.insert("OPENAI_API_KEY", "   ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();

    let err = cfg.require_openai_api_key().unwrap_err();
    assert!(
        matches!(err, ConfigError::MissingEnvVar(ref v) if v == "OPENAI_API_KEY"),
        "expected MissingEnvVar(OPENAI_API_KEY), got: {err:?}"
    );
}

#[test]
fn missing_bearer_token_is_reported_by_name() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let err = cfg.require_twitter_bearer_token().unwrap_err();
    assert!(err.to_string().contains("TWITTER_BEARER_TOKEN"));
}

#[test]
fn pace_override_is_parsed() {
    let mut map = HashMap::new();
    map.insert("PULSO_PACE_MS", "3000");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.pace_ms, 3000);
}

#[test]
fn invalid_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PULSO_REQUEST_TIMEOUT_SECS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PULSO_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(PULSO_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn zero_max_attempts_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PULSO_MAX_ATTEMPTS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PULSO_MAX_ATTEMPTS"),
        "expected InvalidEnvVar(PULSO_MAX_ATTEMPTS), got: {result:?}"
    );
}

#[test]
fn log_dir_is_optional_path() {
    let mut map = HashMap::new();
    map.insert("PULSO_LOG_DIR", "/var/log/pulso");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.log_dir, Some(PathBuf::from("/var/log/pulso")));
}

#[test]
fn data_paths_hang_off_data_dir() {
    let mut map = HashMap::new();
    map.insert("PULSO_DATA_DIR", "/tmp/pulso");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.tweets_path(), PathBuf::from("/tmp/pulso/tweets.csv"));
    assert_eq!(cfg.users_path(), PathBuf::from("/tmp/pulso/users.csv"));
    assert_eq!(
        cfg.features_path(),
        PathBuf::from("/tmp/pulso/tweets_gpt_features.csv")
    );
}

#[test]
fn debug_output_redacts_secrets() {
    let mut map = HashMap::new();
    map.insert("TWITTER_BEARER_TOKEN", "super-secret-bearer");
    map.insert("OPENAI_API_KEY", "sk-super-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("[redacted]"));
}
