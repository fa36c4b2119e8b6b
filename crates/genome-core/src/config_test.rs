use std::collections::HashMap;
use std::env::VarError;

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

/// Returns a map with all required env vars populated.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("OPENAI_API_KEY", "sk-test");
    m
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "GENOME_ENV"));
}

#[test]
fn build_app_config_fails_without_api_key() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "OPENAI_API_KEY"),
        "expected MissingEnvVar(OPENAI_API_KEY), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_api_key_as_missing() {
    let mut map: HashMap<&str, &str> = HashMap::new();
    map.insert("OPENAI_API_KEY", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
}

#[test]
fn build_app_config_succeeds_with_defaults() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).expect("config");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.provider_base_url, "https://api.openai.com/v1");
    assert_eq!(cfg.text_model, "gpt-4-turbo-preview");
    assert_eq!(cfg.image_model, "dall-e-3");
    assert_eq!(cfg.image_size, "1024x1024");
    assert_eq!(cfg.provider_timeout_secs, 60);
    assert_eq!(cfg.provider_max_retries, 2);
    assert_eq!(cfg.provider_retry_backoff_base_ms, 1000);
    assert_eq!(cfg.pipeline_max_concurrency, 4);
    assert_eq!(cfg.session_idle_timeout_secs, 1800);
    assert_eq!(cfg.intent_strategy, IntentStrategy::KeywordsThenModel);
    assert!(cfg.resolve_websites);
    assert!(cfg.mail_relay_url.is_none());
    assert!(cfg.mail_relay_token.is_none());
    assert_eq!(cfg.sender_name, "Market Genome");
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = full_env();
    map.insert("GENOME_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GENOME_BIND_ADDR"),
        "expected InvalidEnvVar(GENOME_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn pipeline_concurrency_is_clamped() {
    let mut map = full_env();
    map.insert("GENOME_PIPELINE_MAX_CONCURRENCY", "16");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.pipeline_max_concurrency, MAX_PIPELINE_CONCURRENCY);

    map.insert("GENOME_PIPELINE_MAX_CONCURRENCY", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.pipeline_max_concurrency, 1);
}

#[test]
fn pipeline_concurrency_invalid() {
    let mut map = full_env();
    map.insert("GENOME_PIPELINE_MAX_CONCURRENCY", "lots");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GENOME_PIPELINE_MAX_CONCURRENCY")
    );
}

#[test]
fn provider_timeout_zero_is_rejected() {
    let mut map = full_env();
    map.insert("GENOME_PROVIDER_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GENOME_PROVIDER_TIMEOUT_SECS")
    );
}

#[test]
fn provider_max_retries_override() {
    let mut map = full_env();
    map.insert("GENOME_PROVIDER_MAX_RETRIES", "5");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.provider_max_retries, 5);
}

#[test]
fn intent_strategy_override() {
    let mut map = full_env();
    map.insert("GENOME_INTENT_STRATEGY", "keywords");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.intent_strategy, IntentStrategy::Keywords);
}

#[test]
fn intent_strategy_invalid() {
    let mut map = full_env();
    map.insert("GENOME_INTENT_STRATEGY", "magic");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GENOME_INTENT_STRATEGY")
    );
}

#[test]
fn image_size_must_be_supported() {
    let mut map = full_env();
    map.insert("GENOME_IMAGE_SIZE", "1792x1024");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.image_size, "1792x1024");

    map.insert("GENOME_IMAGE_SIZE", "640x480");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GENOME_IMAGE_SIZE")
    );
}

#[test]
fn resolve_websites_accepts_boolean_spellings() {
    let mut map = full_env();
    map.insert("GENOME_RESOLVE_WEBSITES", "no");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(!cfg.resolve_websites);

    map.insert("GENOME_RESOLVE_WEBSITES", "maybe");
    assert!(build_app_config(lookup_from_map(&map)).is_err());
}

#[test]
fn mail_relay_settings_are_optional() {
    let mut map = full_env();
    map.insert("GENOME_MAIL_RELAY_URL", "https://relay.example.com/send");
    map.insert("GENOME_MAIL_RELAY_TOKEN", "relay-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.mail_relay_url.as_deref(),
        Some("https://relay.example.com/send")
    );
    assert_eq!(cfg.mail_relay_token.as_deref(), Some("relay-secret"));
}

#[test]
fn debug_output_redacts_secrets() {
    let mut map = full_env();
    map.insert("GENOME_MAIL_RELAY_TOKEN", "relay-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("sk-test"));
    assert!(!rendered.contains("relay-secret"));
    assert!(rendered.contains("[redacted]"));
}
