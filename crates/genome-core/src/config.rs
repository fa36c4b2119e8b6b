use crate::app_config::{AppConfig, Environment, IntentStrategy};
use crate::ConfigError;

/// Facet fan-out never exceeds this many simultaneous provider calls.
pub const MAX_PIPELINE_CONCURRENCY: usize = 4;

const IMAGE_SIZES: &[&str] = &["1024x1024", "1024x1792", "1792x1024"];

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
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
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation live here, decoupled from the process environment
/// so tests can drive it with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::str::FromStr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    fn parse_as<T: FromStr>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }

    let openai_api_key = require("OPENAI_API_KEY")?;

    let env = parse_environment(&or_default("GENOME_ENV", "development"))?;
    let bind_addr: SocketAddr =
        parse_as("GENOME_BIND_ADDR", &or_default("GENOME_BIND_ADDR", "0.0.0.0:8000"))?;
    let log_level = or_default("GENOME_LOG_LEVEL", "info");

    let provider_base_url = or_default("GENOME_PROVIDER_BASE_URL", "https://api.openai.com/v1");
    let text_model = or_default("GENOME_TEXT_MODEL", "gpt-4-turbo-preview");
    let image_model = or_default("GENOME_IMAGE_MODEL", "dall-e-3");
    let image_size = parse_image_size(&or_default("GENOME_IMAGE_SIZE", "1024x1024"))?;

    let provider_timeout_secs: u64 = parse_as(
        "GENOME_PROVIDER_TIMEOUT_SECS",
        &or_default("GENOME_PROVIDER_TIMEOUT_SECS", "60"),
    )?;
    if provider_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "GENOME_PROVIDER_TIMEOUT_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let provider_max_retries: u32 = parse_as(
        "GENOME_PROVIDER_MAX_RETRIES",
        &or_default("GENOME_PROVIDER_MAX_RETRIES", "2"),
    )?;
    let provider_retry_backoff_base_ms: u64 = parse_as(
        "GENOME_PROVIDER_RETRY_BACKOFF_BASE_MS",
        &or_default("GENOME_PROVIDER_RETRY_BACKOFF_BASE_MS", "1000"),
    )?;

    let pipeline_max_concurrency = parse_as::<usize>(
        "GENOME_PIPELINE_MAX_CONCURRENCY",
        &or_default("GENOME_PIPELINE_MAX_CONCURRENCY", "4"),
    )?
    .clamp(1, MAX_PIPELINE_CONCURRENCY);

    let session_idle_timeout_secs: u64 = parse_as(
        "GENOME_SESSION_IDLE_TIMEOUT_SECS",
        &or_default("GENOME_SESSION_IDLE_TIMEOUT_SECS", "1800"),
    )?;
    let intent_strategy =
        parse_intent_strategy(&or_default("GENOME_INTENT_STRATEGY", "keywords_then_model"))?;
    let resolve_websites = parse_bool(
        "GENOME_RESOLVE_WEBSITES",
        &or_default("GENOME_RESOLVE_WEBSITES", "true"),
    )?;

    let mail_relay_url = optional("GENOME_MAIL_RELAY_URL");
    let mail_relay_token = optional("GENOME_MAIL_RELAY_TOKEN");
    let sender_email = or_default("GENOME_SENDER_EMAIL", "reports@market-genome.local");
    let sender_name = or_default("GENOME_SENDER_NAME", "Market Genome");

    Ok(AppConfig {
        openai_api_key,
        env,
        bind_addr,
        log_level,
        provider_base_url,
        text_model,
        image_model,
        image_size,
        provider_timeout_secs,
        provider_max_retries,
        provider_retry_backoff_base_ms,
        pipeline_max_concurrency,
        session_idle_timeout_secs,
        intent_strategy,
        resolve_websites,
        mail_relay_url,
        mail_relay_token,
        sender_email,
        sender_name,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GENOME_ENV".to_string(),
            reason: format!("expected development, test or production, got '{other}'"),
        }),
    }
}

fn parse_intent_strategy(s: &str) -> Result<IntentStrategy, ConfigError> {
    match s.trim() {
        "keywords" => Ok(IntentStrategy::Keywords),
        "model" => Ok(IntentStrategy::Model),
        "keywords_then_model" => Ok(IntentStrategy::KeywordsThenModel),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GENOME_INTENT_STRATEGY".to_string(),
            reason: format!("expected keywords, model or keywords_then_model, got '{other}'"),
        }),
    }
}

fn parse_image_size(s: &str) -> Result<String, ConfigError> {
    let s = s.trim();
    if IMAGE_SIZES.contains(&s) {
        Ok(s.to_string())
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: "GENOME_IMAGE_SIZE".to_string(),
            reason: format!("expected one of {}, got '{s}'", IMAGE_SIZES.join(", ")),
        })
    }
}

fn parse_bool(var: &str, s: &str) -> Result<bool, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
