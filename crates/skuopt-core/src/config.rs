use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

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
/// Decoupled from the real environment so tests can feed a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_num = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let narrow = |var: &str, value: u64| -> Result<u32, ConfigError> {
        u32::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let openai_api_key = require("OPENAI_API_KEY")?;
    let supabase_url = require("SUPABASE_URL")?;
    let supabase_anon_key = require("SUPABASE_ANON_KEY")?;
    let supabase_jwt_secret = require("SUPABASE_JWT_SECRET")?;

    let env = parse_environment(&or_default("SKUOPT_ENV", "development"));

    let bind_addr = or_default("SKUOPT_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "SKUOPT_BIND_ADDR".to_string(),
            reason: e.to_string(),
        })?;
    let log_level = or_default("SKUOPT_LOG_LEVEL", "info");

    let db_max_connections = narrow(
        "SKUOPT_DB_MAX_CONNECTIONS",
        parse_num("SKUOPT_DB_MAX_CONNECTIONS", "10")?,
    )?;
    let db_min_connections = narrow(
        "SKUOPT_DB_MIN_CONNECTIONS",
        parse_num("SKUOPT_DB_MIN_CONNECTIONS", "1")?,
    )?;
    let db_acquire_timeout_secs = parse_num("SKUOPT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let openai_base_url = or_default("SKUOPT_OPENAI_BASE_URL", "https://api.openai.com/v1");
    let openai_model = or_default("SKUOPT_OPENAI_MODEL", "gpt-4o");
    let openai_timeout_secs = parse_num("SKUOPT_OPENAI_TIMEOUT_SECS", "120")?;
    let openai_max_retries = narrow(
        "SKUOPT_OPENAI_MAX_RETRIES",
        parse_num("SKUOPT_OPENAI_MAX_RETRIES", "2")?,
    )?;
    let openai_retry_backoff_base_ms = parse_num("SKUOPT_OPENAI_RETRY_BACKOFF_BASE_MS", "1000")?;

    let exempt_email_domains = parse_domain_list(&or_default(
        "SKUOPT_EXEMPT_EMAIL_DOMAINS",
        "uhuragroup.com",
    ));
    let session_cookie = or_default("SKUOPT_SESSION_COOKIE", "sb-skuopt-auth-token");
    if !is_session_cookie_name(&session_cookie) {
        return Err(ConfigError::InvalidEnvVar {
            var: "SKUOPT_SESSION_COOKIE".to_string(),
            reason: "cookie name must start with 'sb-' and end with '-auth-token'".to_string(),
        });
    }
    let static_dir = lookup("SKUOPT_STATIC_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let public_app_url = or_default("SKUOPT_PUBLIC_APP_URL", "https://skuoptimizer.ai");

    let max_body_bytes = usize::try_from(parse_num("SKUOPT_MAX_BODY_BYTES", "15728640")?)
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "SKUOPT_MAX_BODY_BYTES".to_string(),
            reason: e.to_string(),
        })?;
    let rate_limit_per_minute =
        usize::try_from(parse_num("SKUOPT_RATE_LIMIT_PER_MINUTE", "120")?).map_err(|e| {
            ConfigError::InvalidEnvVar {
                var: "SKUOPT_RATE_LIMIT_PER_MINUTE".to_string(),
                reason: e.to_string(),
            }
        })?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        openai_api_key,
        openai_base_url,
        openai_model,
        openai_timeout_secs,
        openai_max_retries,
        openai_retry_backoff_base_ms,
        supabase_url,
        supabase_anon_key,
        supabase_jwt_secret,
        exempt_email_domains,
        session_cookie,
        static_dir,
        public_app_url,
        max_body_bytes,
        rate_limit_per_minute,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Split a comma-separated domain list, dropping blanks and any leading `@`.
fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim().trim_start_matches('@').to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

/// Session cookies follow the auth provider's `sb-<ref>-auth-token` convention.
#[must_use]
pub fn is_session_cookie_name(name: &str) -> bool {
    name.starts_with("sb-") && name.ends_with("-auth-token")
}
