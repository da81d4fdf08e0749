use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
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
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Blank values count as unset so `.env` templates can leave keys empty.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = parse_usize(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("ADTROVE_ENV", "development"))?;

    let bind_addr = parse_addr("ADTROVE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("ADTROVE_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("ADTROVE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("ADTROVE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("ADTROVE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "ADTROVE_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "min connections ({db_min_connections}) exceeds max connections ({db_max_connections})"
            ),
        });
    }

    let browserless_url = or_default("ADTROVE_BROWSERLESS_URL", "http://localhost:3001");
    let browserless_token = optional("ADTROVE_BROWSERLESS_TOKEN");
    let library_url = or_default(
        "ADTROVE_LIBRARY_URL",
        "https://www.facebook.com/ads/library/",
    );
    let page_timeout_secs = parse_u64("ADTROVE_PAGE_TIMEOUT_SECS", "60")?;
    let collect_max_passes = positive_usize("ADTROVE_COLLECT_MAX_PASSES", "25")?;
    let collect_stagnant_rounds = positive_usize("ADTROVE_COLLECT_STAGNANT_ROUNDS", "3")?;
    let collect_settle_delay_ms = parse_u64("ADTROVE_COLLECT_SETTLE_DELAY_MS", "1500")?;
    let scraper_max_retries = parse_u32("ADTROVE_SCRAPER_MAX_RETRIES", "2")?;
    let scraper_retry_backoff_base_secs = parse_u64("ADTROVE_SCRAPER_RETRY_BACKOFF_BASE_SECS", "2")?;

    let ingest_url = or_default("ADTROVE_INGEST_URL", "http://localhost:3000");
    let ingest_api_key = optional("ADTROVE_INGEST_API_KEY");

    let openai_api_key = optional("OPENAI_API_KEY");
    let openai_base_url = or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
    let openai_vision_model = or_default("OPENAI_VISION_MODEL", "gpt-4o-mini");
    let enrich_timeout_secs = parse_u64("ADTROVE_ENRICH_TIMEOUT_SECS", "45")?;
    let enrich_concurrency = positive_usize("ADTROVE_ENRICH_CONCURRENCY", "1")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        browserless_url,
        browserless_token,
        library_url,
        page_timeout_secs,
        collect_max_passes,
        collect_stagnant_rounds,
        collect_settle_delay_ms,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        ingest_url,
        ingest_api_key,
        openai_api_key,
        openai_base_url,
        openai_vision_model,
        enrich_timeout_secs,
        enrich_concurrency,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ADTROVE_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
