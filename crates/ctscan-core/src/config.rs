use crate::app_config::{AppConfig, Environment};
use crate::types::LocationCoords;
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
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_coord = |var: &str, bound: f64| -> Result<Option<f64>, ConfigError> {
        let Ok(raw) = lookup(var) else {
            return Ok(None);
        };
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !value.is_finite() || value.abs() > bound {
            return Err(invalid(var, format!("must be within ±{bound}")));
        }
        Ok(Some(value))
    };

    // `API_KEY` is the legacy name and is still honoured as a fallback.
    let gemini_api_key = lookup("GEMINI_API_KEY")
        .or_else(|_| lookup("API_KEY"))
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

    let env = parse_environment(&or_default("CTSCAN_ENV", "development"));

    let bind_addr = or_default("CTSCAN_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("CTSCAN_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("CTSCAN_LOG_LEVEL", "info");

    let gemini_base_url = or_default(
        "CTSCAN_GEMINI_BASE_URL",
        "https://generativelanguage.googleapis.com/",
    );
    let gemini_model = or_default("CTSCAN_GEMINI_MODEL", "gemini-2.5-flash");

    let request_timeout_secs = parse_u64("CTSCAN_REQUEST_TIMEOUT_SECS", "60")?;
    let user_agent = or_default("CTSCAN_USER_AGENT", "ctscan/0.1 (scan-center-discovery)");
    let max_concurrent_cities = parse_usize("CTSCAN_MAX_CONCURRENT_CITIES", "4")?;

    let latitude = parse_coord("CTSCAN_LATITUDE", 90.0)?;
    let longitude = parse_coord("CTSCAN_LONGITUDE", 180.0)?;
    let location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(LocationCoords {
            latitude,
            longitude,
        }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(invalid(
                "CTSCAN_LONGITUDE",
                "must be set together with CTSCAN_LATITUDE".to_string(),
            ))
        }
        (None, Some(_)) => {
            return Err(invalid(
                "CTSCAN_LATITUDE",
                "must be set together with CTSCAN_LONGITUDE".to_string(),
            ))
        }
    };

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        gemini_api_key,
        gemini_base_url,
        gemini_model,
        request_timeout_secs,
        user_agent,
        max_concurrent_cities,
        location,
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
