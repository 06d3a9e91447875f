//! Configuration loader: merges the .env file, config.toml and env vars.

use common::{AppConfig, Error};
use std::path::Path;

fn parse_positive_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    let parsed = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_non_negative_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    let base_url = config.api.base_url.trim();
    if base_url.is_empty() {
        issues.push("api.base_url must not be empty".into());
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        issues.push("api.base_url must start with http:// or https://".into());
    }
    if config.api.api_key.trim().is_empty() {
        issues.push("api.api_key must not be empty (DEMO_KEY works for light use)".into());
    }
    if config.api.timeout_secs == 0 {
        issues.push("api.timeout_secs must be > 0".into());
    }
    if config.api.requests_per_hour == 0 {
        issues.push("api.requests_per_hour must be > 0".into());
    }

    if config.retry.base_delay_ms == 0 {
        issues.push("retry.base_delay_ms must be > 0".into());
    }
    if config.retry.max_delay_ms < config.retry.base_delay_ms {
        issues.push("retry.max_delay_ms must be >= retry.base_delay_ms".into());
    }

    if config.favorites.path.trim().is_empty() {
        issues.push("favorites.path must not be empty".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load configuration from environment and optional config file.
pub fn load_config() -> Result<AppConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = AppConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}

fn apply_env_overrides(
    config: &mut AppConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<(), Error> {
    if let Some(key) = var("NASA_API_KEY") {
        config.api.api_key = key.trim().to_string();
    }
    if let Some(url) = var("NASA_API_BASE_URL") {
        config.api.base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(raw) = var("NASA_REQUESTS_PER_HOUR") {
        config.api.requests_per_hour = parse_positive_u32(&raw, "NASA_REQUESTS_PER_HOUR")?;
    }
    if let Some(raw) = var("NASA_MAX_RETRIES") {
        config.retry.max_retries = parse_non_negative_u32(&raw, "NASA_MAX_RETRIES")?;
    }
    if let Some(path) = var("NASA_FAVORITES_PATH") {
        config.favorites.path = path.trim().to_string();
    }
    Ok(())
}
