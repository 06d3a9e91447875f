//! Data layer configuration types.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote API connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry/backoff applied by the query layer and refresh mutations.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Local favorites storage.
    #[serde(default)]
    pub favorites: FavoritesConfig,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL without trailing slash (e.g., "https://api.nasa.gov").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as `api_key` on every request.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Client-side request budget. api.nasa.gov allows 1000/hour per key.
    #[serde(default = "default_requests_per_hour")]
    pub requests_per_hour: u32,
}

/// Retry/backoff settings (milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Additional attempts after the first failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay after the first failed attempt; doubles per attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Ceiling for a single backoff delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesConfig {
    /// JSON file holding the saved favorites list.
    #[serde(default = "default_favorites_path")]
    pub path: String,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://api.nasa.gov".into()
}
fn default_api_key() -> String {
    "DEMO_KEY".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_requests_per_hour() -> u32 {
    1000
}

fn default_max_retries() -> u32 {
    2
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_favorites_path() -> String {
    "nasa-apod-favorites.json".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            timeout_secs: default_timeout_secs(),
            requests_per_hour: default_requests_per_hour(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            path: default_favorites_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"api": {"api_key": "abc"}}"#)
            .expect("partial config should deserialize");

        assert_eq!(cfg.api.api_key, "abc");
        assert_eq!(cfg.api.base_url, "https://api.nasa.gov");
        assert_eq!(cfg.retry.max_retries, 2);
        assert_eq!(cfg.retry.base_delay_ms, 1000);
        assert_eq!(cfg.retry.max_delay_ms, 30_000);
        assert_eq!(cfg.favorites.path, "nasa-apod-favorites.json");
    }
}
