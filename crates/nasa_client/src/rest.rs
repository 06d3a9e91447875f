//! REST client for the NASA Open APIs.
//!
//! Covers: daily image (single date and range), near-Earth-object feed and
//! details. Every method is rate-limited and issues exactly one request.

use async_trait::async_trait;
use common::config::ApiConfig;
use common::dates::normalize_date;
use common::{ApodImage, Asteroid, Error, NeoFeed};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::debug;

use crate::api::NasaApi;
use crate::rate_limit::RateLimiter;

const APOD_PATH: &str = "/planetary/apod";
const NEO_FEED_PATH: &str = "/neo/rest/v1/feed";
const NEO_DETAILS_PATH: &str = "/neo/rest/v1/neo";

type QueryParams = Vec<(&'static str, String)>;

pub(crate) fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn format_reqwest_error(err: &reqwest::Error) -> String {
    // Keep chained causes so network failures (DNS/TLS/socket) are visible.
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

fn summarize_response_body(raw: &str) -> String {
    const MAX_CHARS: usize = 500;
    let compact = raw.replace(['\n', '\r'], " ");
    match compact.char_indices().nth(MAX_CHARS) {
        Some((idx, _)) => format!("{}…", &compact[..idx]),
        None => compact,
    }
}

/// Map a non-2xx status to a remote error.
pub(crate) fn check_status(status: StatusCode) -> Result<(), Error> {
    if status.is_success() {
        return Ok(());
    }
    Err(Error::Remote {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
    })
}

pub(crate) fn daily_image_query(date: Option<&str>) -> Result<QueryParams, Error> {
    let mut query = QueryParams::new();
    if let Some(d) = date {
        query.push(("date", normalize_date(d)?));
    }
    Ok(query)
}

pub(crate) fn range_query(start: &str, end: &str) -> Result<QueryParams, Error> {
    Ok(vec![
        ("start_date", normalize_date(start)?),
        ("end_date", normalize_date(end)?),
    ])
}

pub(crate) fn feed_query(start: &str, end: &str) -> Result<QueryParams, Error> {
    let mut query = range_query(start, end)?;
    query.push(("detailed", "false".to_string()));
    Ok(query)
}

pub(crate) fn details_path(neo_id: &str) -> Result<String, Error> {
    let id = neo_id.trim();
    if id.is_empty() {
        return Err(Error::Validation("neo_id is required".into()));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Validation(format!("invalid neo_id: {id:?}")));
    }
    Ok(format!("{}/{}", NEO_DETAILS_PATH, id))
}

/// Async REST client for api.nasa.gov.
///
/// Cheap to clone; clones share the connection pool and the rate limiter.
#[derive(Debug, Clone)]
pub struct NasaRestClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: RateLimiter,
}

impl NasaRestClient {
    /// Create a client from API settings.
    pub fn new(config: &ApiConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("nasa-data/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(4)
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
            api_key: config.api_key.clone(),
            limiter: RateLimiter::with_hourly_limit(config.requests_per_hour),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL helper.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue one GET and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        mut query: QueryParams,
    ) -> Result<T, Error> {
        self.limiter.wait().await;

        // Logged before the key is attached.
        debug!("GET {}{} {:?}", self.base_url, path, query);
        query.push(("api_key", self.api_key.clone()));

        let resp = self
            .client
            .get(self.url(path))
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::Transport(format_reqwest_error(&e)))?;

        check_status(resp.status())?;

        let raw = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format_reqwest_error(&e)))?;

        serde_json::from_str(&raw).map_err(|e| {
            Error::Json(format!(
                "decoding {} response: {}; body={}",
                path,
                e,
                summarize_response_body(&raw)
            ))
        })
    }
}

#[async_trait]
impl NasaApi for NasaRestClient {
    async fn fetch_daily_image(&self, date: Option<&str>) -> Result<ApodImage, Error> {
        let query = daily_image_query(date)?;
        let image: ApodImage = self.get_json(APOD_PATH, query).await?;
        debug!("Fetched daily image {} ({})", image.date, image.title);
        Ok(image)
    }

    async fn fetch_daily_image_range(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<ApodImage>, Error> {
        let query = range_query(start, end)?;
        let images: Vec<ApodImage> = self.get_json(APOD_PATH, query).await?;
        debug!("Fetched {} daily images for {}..{}", images.len(), start, end);
        Ok(images)
    }

    async fn fetch_feed(&self, start: &str, end: &str) -> Result<NeoFeed, Error> {
        let query = feed_query(start, end)?;
        let feed: NeoFeed = self.get_json(NEO_FEED_PATH, query).await?;
        debug!(
            "Fetched NEO feed {}..{}: {} objects over {} days",
            start,
            end,
            feed.element_count,
            feed.near_earth_objects.len()
        );
        Ok(feed)
    }

    async fn fetch_details(&self, neo_id: &str) -> Result<Asteroid, Error> {
        let path = details_path(neo_id)?;
        self.get_json(&path, QueryParams::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> ApiConfig {
        ApiConfig {
            // Port 9 (discard) on loopback: nothing listens, connection is refused.
            base_url: "http://127.0.0.1:9/".into(),
            api_key: "test-key".into(),
            timeout_secs: 2,
            requests_per_hour: 100,
        }
    }

    #[test]
    fn test_base_url_normalized() {
        assert_eq!(normalize_base_url(" https://api.nasa.gov/ "), "https://api.nasa.gov");
        let client = NasaRestClient::new(&unreachable_config()).expect("client should build");
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(check_status(StatusCode::NO_CONTENT).is_ok());

        let err = check_status(StatusCode::SERVICE_UNAVAILABLE).unwrap_err();
        assert_eq!(
            err,
            Error::Remote {
                status: 503,
                status_text: "Service Unavailable".into()
            }
        );
        assert_eq!(err.to_string(), "NASA API Error: 503 - Service Unavailable");

        let err = check_status(StatusCode::TOO_MANY_REQUESTS).unwrap_err();
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn test_daily_image_query_params() {
        assert!(daily_image_query(None).unwrap().is_empty());
        assert_eq!(
            daily_image_query(Some("2024-01-05T10:00:00Z")).unwrap(),
            vec![("date", "2024-01-05".to_string())]
        );
        assert!(matches!(
            daily_image_query(Some("yesterday")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_feed_query_params() {
        let query = feed_query("2024-01-01", "2024-01-08").unwrap();
        assert_eq!(
            query,
            vec![
                ("start_date", "2024-01-01".to_string()),
                ("end_date", "2024-01-08".to_string()),
                ("detailed", "false".to_string()),
            ]
        );
        assert!(range_query("2024-01-01", "").is_err());
    }

    #[test]
    fn test_details_path() {
        assert_eq!(details_path("3542519").unwrap(), "/neo/rest/v1/neo/3542519");
        assert!(matches!(details_path("  "), Err(Error::Validation(_))));
        assert!(matches!(details_path("../apod"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_body_summary_truncates() {
        let long = "x".repeat(600);
        let summary = summarize_response_body(&long);
        assert!(summary.ends_with('…'));
        assert_eq!(summary.chars().count(), 501);
        assert_eq!(summarize_response_body("a\nb"), "a b");
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let client = NasaRestClient::new(&unreachable_config()).expect("client should build");
        let err = client.fetch_feed("", "2024-01-08").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = client.fetch_details("").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_error() {
        let client = NasaRestClient::new(&unreachable_config()).expect("client should build");
        let err = client.fetch_daily_image(None).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)), "got {err:?}");
        assert!(err.is_retryable());
    }
}
