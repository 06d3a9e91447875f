//! NASA Open APIs client library.
//!
//! Provides rate-limited REST access to the daily image (APOD) and
//! near-Earth-object endpoints. No caching and no retries happen here;
//! both belong to the query layer.

pub mod api;
pub mod rate_limit;
pub mod rest;

pub use api::NasaApi;
pub use rate_limit::RateLimiter;
pub use rest::NasaRestClient;
