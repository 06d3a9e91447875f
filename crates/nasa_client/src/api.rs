//! The remote API as seen by the query layer.

use async_trait::async_trait;
use common::{ApodImage, Asteroid, Error, NeoFeed};

/// Operations the data layer needs from the remote API.
///
/// Implemented by [`crate::NasaRestClient`]; tests substitute in-memory fakes.
/// Each call is a single request: implementations must not retry.
#[async_trait]
pub trait NasaApi: Send + Sync + 'static {
    /// Daily image for `date`, or today's when `None`.
    async fn fetch_daily_image(&self, date: Option<&str>) -> Result<ApodImage, Error>;

    /// Daily images for every date in `[start, end]`.
    async fn fetch_daily_image_range(&self, start: &str, end: &str)
        -> Result<Vec<ApodImage>, Error>;

    /// Near-Earth-object feed for `[start, end]`.
    async fn fetch_feed(&self, start: &str, end: &str) -> Result<NeoFeed, Error>;

    /// Full record for a single near-Earth object.
    async fn fetch_details(&self, neo_id: &str) -> Result<Asteroid, Error>;
}
