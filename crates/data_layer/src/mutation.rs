//! Explicit refreshes that bypass staleness.
//!
//! A refresh always hits the API (with the same retry policy as reads), writes
//! the result where it belongs and marks the matching cache key stale so the
//! next read picks up a fresh copy.

use common::dates::normalize_date;
use common::{ApodImage, Error, NeoFeed};
use nasa_client::NasaApi;
use query_cache::QueryKey;
use tracing::{info, warn};

use crate::queries::NasaQueries;

pub struct MutationCoordinator<A: NasaApi> {
    queries: NasaQueries<A>,
}

impl<A: NasaApi> Clone for MutationCoordinator<A> {
    fn clone(&self) -> Self {
        Self {
            queries: self.queries.clone(),
        }
    }
}

impl<A: NasaApi> MutationCoordinator<A> {
    pub fn new(queries: NasaQueries<A>) -> Self {
        Self { queries }
    }

    pub fn queries(&self) -> &NasaQueries<A> {
        &self.queries
    }

    /// Refetch the feed for `[start, end]` into the store.
    ///
    /// The store is loading for the whole call and never after it returns. On
    /// success the payload is replaced and the `neo-feed` key is invalidated;
    /// on failure the store records the error and keeps its previous payload.
    pub async fn refresh_feed(&self, start: &str, end: &str) -> Result<NeoFeed, Error> {
        let store = self.queries.store();
        let _loading = store.begin_loading();

        match self.fetch_feed(start, end).await {
            Ok((key, feed)) => {
                store.set_payload(feed.clone());
                self.queries.invalidate(&key);
                info!(
                    "Refreshed {}: {} objects, {} hazardous",
                    key,
                    feed.element_count,
                    store.hazardous_count()
                );
                Ok(feed)
            }
            Err(e) => {
                warn!("Feed refresh {}..{} failed: {}", start, end, e);
                store.set_error(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_feed(&self, start: &str, end: &str) -> Result<(QueryKey, NeoFeed), Error> {
        let start = normalize_date(start)?;
        let end = normalize_date(end)?;
        let key = QueryKey::neo_feed(Some(&start), Some(&end));

        let api = self.queries.api().as_ref();
        let (s, e) = (start.as_str(), end.as_str());
        let feed = self
            .queries
            .retry_policy()
            .run(&format!("refresh {key}"), move || api.fetch_feed(s, e))
            .await?;
        Ok((key, feed))
    }

    /// Refetch the daily image for `date` (today when `None`) and invalidate
    /// its key. Daily images have no store.
    pub async fn refresh_daily_image(&self, date: Option<&str>) -> Result<ApodImage, Error> {
        let date = date.map(normalize_date).transpose()?;
        let key = match &date {
            Some(d) => QueryKey::daily_image_by_date(Some(d)),
            None => QueryKey::daily_image(),
        };

        let api = self.queries.api().as_ref();
        let date_ref = date.as_deref();
        let result = self
            .queries
            .retry_policy()
            .run(&format!("refresh {key}"), move || api.fetch_daily_image(date_ref))
            .await;

        match result {
            Ok(image) => {
                self.queries.invalidate(&key);
                info!("Refreshed {}: {}", key, image.title);
                Ok(image)
            }
            Err(e) => {
                warn!("Daily image refresh {} failed: {}", key, e);
                Err(e)
            }
        }
    }
}
