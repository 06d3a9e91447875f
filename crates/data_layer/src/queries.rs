//! Typed reads over the NASA datasets.
//!
//! One `QueryCache` per payload shape, all sharing the same API handle. Feed
//! reads also project every network attempt into the [`NeoStore`].

use chrono::NaiveDate;
use common::dates::{current_week_range, normalize_date};
use common::{ApodImage, Asteroid, Error, NeoFeed};
use nasa_client::NasaApi;
use query_cache::{
    DatasetFamily, DatasetKind, KeySubscription, QueryCache, QueryKey, QueryResult, RetryPolicy,
};
use std::future::Future;
use std::sync::Arc;

use crate::store::NeoStore;

/// Normalized form for cache keys. Unparseable input is kept (trimmed) so the
/// client reports the validation error.
fn key_date(raw: Option<&str>) -> Option<String> {
    raw.map(|d| normalize_date(d).unwrap_or_else(|_| d.trim().to_string()))
}

pub struct NasaQueries<A: NasaApi> {
    api: Arc<A>,
    images: QueryCache<ApodImage>,
    image_ranges: QueryCache<Vec<ApodImage>>,
    feeds: QueryCache<NeoFeed>,
    details: QueryCache<Asteroid>,
    store: NeoStore,
}

impl<A: NasaApi> Clone for NasaQueries<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            images: self.images.clone(),
            image_ranges: self.image_ranges.clone(),
            feeds: self.feeds.clone(),
            details: self.details.clone(),
            store: self.store.clone(),
        }
    }
}

impl<A: NasaApi> NasaQueries<A> {
    pub fn new(api: Arc<A>, retry: RetryPolicy) -> Self {
        Self::with_store(api, retry, NeoStore::new())
    }

    pub fn with_store(api: Arc<A>, retry: RetryPolicy, store: NeoStore) -> Self {
        Self {
            api,
            images: QueryCache::new(retry),
            image_ranges: QueryCache::new(retry),
            feeds: QueryCache::new(retry),
            details: QueryCache::new(retry),
            store,
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn store(&self) -> &NeoStore {
        &self.store
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.feeds.retry_policy()
    }

    pub fn image_cache(&self) -> &QueryCache<ApodImage> {
        &self.images
    }

    pub fn image_range_cache(&self) -> &QueryCache<Vec<ApodImage>> {
        &self.image_ranges
    }

    pub fn feed_cache(&self) -> &QueryCache<NeoFeed> {
        &self.feeds
    }

    pub fn details_cache(&self) -> &QueryCache<Asteroid> {
        &self.details
    }

    /// Build a fetcher that calls `op` with a fresh handle to the API.
    fn fetcher<T, F, Fut>(&self, op: F) -> impl Fn() -> Fut + Send + Sync + 'static
    where
        F: Fn(Arc<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let api = Arc::clone(&self.api);
        move || op(Arc::clone(&api))
    }

    pub async fn today_image(&self) -> QueryResult<ApodImage> {
        let fetch = self.fetcher(|api| async move { api.fetch_daily_image(None).await });
        self.images.read(&QueryKey::daily_image(), fetch).await
    }

    /// Disabled (no call) while `date` is `None`.
    pub async fn image_by_date(&self, date: Option<&str>) -> QueryResult<ApodImage> {
        let date = key_date(date);
        let key = QueryKey::daily_image_by_date(date.as_deref());
        let date = date.unwrap_or_default();
        let fetch = self.fetcher(move |api| {
            let date = date.clone();
            async move { api.fetch_daily_image(Some(&date)).await }
        });
        self.images.read(&key, fetch).await
    }

    pub async fn image_range(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> QueryResult<Vec<ApodImage>> {
        let (start, end) = (key_date(start), key_date(end));
        let key = QueryKey::daily_image_range(start.as_deref(), end.as_deref());
        let (start, end) = (start.unwrap_or_default(), end.unwrap_or_default());
        let fetch = self.fetcher(move |api| {
            let (start, end) = (start.clone(), end.clone());
            async move { api.fetch_daily_image_range(&start, &end).await }
        });
        self.image_ranges.read(&key, fetch).await
    }

    /// Feed for `[start, end]`. Each network attempt drives the store:
    /// loading while in flight, then the payload or the error message.
    pub async fn neo_feed(&self, start: Option<&str>, end: Option<&str>) -> QueryResult<NeoFeed> {
        let (start, end) = (key_date(start), key_date(end));
        let key = QueryKey::neo_feed(start.as_deref(), end.as_deref());
        let (start, end) = (start.unwrap_or_default(), end.unwrap_or_default());
        let store = self.store.clone();
        let fetch = self.fetcher(move |api| {
            let (start, end) = (start.clone(), end.clone());
            let store = store.clone();
            async move {
                let _loading = store.begin_loading();
                match api.fetch_feed(&start, &end).await {
                    Ok(feed) => {
                        store.set_payload(feed.clone());
                        Ok(feed)
                    }
                    Err(e) => {
                        store.set_error(e.to_string());
                        Err(e)
                    }
                }
            }
        });
        self.feeds.read(&key, fetch).await
    }

    /// Feed for `[today, today + 7]`.
    pub async fn current_week_neo_feed(&self, today: NaiveDate) -> QueryResult<NeoFeed> {
        let range = current_week_range(today);
        self.neo_feed(Some(&range.start_date), Some(&range.end_date))
            .await
    }

    pub async fn neo_details(&self, neo_id: Option<&str>) -> QueryResult<Asteroid> {
        let neo_id = neo_id.map(str::trim);
        let key = QueryKey::neo_details(neo_id);
        let neo_id = neo_id.unwrap_or_default().to_string();
        let fetch = self.fetcher(move |api| {
            let neo_id = neo_id.clone();
            async move { api.fetch_details(&neo_id).await }
        });
        self.details.read(&key, fetch).await
    }

    /// Mark `key` stale in whichever cache holds its kind.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match key.kind() {
            DatasetKind::DailyImage | DatasetKind::DailyImageByDate => self.images.invalidate(key),
            DatasetKind::DailyImageRange => self.image_ranges.invalidate(key),
            DatasetKind::NeoFeed => self.feeds.invalidate(key),
            DatasetKind::NeoDetails => self.details.invalidate(key),
        }
    }

    pub fn invalidate_family(&self, family: DatasetFamily) -> usize {
        match family {
            DatasetFamily::Apod => {
                self.images.invalidate_family(family) + self.image_ranges.invalidate_family(family)
            }
            DatasetFamily::Neo => {
                self.feeds.invalidate_family(family) + self.details.invalidate_family(family)
            }
        }
    }

    /// Changes to `key` in whichever cache holds its kind.
    pub fn subscribe(&self, key: &QueryKey) -> KeySubscription {
        match key.kind() {
            DatasetKind::DailyImage | DatasetKind::DailyImageByDate => self.images.subscribe(key),
            DatasetKind::DailyImageRange => self.image_ranges.subscribe(key),
            DatasetKind::NeoFeed => self.feeds.subscribe(key),
            DatasetKind::NeoDetails => self.details.subscribe(key),
        }
    }

    /// Drop expired entries from every cache.
    pub fn evict_expired(&self) -> usize {
        self.images.evict_expired()
            + self.image_ranges.evict_expired()
            + self.feeds.evict_expired()
            + self.details.evict_expired()
    }
}
