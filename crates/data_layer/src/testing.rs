//! In-memory `NasaApi` and payload builders for tests.

use async_trait::async_trait;
use common::{ApodImage, Asteroid, DailyApproaches, Error, NeoFeed};
use nasa_client::NasaApi;
use serde_json::Map;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn asteroid(id: &str, hazardous: bool) -> Asteroid {
    Asteroid {
        id: id.to_string(),
        name: format!("({id})"),
        is_potentially_hazardous_asteroid: hazardous,
        approach_date: None,
        extra: Map::new(),
    }
}

pub fn feed(buckets: Vec<(&str, Vec<Asteroid>)>) -> NeoFeed {
    let element_count = buckets.iter().map(|(_, a)| a.len() as u64).sum();
    NeoFeed {
        element_count,
        near_earth_objects: buckets.into_iter().collect::<DailyApproaches>(),
        extra: Map::new(),
    }
}

pub fn image(date: &str) -> ApodImage {
    ApodImage {
        date: date.to_string(),
        title: format!("Image of {date}"),
        explanation: String::new(),
        url: Some(format!("https://apod.nasa.gov/apod/{date}.jpg")),
        hdurl: None,
        media_type: Some("image".into()),
        copyright: None,
        extra: Map::new(),
    }
}

pub fn unavailable() -> Error {
    Error::Remote {
        status: 503,
        status_text: "Service Unavailable".into(),
    }
}

/// Scripted API: counts calls per endpoint and fails the first
/// `failures` calls (any endpoint) with a 503.
pub struct FakeApi {
    pub feed_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    pub range_calls: AtomicUsize,
    pub details_calls: AtomicUsize,
    failures: AtomicUsize,
    feed: NeoFeed,
    delay: Duration,
}

impl FakeApi {
    pub fn new(feed: NeoFeed) -> Self {
        Self {
            feed_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            range_calls: AtomicUsize::new(0),
            details_calls: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            feed,
            delay: Duration::ZERO,
        }
    }

    /// Every call takes `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_next(&self, calls: usize) {
        self.failures.store(calls, Ordering::SeqCst);
    }

    pub fn feed_calls(&self) -> usize {
        self.feed_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, counter: &AtomicUsize) -> Result<(), Error> {
        counter.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NasaApi for FakeApi {
    async fn fetch_daily_image(&self, date: Option<&str>) -> Result<ApodImage, Error> {
        self.respond(&self.image_calls).await?;
        Ok(image(date.unwrap_or("2024-01-05")))
    }

    async fn fetch_daily_image_range(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<ApodImage>, Error> {
        self.respond(&self.range_calls).await?;
        Ok(vec![image(start), image(end)])
    }

    async fn fetch_feed(&self, _start: &str, _end: &str) -> Result<NeoFeed, Error> {
        self.respond(&self.feed_calls).await?;
        Ok(self.feed.clone())
    }

    async fn fetch_details(&self, neo_id: &str) -> Result<Asteroid, Error> {
        self.respond(&self.details_calls).await?;
        Ok(asteroid(neo_id, false))
    }
}
