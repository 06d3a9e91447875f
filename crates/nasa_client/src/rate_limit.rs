//! Client-side rate limiter for the NASA API.
//!
//! api.nasa.gov allows 1000 requests/hour per key (DEMO_KEY: far fewer).

use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = GovLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Hourly request budget shared by every clone of the client.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limiter: Arc<DirectLimiter>,
}

impl RateLimiter {
    /// Create with the standard per-key limit.
    pub fn new() -> Self {
        Self::with_hourly_limit(1000)
    }

    /// Create with a custom hourly budget. The whole budget may be used as a burst.
    pub fn with_hourly_limit(requests_per_hour: u32) -> Self {
        let quota = Quota::per_hour(NonZeroU32::new(requests_per_hour).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Arc::new(GovLimiter::direct(quota)),
        }
    }

    /// Wait until a request slot is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a slot without waiting. Returns true if acquired.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_exhausted() {
        let limiter = RateLimiter::with_hourly_limit(3);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire(), "fourth request within the hour should be refused");
    }

    #[test]
    fn test_zero_limit_still_allows_one() {
        let limiter = RateLimiter::with_hourly_limit(0);
        assert!(limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_clones_share_budget() {
        let limiter = RateLimiter::with_hourly_limit(1);
        let clone = limiter.clone();
        limiter.wait().await;
        assert!(!clone.try_acquire());
    }
}
