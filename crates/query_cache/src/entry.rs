//! A single cached query result with staleness tracking.

use chrono::{DateTime, Utc};
use common::Error;
use std::time::Duration;
use tokio::time::Instant;

use crate::key::QueryKey;
use crate::policy::CachePolicy;

/// Lifecycle of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Created, nothing fetched yet.
    Idle,
    /// A fetch is in flight. Any previous value is still held.
    Fetching,
    Fresh,
    /// Served as-is but refetched on next read.
    Stale,
    /// The last fetch failed after all retries. Any previous value is kept.
    Failed,
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: QueryKey,
    pub value: Option<V>,
    /// Monotonic time of the last successful fetch; drives both windows.
    pub fetched_at: Option<Instant>,
    /// Wall-clock time of the last successful fetch, for consumers.
    pub updated_at: Option<DateTime<Utc>>,
    /// Monotonic time of the last write of any kind.
    pub touched_at: Instant,
    pub state: EntryState,
    pub error: Option<Error>,
    /// Bumped by every invalidation.
    generation: u64,
    /// `generation` when the running fetch began.
    fetch_generation: u64,
}

impl<V> CacheEntry<V> {
    pub fn new(key: QueryKey) -> Self {
        Self {
            key,
            value: None,
            fetched_at: None,
            updated_at: None,
            touched_at: Instant::now(),
            state: EntryState::Idle,
            error: None,
            generation: 0,
            fetch_generation: 0,
        }
    }

    pub fn begin_fetch(&mut self) {
        self.state = EntryState::Fetching;
        self.touched_at = Instant::now();
        self.fetch_generation = self.generation;
    }

    pub fn succeed(&mut self, value: V) {
        let now = Instant::now();
        self.value = Some(value);
        self.fetched_at = Some(now);
        self.updated_at = Some(Utc::now());
        self.touched_at = now;
        self.error = None;
        // Invalidated after the fetch began: the value may predate it.
        self.state = if self.fetch_generation == self.generation {
            EntryState::Fresh
        } else {
            EntryState::Stale
        };
    }

    /// Record a failed fetch. The previous value, if any, stays servable.
    pub fn fail(&mut self, error: Error) {
        self.touched_at = Instant::now();
        self.state = EntryState::Failed;
        self.error = Some(error);
    }

    /// Mark stale regardless of age, including the result of a fetch that is
    /// already running.
    pub fn invalidate(&mut self) {
        self.state = EntryState::Stale;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Time since the last successful fetch.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.fetched_at.map(|t| now.saturating_duration_since(t))
    }

    /// Past the retention window. Entries that never held a value age from
    /// their last write.
    pub fn is_expired(&self, policy: &CachePolicy, now: Instant) -> bool {
        let since = self.fetched_at.unwrap_or(self.touched_at);
        now.saturating_duration_since(since) >= policy.expire_after
    }

    /// State with the staleness window applied: a `Fresh` entry past
    /// `stale_after` reads as `Stale`.
    pub fn current_state(&self, policy: &CachePolicy, now: Instant) -> EntryState {
        match (self.state, self.age(now)) {
            (EntryState::Fresh, Some(age)) if age >= policy.stale_after => EntryState::Stale,
            (state, _) => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_key() -> QueryKey {
        QueryKey::neo_feed(Some("2024-01-01"), Some("2024-01-08"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_turns_stale_then_expires() {
        let key = feed_key();
        let policy = key.policy();
        let mut entry = CacheEntry::new(key);
        entry.begin_fetch();
        entry.succeed(7u32);

        assert_eq!(entry.current_state(&policy, Instant::now()), EntryState::Fresh);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(entry.current_state(&policy, Instant::now()), EntryState::Fresh);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(entry.current_state(&policy, Instant::now()), EntryState::Stale);
        assert!(!entry.is_expired(&policy, Instant::now()));

        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(entry.is_expired(&policy, Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_value() {
        let key = feed_key();
        let mut entry = CacheEntry::new(key);
        entry.succeed("old");
        entry.begin_fetch();
        entry.fail(Error::Transport("offline".into()));

        assert_eq!(entry.state, EntryState::Failed);
        assert_eq!(entry.value, Some("old"));
        assert!(entry.error.is_some());
        assert!(entry.updated_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_ignores_age() {
        let key = feed_key();
        let policy = key.policy();
        let mut entry = CacheEntry::new(key);
        entry.succeed(1u8);
        entry.invalidate();

        assert_eq!(entry.current_state(&policy, Instant::now()), EntryState::Stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_during_fetch_outlives_its_result() {
        let key = feed_key();
        let policy = key.policy();
        let mut entry = CacheEntry::new(key);
        entry.begin_fetch();
        entry.invalidate();
        entry.succeed(1u8);

        assert_eq!(entry.value, Some(1));
        assert_eq!(entry.current_state(&policy, Instant::now()), EntryState::Stale);

        entry.begin_fetch();
        entry.succeed(2u8);
        assert_eq!(entry.current_state(&policy, Instant::now()), EntryState::Fresh);
    }
}
