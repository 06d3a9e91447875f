//! The query cache.
//!
//! Uses `DashMap` for the entry table and for the in-flight table. At most one
//! fetch per key runs at a time: concurrent readers attach to the shared
//! future stored under the key instead of issuing their own request.

use chrono::{DateTime, Utc};
use common::Error;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::entry::{CacheEntry, EntryState};
use crate::events::{CacheEvent, CacheEventKind, KeySubscription};
use crate::key::{DatasetFamily, QueryKey};
use crate::policy::RetryPolicy;

const EVENT_CAPACITY: usize = 256;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, Error>>>;

/// Coarse outcome of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// The key is missing a required parameter; nothing was fetched.
    Disabled,
    /// No value yet (never fetched, or first fetch still running).
    Pending,
    Success,
    /// The last fetch failed. `data` may still hold an earlier value.
    Error,
}

/// What a consumer sees for a key.
#[derive(Debug, Clone)]
pub struct QueryResult<V> {
    pub data: Option<V>,
    pub error: Option<Error>,
    pub status: QueryStatus,
    /// A fetch for this key is running (initial load or background refresh).
    pub is_fetching: bool,
    /// Wall-clock time `data` was fetched.
    pub updated_at: Option<DateTime<Utc>>,
}

impl<V> QueryResult<V> {
    pub fn disabled() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Disabled,
            is_fetching: false,
            updated_at: None,
        }
    }

    fn pending(is_fetching: bool) -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Pending,
            is_fetching,
            updated_at: None,
        }
    }

    fn success(data: V, updated_at: Option<DateTime<Utc>>, is_fetching: bool) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: QueryStatus::Success,
            is_fetching,
            updated_at,
        }
    }

    fn failed(error: Error, data: Option<V>, updated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            data,
            error: Some(error),
            status: QueryStatus::Error,
            is_fetching: false,
            updated_at,
        }
    }

    /// First load in progress: fetching with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.is_fetching && self.data.is_none()
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> QueryResult<U> {
        QueryResult {
            data: self.data.map(f),
            error: self.error,
            status: self.status,
            is_fetching: self.is_fetching,
            updated_at: self.updated_at,
        }
    }
}

struct Inner<V> {
    entries: DashMap<QueryKey, CacheEntry<V>>,
    in_flight: DashMap<QueryKey, SharedFetch<V>>,
    events: broadcast::Sender<CacheEvent>,
    retry: RetryPolicy,
}

impl<V> Inner<V> {
    fn notify(&self, key: &QueryKey, kind: CacheEventKind) {
        // No subscribers is fine.
        let _ = self.events.send(CacheEvent {
            key: key.clone(),
            kind,
        });
    }
}

/// Keyed cache of asynchronous results. Clones share the same state.
pub struct QueryCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(retry: RetryPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                in_flight: DashMap::new(),
                events,
                retry,
            }),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry
    }

    /// Read `key`, fetching through `fetcher` when needed.
    ///
    /// - fresh value: returned immediately, no fetch;
    /// - stale value: returned immediately, refetched in the background;
    /// - no value, failed or expired: fetched, and the caller waits;
    /// - disabled key: returns [`QueryStatus::Disabled`] without fetching.
    ///
    /// `fetcher` performs one attempt; retries are applied here. Fetches run
    /// as spawned tasks, so they finish even if every caller stops waiting.
    pub async fn read<F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryResult<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        if !key.is_enabled() {
            debug!("Query {} disabled, not fetching", key);
            return QueryResult::disabled();
        }

        let policy = key.policy();
        let now = Instant::now();
        self.evict_if_expired(key, now);

        let cached = self
            .inner
            .entries
            .get(key)
            .map(|e| (e.value.clone(), e.current_state(&policy, now), e.updated_at));

        match cached {
            Some((Some(value), EntryState::Fresh, updated_at)) => {
                QueryResult::success(value, updated_at, false)
            }
            Some((Some(value), EntryState::Stale | EntryState::Fetching, updated_at)) => {
                debug!("Serving stale {} while revalidating", key);
                let _ = self.start_fetch(key, fetcher);
                QueryResult::success(value, updated_at, true)
            }
            _ => {
                let outcome = self.start_fetch(key, fetcher).await;
                let (previous, updated_at) = self
                    .inner
                    .entries
                    .get(key)
                    .map(|e| (e.value.clone(), e.updated_at))
                    .unwrap_or((None, None));
                match outcome {
                    Ok(value) => QueryResult::success(value, updated_at, false),
                    Err(e) => QueryResult::failed(e, previous, updated_at),
                }
            }
        }
    }

    /// Current state of `key` without fetching.
    pub fn peek(&self, key: &QueryKey) -> QueryResult<V> {
        if !key.is_enabled() {
            return QueryResult::disabled();
        }

        let policy = key.policy();
        let now = Instant::now();
        self.evict_if_expired(key, now);

        let fetching = self.inner.in_flight.contains_key(key);
        let Some(entry) = self.inner.entries.get(key) else {
            return QueryResult::pending(fetching);
        };

        match (entry.current_state(&policy, now), entry.value.clone()) {
            (EntryState::Failed, data) => {
                let error = entry
                    .error
                    .clone()
                    .unwrap_or_else(|| Error::Other("fetch failed".into()));
                QueryResult::failed(error, data, entry.updated_at)
            }
            (_, Some(data)) => QueryResult::success(data, entry.updated_at, fetching),
            (_, None) => QueryResult::pending(fetching),
        }
    }

    /// Cached value regardless of staleness.
    pub fn get_data(&self, key: &QueryKey) -> Option<V> {
        self.evict_if_expired(key, Instant::now());
        self.inner.entries.get(key).and_then(|e| e.value.clone())
    }

    pub fn state(&self, key: &QueryKey) -> Option<EntryState> {
        let now = Instant::now();
        self.evict_if_expired(key, now);
        self.inner
            .entries
            .get(key)
            .map(|e| e.current_state(&key.policy(), now))
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.inner.in_flight.contains_key(key)
    }

    /// Mark `key` stale regardless of age. Returns false if nothing is cached.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let found = match self.inner.entries.get_mut(key) {
            Some(mut entry) => {
                entry.invalidate();
                true
            }
            None => false,
        };
        if found {
            debug!("Invalidated {}", key);
            self.inner.notify(key, CacheEventKind::Invalidated);
        }
        found
    }

    /// Mark every entry of `family` stale. Returns how many were marked.
    pub fn invalidate_family(&self, family: DatasetFamily) -> usize {
        self.invalidate_where(|key| key.family() == family)
    }

    pub fn invalidate_all(&self) -> usize {
        self.invalidate_where(|_| true)
    }

    fn invalidate_where(&self, pred: impl Fn(&QueryKey) -> bool) -> usize {
        let mut marked = Vec::new();
        for mut entry in self.inner.entries.iter_mut() {
            if pred(entry.key()) {
                entry.invalidate();
                marked.push(entry.key().clone());
            }
        }
        for key in &marked {
            self.inner.notify(key, CacheEventKind::Invalidated);
        }
        marked.len()
    }

    /// Drop `key` outright, returning its value.
    pub fn remove(&self, key: &QueryKey) -> Option<V> {
        let (_, entry) = self.inner.entries.remove(key)?;
        self.inner.notify(key, CacheEventKind::Removed);
        entry.value
    }

    /// Evict every entry past its retention window. Reads already do this
    /// lazily per key; this is only needed to reclaim memory for keys that are
    /// never read again.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut evicted = Vec::new();
        self.inner.entries.retain(|key, entry| {
            let keep = !entry.is_expired(&key.policy(), now);
            if !keep {
                evicted.push(key.clone());
            }
            keep
        });
        for key in &evicted {
            self.inner.notify(key, CacheEventKind::Evicted);
        }
        evicted.len()
    }

    /// Drop every entry. Fetches already running still complete and write back.
    pub fn clear(&self) {
        let keys: Vec<QueryKey> = self.inner.entries.iter().map(|e| e.key().clone()).collect();
        self.inner.entries.clear();
        for key in &keys {
            self.inner.notify(key, CacheEventKind::Removed);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Changes to `key` from now on.
    pub fn subscribe(&self, key: &QueryKey) -> KeySubscription {
        KeySubscription::new(key.clone(), self.inner.events.subscribe())
    }

    /// Every change in the cache.
    pub fn subscribe_all(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    fn evict_if_expired(&self, key: &QueryKey, now: Instant) {
        let policy = key.policy();
        if self
            .inner
            .entries
            .remove_if(key, |_, entry| entry.is_expired(&policy, now))
            .is_some()
        {
            debug!("Evicted expired {}", key);
            self.inner.notify(key, CacheEventKind::Evicted);
        }
    }

    /// Join the running fetch for `key`, or start one.
    fn start_fetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> SharedFetch<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, Error>> + Send + 'static,
    {
        let fetch = match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(running) => {
                debug!("Joining in-flight fetch for {}", key);
                return running.get().clone();
            }
            Entry::Vacant(slot) => {
                let fetch = run_fetch(Arc::clone(&self.inner), key.clone(), fetcher)
                    .boxed()
                    .shared();
                slot.insert(fetch.clone());
                fetch
            }
        };

        self.inner
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(key.clone()))
            .begin_fetch();
        self.inner.notify(key, CacheEventKind::FetchStarted);

        tokio::spawn(fetch.clone());
        fetch
    }
}

async fn run_fetch<V, F, Fut>(inner: Arc<Inner<V>>, key: QueryKey, fetcher: F) -> Result<V, Error>
where
    V: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, Error>> + Send + 'static,
{
    let label = key.to_string();
    debug!("Fetching {}", label);
    let result = inner.retry.run(&label, &fetcher).await;

    let kind = match &result {
        Ok(value) => {
            inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(key.clone()))
                .succeed(value.clone());
            CacheEventKind::Updated
        }
        Err(e) => {
            warn!("Query {} failed: {}", label, e);
            inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(key.clone()))
                .fail(e.clone());
            CacheEventKind::Failed
        }
    };

    // Entry first, then release the slot: a reader arriving in between sees
    // the new value rather than starting a duplicate fetch.
    inner.in_flight.remove(&key);
    inner.notify(&key, kind);
    result
}
