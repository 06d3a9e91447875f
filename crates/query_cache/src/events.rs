//! Change notifications for cache entries.

use tokio::sync::broadcast;
use tracing::debug;

use crate::key::QueryKey;

/// What happened to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    FetchStarted,
    Updated,
    Failed,
    Invalidated,
    Evicted,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: QueryKey,
    pub kind: CacheEventKind,
}

/// Events for one key, filtered out of the cache-wide stream.
pub struct KeySubscription {
    key: QueryKey,
    rx: broadcast::Receiver<CacheEvent>,
}

impl KeySubscription {
    pub(crate) fn new(key: QueryKey, rx: broadcast::Receiver<CacheEvent>) -> Self {
        Self { key, rx }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Wait for the next change to this key. `None` once the cache is gone.
    ///
    /// A subscriber that falls behind skips the missed events; it should
    /// re-read the key rather than rely on seeing every transition.
    pub async fn changed(&mut self) -> Option<CacheEventKind> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.key == self.key => return Some(event.kind),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Subscriber for {} lagged by {} events", self.key, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
