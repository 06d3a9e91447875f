//! Reactive store for the near-Earth-object feed.
//!
//! Holds the last fetched feed plus request lifecycle flags. State changes only
//! through the four actions below; readers take snapshots or subscribe to a
//! `watch` channel. Aggregates are computed from the payload on each call.

use chrono::{DateTime, Utc};
use common::{Asteroid, NeoFeed};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::derived;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedState {
    pub payload: Option<Arc<NeoFeed>>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_fetch_at: Option<DateTime<Utc>>,
}

impl DerivedState {
    pub fn total_count(&self) -> u64 {
        derived::total_count(self.payload.as_deref())
    }

    pub fn hazardous_count(&self) -> usize {
        derived::hazardous_count(self.payload.as_deref())
    }

    pub fn date_range_label(&self) -> String {
        derived::date_range_label(self.payload.as_deref())
    }

    pub fn all_asteroids(&self) -> Vec<Asteroid> {
        derived::all_asteroids(self.payload.as_deref())
    }
}

/// Shared handle; clones observe and mutate the same state.
#[derive(Clone)]
pub struct NeoStore {
    state: Arc<watch::Sender<DerivedState>>,
}

impl Default for NeoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NeoStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(DerivedState::default());
        Self {
            state: Arc::new(tx),
        }
    }

    // ── Actions ──────────────────────────────────────────────────────

    pub fn set_loading(&self, loading: bool) {
        self.state.send_modify(|s| s.is_loading = loading);
    }

    /// Replace the payload, stamp the fetch time and clear any error.
    pub fn set_payload(&self, payload: NeoFeed) {
        let payload = Arc::new(payload);
        self.state.send_modify(|s| {
            s.payload = Some(payload);
            s.last_fetch_at = Some(Utc::now());
            s.error = None;
        });
    }

    /// Record a failure. Always ends the loading cycle.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("Feed store error: {}", message);
        self.state.send_modify(|s| {
            s.error = Some(message);
            s.is_loading = false;
        });
    }

    pub fn clear(&self) {
        self.state.send_replace(DerivedState::default());
    }

    /// Set loading until the returned guard drops, however the scope exits.
    pub fn begin_loading(&self) -> LoadingGuard<'_> {
        self.set_loading(true);
        LoadingGuard { store: self }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> DerivedState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DerivedState> {
        self.state.subscribe()
    }

    pub fn payload(&self) -> Option<Arc<NeoFeed>> {
        self.state.borrow().payload.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn last_fetch_at(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().last_fetch_at
    }

    pub fn total_count(&self) -> u64 {
        self.state.borrow().total_count()
    }

    pub fn hazardous_count(&self) -> usize {
        self.state.borrow().hazardous_count()
    }

    pub fn date_range_label(&self) -> String {
        self.state.borrow().date_range_label()
    }

    pub fn all_asteroids(&self) -> Vec<Asteroid> {
        self.state.borrow().all_asteroids()
    }
}

/// Clears the loading flag on drop.
pub struct LoadingGuard<'a> {
    store: &'a NeoStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}
