//! Keyed, TTL-based cache of asynchronous query results.
//!
//! Owns staleness/retention windows per dataset kind, retry with exponential
//! backoff, request de-duplication and invalidation.

pub mod cache;
pub mod entry;
pub mod events;
pub mod key;
pub mod policy;

pub use cache::{QueryCache, QueryResult, QueryStatus};
pub use entry::{CacheEntry, EntryState};
pub use events::{CacheEvent, CacheEventKind, KeySubscription};
pub use key::{DatasetFamily, DatasetKind, QueryKey};
pub use policy::{CachePolicy, RetryPolicy};
