//! Data layer over the NASA datasets: typed cached reads, the reactive feed
//! store with its derived aggregates, explicit refreshes and saved favorites.

pub mod derived;
pub mod favorites;
pub mod mutation;
pub mod queries;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use favorites::FavoritesStore;
pub use mutation::MutationCoordinator;
pub use queries::NasaQueries;
pub use store::{DerivedState, LoadingGuard, NeoStore};
