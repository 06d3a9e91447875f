//! Shared types, config, and error definitions for the NASA data layer.

pub mod config;
pub mod dates;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use dates::DateRange;
pub use error::Error;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
