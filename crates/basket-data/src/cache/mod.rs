//! Caching layer for price data.

pub mod provider;
pub mod sqlite;

pub use provider::CachingProvider;
pub use sqlite::{CacheStats, SqliteCache};
