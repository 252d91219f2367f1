#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/basket/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod memory;
pub mod provider;
pub mod symbol;
pub mod table;
pub mod yahoo;

pub use cache::{CacheStats, CachingProvider, SqliteCache};
pub use error::{DataError, Result};
pub use memory::InMemoryProvider;
pub use provider::PriceSeriesProvider;
pub use symbol::{normalize_symbol, normalize_symbols};
pub use table::PriceTable;
pub use yahoo::{YahooConfig, YahooQuoteProvider};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
