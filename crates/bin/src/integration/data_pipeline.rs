//! Price provider selection.
//!
//! The analysis always reads Yahoo Finance, optionally through the SQLite
//! cache. [`QuoteSource`] hides which of the two is in use.

use super::cache_manager;
use basket_data::{
    CachingProvider, DataError, PriceSeriesProvider, PriceTable, YahooConfig, YahooQuoteProvider,
};
use chrono::NaiveDate;

/// Configuration for data fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FetchConfig {
    /// Whether to use the cache.
    pub(crate) use_cache: bool,
    /// Whether to force refresh (ignore cache).
    pub(crate) force_refresh: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_refresh: false,
        }
    }
}

/// Yahoo Finance, direct or behind the price cache.
#[derive(Debug)]
pub(crate) enum QuoteSource {
    /// Every request goes to Yahoo Finance.
    Direct(YahooQuoteProvider),
    /// Requests are served from the cache where possible.
    Cached(CachingProvider<YahooQuoteProvider>),
}

impl QuoteSource {
    /// Build the provider described by `config`.
    pub(crate) fn new(config: FetchConfig, yahoo: YahooConfig) -> Result<Self, DataError> {
        let concurrency = yahoo.concurrency;
        let provider = YahooQuoteProvider::with_config(yahoo)?;
        if !config.use_cache {
            tracing::info!("price cache disabled");
            return Ok(Self::Direct(provider));
        }

        let cache = cache_manager::open_cache()?;
        Ok(Self::Cached(
            CachingProvider::new(provider, cache)
                .force_refresh(config.force_refresh)
                .concurrency(concurrency),
        ))
    }
}

impl PriceSeriesProvider for QuoteSource {
    async fn fetch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> basket_data::Result<PriceTable> {
        match self {
            Self::Direct(provider) => provider.fetch(symbols, start, end).await,
            Self::Cached(provider) => provider.fetch(symbols, start, end).await,
        }
    }
}

/// Print cache location and contents.
pub(crate) fn print_cache_info() {
    let path = cache_manager::get_cache_path();
    println!("  Cache location: {}", path.display());

    match cache_manager::open_cache().and_then(|cache| cache.get_stats()) {
        Ok(stats) => println!(
            "  Cached data: {} quotes for {} symbols ({} ranges)",
            stats.total_quotes, stats.unique_symbols, stats.cached_ranges
        ),
        Err(e) => tracing::warn!(error = %e, "failed to read cache statistics"),
    }
}
