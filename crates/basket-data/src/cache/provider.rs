//! Read-through cache in front of another provider.

use super::sqlite::SqliteCache;
use crate::error::{DataError, Result};
use crate::provider::{PriceSeriesProvider, validate_range};
use crate::symbol::normalize_symbols;
use crate::table::PriceTable;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::{Mutex, MutexGuard};

/// Serves symbol ranges from a [`SqliteCache`] and fetches the rest.
///
/// Each miss is its own inner request, so what lands in the cache is each
/// symbol's own calendar rather than the intersection with whatever else was
/// requested alongside it. Up to [`Self::concurrency`] misses are in flight
/// at once.
#[derive(Debug)]
pub struct CachingProvider<P> {
    inner: P,
    cache: Mutex<SqliteCache>,
    force_refresh: bool,
    concurrency: usize,
}

impl<P> CachingProvider<P> {
    /// Wrap `inner` with `cache`.
    pub const fn new(inner: P, cache: SqliteCache) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
            force_refresh: false,
            concurrency: 4,
        }
    }

    /// Number of missing symbols fetched concurrently (default: 4, minimum 1).
    pub const fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Ignore cached entries and re-fetch every symbol (results are still stored).
    pub const fn force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    /// The wrapped provider.
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteCache>> {
        self.cache
            .lock()
            .map_err(|_| DataError::Cache("cache mutex poisoned".to_string()))
    }

    fn cached(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Option<Vec<(NaiveDate, f64)>> {
        if self.force_refresh {
            return None;
        }

        let cache = self.lock().ok()?;
        match cache.has_quotes(symbol, start, end) {
            Ok(true) => cache.get_quotes(symbol, start, end).ok(),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "cache lookup failed");
                None
            }
        }
    }
}

impl<P> PriceSeriesProvider for CachingProvider<P>
where
    P: PriceSeriesProvider + Send + Sync,
{
    async fn fetch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable> {
        validate_range(start, end)?;
        let symbols = normalize_symbols(symbols)?;

        let mut series = Vec::with_capacity(symbols.len());
        let mut missing = Vec::new();
        for symbol in symbols {
            match self.cached(&symbol, start, end) {
                Some(quotes) => series.push((symbol, quotes)),
                None => missing.push(symbol),
            }
        }

        tracing::debug!(
            hits = series.len(),
            misses = missing.len(),
            %start,
            %end,
            "price cache lookup"
        );

        let fetched: Vec<(String, Vec<(NaiveDate, f64)>)> = stream::iter(missing)
            .map(|symbol| async move {
                let quotes = self.fetch_missing(&symbol, start, end).await?;
                Ok::<_, DataError>((symbol, quotes))
            })
            .buffered(self.concurrency.max(1))
            .try_collect()
            .await?;
        series.extend(fetched);

        PriceTable::from_series(series)
    }
}

impl<P> CachingProvider<P>
where
    P: PriceSeriesProvider + Send + Sync,
{
    async fn fetch_missing(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let table = self.inner.fetch(&[symbol.to_string()], start, end).await?;
        let quotes = table
            .series(symbol)
            .ok_or_else(|| DataError::missing(symbol, "provider returned no column"))?;

        let stored = self
            .lock()
            .and_then(|cache| cache.put_quotes(symbol, start, end, &quotes));
        if let Err(e) = stored {
            tracing::warn!(%symbol, error = %e, "failed to cache quotes");
        }

        Ok(quotes)
    }
}
