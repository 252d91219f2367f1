//! In-memory price provider.
//!
//! Serves fixed series without network access. Used by tests, demos and
//! offline runs; it follows the same alignment rules as the Yahoo adapter.

use crate::error::{DataError, Result};
use crate::provider::{PriceSeriesProvider, validate_range};
use crate::symbol::{normalize_symbol, normalize_symbols};
use crate::table::PriceTable;
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider backed by per-symbol series held in memory.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    series: BTreeMap<String, Vec<(NaiveDate, f64)>>,
    requests: AtomicUsize,
}

impl InMemoryProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the series for `symbol`.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidSymbol`] for a malformed symbol.
    pub fn with_series(mut self, symbol: &str, series: Vec<(NaiveDate, f64)>) -> Result<Self> {
        self.series.insert(normalize_symbol(symbol)?, series);
        Ok(self)
    }

    /// Add a series of consecutive calendar days starting at `start`.
    pub fn with_daily_prices(self, symbol: &str, start: NaiveDate, prices: &[f64]) -> Result<Self> {
        let series = prices
            .iter()
            .enumerate()
            .map(|(offset, price)| {
                start
                    .checked_add_days(Days::new(offset as u64))
                    .map(|date| (date, *price))
                    .ok_or_else(|| DataError::TimeConversion(format!("{start} + {offset} days")))
            })
            .collect::<Result<Vec<_>>>()?;
        self.with_series(symbol, series)
    }

    /// Number of `fetch` calls served so far, successful or not.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

impl PriceSeriesProvider for InMemoryProvider {
    async fn fetch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        validate_range(start, end)?;
        let symbols = normalize_symbols(symbols)?;

        let mut selected = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let series = self
                .series
                .get(&symbol)
                .ok_or_else(|| DataError::missing(&symbol, "unknown symbol"))?;
            let in_range: Vec<_> = series
                .iter()
                .copied()
                .filter(|(date, _)| *date >= start && *date <= end)
                .collect();
            if in_range.is_empty() {
                return Err(DataError::missing(
                    &symbol,
                    format!("no prices between {start} and {end}"),
                ));
            }
            selected.push((symbol, in_range));
        }

        tracing::debug!(symbols = selected.len(), %start, %end, "serving in-memory prices");
        PriceTable::from_series(selected)
    }
}
