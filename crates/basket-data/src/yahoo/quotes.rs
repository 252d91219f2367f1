//! Adjusted close data from Yahoo Finance.

use crate::error::{DataError, Result};
use crate::provider::{PriceSeriesProvider, validate_range};
use crate::symbol::{normalize_symbol, normalize_symbols};
use crate::table::PriceTable;
use chrono::{NaiveDate, NaiveTime};
use futures::stream::{self, StreamExt, TryStreamExt};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use yahoo_finance_api as yahoo;

/// Request pacing and retry settings for [`YahooQuoteProvider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YahooConfig {
    /// Pause after every successful request (default: 1s)
    pub rate_limit_delay: Duration,
    /// Retries after the first failed attempt (default: 3)
    pub max_retries: u32,
    /// Backoff before the first retry, doubled on each further retry (default: 500ms)
    pub retry_backoff: Duration,
    /// Symbols fetched concurrently within one request (default: 4)
    pub concurrency: usize,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay: Duration::from_millis(1000),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            concurrency: 4,
        }
    }
}

/// Yahoo Finance quote provider with rate limiting and retries.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    config: YahooConfig,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a provider with default pacing (1 req/sec, 3 retries).
    pub fn new() -> Result<Self> {
        Self::with_config(YahooConfig::default())
    }

    /// Create a provider with custom pacing and retry settings.
    pub fn with_config(config: YahooConfig) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            config,
        })
    }

    /// Active configuration.
    pub const fn config(&self) -> &YahooConfig {
        &self.config
    }

    /// Fetch daily closes for a single symbol.
    ///
    /// # Arguments
    /// * `symbol` - The ticker symbol (e.g., "AAPL")
    /// * `start` - First day of the range (inclusive)
    /// * `end` - Last day of the range (inclusive)
    ///
    /// # Returns
    /// A Polars DataFrame with columns: symbol, date, close, adjusted_close
    pub async fn fetch_quotes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame> {
        validate_range(start, end)?;
        let symbol = normalize_symbol(symbol)?;

        // Yahoo treats the end timestamp as exclusive
        let start_time = to_offset_date_time(start)?;
        let end_time = to_offset_date_time(end.succ_opt().unwrap_or(end))?;

        let quotes = self.quote_history(&symbol, start_time, end_time).await?;

        if quotes.is_empty() {
            return Err(DataError::missing(
                &symbol,
                "No data returned from Yahoo Finance",
            ));
        }

        let timestamps: Vec<i64> = quotes.iter().map(|q| q.timestamp as i64).collect();
        let closes: Vec<f64> = quotes.iter().map(|q| q.close).collect();
        let adj_closes: Vec<f64> = quotes.iter().map(|q| q.adjclose).collect();

        let df = DataFrame::new(vec![
            Series::new("timestamp".into(), timestamps).into(),
            Series::new("close".into(), closes).into(),
            Series::new("adjusted_close".into(), adj_closes).into(),
        ])?;

        let df = df
            .lazy()
            .with_column(lit(symbol.as_str()).alias("symbol"))
            .with_column(
                (col("timestamp") * lit(1_000_000_000))
                    .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
                    .cast(DataType::Date)
                    .alias("date"),
            )
            .select(&[
                col("symbol"),
                col("date"),
                col("close"),
                col("adjusted_close"),
            ])
            .collect()?;

        tracing::debug!(%symbol, rows = df.height(), "fetched quotes from Yahoo Finance");

        sleep(self.config.rate_limit_delay).await;

        Ok(df)
    }

    /// Run the history request, retrying failures with exponential backoff.
    async fn quote_history(
        &self,
        symbol: &str,
        start: time::OffsetDateTime,
        end: time::OffsetDateTime,
    ) -> Result<Vec<yahoo::Quote>> {
        let mut backoff = self.config.retry_backoff;
        let mut attempt = 0;

        loop {
            let result = match self.provider.get_quote_history(symbol, start, end).await {
                Ok(response) => response.quotes().map_err(DataError::from),
                Err(e) => Err(DataError::from(e)),
            };

            match result {
                Ok(quotes) => return Ok(quotes),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        %symbol,
                        attempt,
                        error = %e,
                        "Yahoo Finance request failed, retrying in {:?}",
                        backoff
                    );
                    sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl PriceSeriesProvider for YahooQuoteProvider {
    async fn fetch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable> {
        validate_range(start, end)?;
        let symbols = normalize_symbols(symbols)?;

        let frames: Vec<LazyFrame> = stream::iter(symbols)
            .map(|symbol| async move { self.fetch_quotes(&symbol, start, end).await })
            .buffered(self.config.concurrency.max(1))
            .map_ok(|df| df.lazy())
            .try_collect()
            .await?;

        let combined = concat(frames, UnionArgs::default())?.collect()?;
        PriceTable::from_frame(&combined)
    }
}

fn to_offset_date_time(date: NaiveDate) -> Result<time::OffsetDateTime> {
    let timestamp = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    time::OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| DataError::TimeConversion(e.to_string()))
}
