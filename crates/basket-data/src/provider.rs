//! The price series provider contract.

use crate::error::{DataError, Result};
use crate::table::PriceTable;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;

/// Source of historical adjusted close prices.
///
/// Implementations return one row per trading day common to every requested
/// symbol, dates ascending, over the inclusive range `[start, end]`. Days
/// missing for any symbol are dropped rather than reported; a symbol with no
/// data at all in the range is a [`DataError::MissingData`].
pub trait PriceSeriesProvider {
    /// Fetch adjusted closes for `symbols` over `[start, end]`.
    fn fetch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<PriceTable>> + Send;
}

impl<P> PriceSeriesProvider for &P
where
    P: PriceSeriesProvider + Sync,
{
    fn fetch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<PriceTable>> + Send {
        (**self).fetch(symbols, start, end)
    }
}

impl<P> PriceSeriesProvider for Arc<P>
where
    P: PriceSeriesProvider + Send + Sync,
{
    fn fetch(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<PriceTable>> + Send {
        (**self).fetch(symbols, start, end)
    }
}

/// Reject inverted date ranges.
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(DataError::InvalidDateRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}
