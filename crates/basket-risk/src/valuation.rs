//! Value and return series of a holdings basket over a price table.

use crate::error::{PortfolioError, Result};
use crate::holdings::Holdings;
use crate::metrics::{daily_returns, value_series};
use basket_data::{DataError, PriceTable};
use chrono::NaiveDate;
use ndarray::{Array1, ArrayView1};

/// Prices and daily values for one holdings basket.
///
/// Computed once and immutable afterwards. Returns are derived from the
/// values on request: `returns()?[i]` is the return from day `i` to day
/// `i + 1`, and day 0 has none.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    prices: PriceTable,
    values: Array1<f64>,
}

impl Valuation {
    /// Value `holdings` over `prices`.
    ///
    /// # Errors
    /// Returns [`PortfolioError::DataUnavailable`] for a table without
    /// trading days or without a column for a held symbol. A zero daily
    /// value is accepted here; only [`Self::returns`] rejects it.
    pub fn new(holdings: &Holdings, prices: PriceTable) -> Result<Self> {
        if prices.is_empty() {
            return Err(PortfolioError::DataUnavailable(DataError::missing(
                holdings.symbols().join(","),
                "price table has no trading days",
            )));
        }

        let values = value_series(holdings, &prices)?;

        tracing::debug!(
            positions = holdings.len(),
            days = values.len(),
            "valued holdings"
        );

        Ok(Self { prices, values })
    }

    /// The price table the series were computed from.
    pub const fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// Trading days, aligned with [`Self::values`].
    pub fn dates(&self) -> &[NaiveDate] {
        self.prices.dates()
    }

    /// Daily portfolio values.
    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    /// Daily returns from day 1 onwards.
    ///
    /// # Errors
    /// Returns [`PortfolioError::InsufficientData`] if a zero daily value
    /// leaves a return undefined.
    pub fn returns(&self) -> Result<Array1<f64>> {
        daily_returns(self.values.view())
    }

    /// Return for trading day `day`; `None` for day 0, past the end, or
    /// after a zero-value day.
    pub fn return_on(&self, day: usize) -> Option<f64> {
        let prev = *self.values.get(day.checked_sub(1)?)?;
        let value = *self.values.get(day)?;
        (prev != 0.0).then(|| (value - prev) / prev)
    }

    /// Number of trading days.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no trading days (never true for a constructed valuation).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
