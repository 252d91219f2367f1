//! Date-aligned adjusted close table.
//!
//! A [`PriceTable`] is the unit of exchange between price providers and the
//! valuation engine: one row per trading day, one column per symbol, dates
//! strictly ascending. Per-symbol series are aligned by inner join, so a day
//! missing for any symbol is dropped from the whole table.

use crate::error::{DataError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Adjusted close prices aligned on a common trading-day calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl PriceTable {
    /// Build a table from already aligned columns.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidPriceTable`] if dates are not strictly
    /// ascending, a column length differs from the date count, or a price is
    /// negative or non-finite.
    pub fn new(dates: Vec<NaiveDate>, columns: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(DataError::InvalidPriceTable(format!(
                "dates not strictly ascending at {} -> {}",
                pair[0], pair[1]
            )));
        }

        for (symbol, prices) in &columns {
            if prices.len() != dates.len() {
                return Err(DataError::InvalidPriceTable(format!(
                    "column {symbol} has {} prices for {} dates",
                    prices.len(),
                    dates.len()
                )));
            }
            if let Some(bad) = prices.iter().find(|p| !p.is_finite() || **p < 0.0) {
                return Err(DataError::InvalidPriceTable(format!(
                    "column {symbol} contains invalid price {bad}"
                )));
            }
        }

        Ok(Self { dates, columns })
    }

    /// Align per-symbol `(date, price)` series on their common dates.
    ///
    /// Observations with a non-finite price are discarded before alignment.
    /// Input order does not matter; duplicate dates keep the last price.
    ///
    /// # Errors
    /// Returns [`DataError::MissingData`] if a symbol has no usable
    /// observation or the symbols share no trading day.
    pub fn from_series<I, S>(series: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<(NaiveDate, f64)>)>,
        S: Into<String>,
    {
        let mut by_symbol: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for (symbol, observations) in series {
            let symbol = symbol.into();
            let clean: BTreeMap<NaiveDate, f64> = observations
                .into_iter()
                .filter(|(_, price)| price.is_finite())
                .collect();
            if clean.is_empty() {
                return Err(DataError::missing(symbol, "no usable prices in range"));
            }
            by_symbol.insert(symbol, clean);
        }

        let mut iter = by_symbol.values();
        let Some(first) = iter.next() else {
            return Err(DataError::missing("batch", "no series supplied"));
        };
        let mut common: BTreeSet<NaiveDate> = first.keys().copied().collect();
        for prices in iter {
            common.retain(|d| prices.contains_key(d));
        }

        if common.is_empty() {
            let symbols: Vec<_> = by_symbol.keys().cloned().collect();
            return Err(DataError::missing(
                symbols.join(","),
                "no trading day common to all symbols",
            ));
        }

        let dates: Vec<NaiveDate> = common.into_iter().collect();
        let columns = by_symbol
            .into_iter()
            .map(|(symbol, prices)| {
                let column = dates.iter().map(|d| prices[d]).collect();
                (symbol, column)
            })
            .collect();

        Self::new(dates, columns)
    }

    /// Build a table from a long-format frame with columns
    /// `symbol`, `date` and `adjusted_close`.
    ///
    /// Rows with a null date or price are dropped before alignment.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let symbols = df.column("symbol")?.str()?;
        let dates = df.column("date")?.cast(&DataType::Int32)?;
        let dates = dates.i32()?;
        let prices = df.column("adjusted_close")?.f64()?;

        let mut series: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for i in 0..df.height() {
            let symbol = symbols
                .get(i)
                .ok_or_else(|| DataError::Parse("Missing symbol".to_string()))?;
            let (Some(days), Some(price)) = (dates.get(i), prices.get(i)) else {
                continue;
            };
            let date = NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
                .ok_or_else(|| DataError::TimeConversion(format!("day offset {days}")))?;
            series
                .entry(symbol.to_string())
                .or_default()
                .push((date, price));
        }

        Self::from_series(series)
    }

    /// Trading days, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of trading days.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the table has no trading days.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Symbols with a column in this table, sorted.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Whether the table carries a column for `symbol`.
    pub fn contains(&self, symbol: &str) -> bool {
        self.columns.contains_key(symbol)
    }

    /// Price column for `symbol`, aligned with [`Self::dates`].
    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.columns.get(symbol).map(Vec::as_slice)
    }

    /// `(date, price)` observations for one symbol.
    pub fn series(&self, symbol: &str) -> Option<Vec<(NaiveDate, f64)>> {
        self.column(symbol)
            .map(|prices| self.dates.iter().copied().zip(prices.iter().copied()).collect())
    }

    /// Long-format frame `[symbol, date, adjusted_close]`.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let n = self.columns.len() * self.dates.len();
        let mut symbols = Vec::with_capacity(n);
        let mut dates = Vec::with_capacity(n);
        let mut prices = Vec::with_capacity(n);

        for (symbol, column) in &self.columns {
            for (date, price) in self.dates.iter().zip(column) {
                symbols.push(symbol.as_str());
                dates.push(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE);
                prices.push(*price);
            }
        }

        let df = DataFrame::new(vec![
            Series::new("symbol".into(), symbols).into(),
            Series::new("date".into(), dates).into(),
            Series::new("adjusted_close".into(), prices).into(),
        ])?
        .lazy()
        .with_column(col("date").cast(DataType::Date))
        .collect()?;

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_from_series_inner_joins_dates() {
        let table = PriceTable::from_series([
            ("AAPL", vec![(d(2), 10.0), (d(3), 11.0), (d(4), 12.0)]),
            ("TSLA", vec![(d(3), 20.0), (d(4), 21.0), (d(5), 22.0)]),
        ])
        .unwrap();

        assert_eq!(table.dates(), &[d(3), d(4)]);
        assert_eq!(table.column("AAPL").unwrap(), &[11.0, 12.0]);
        assert_eq!(table.column("TSLA").unwrap(), &[20.0, 21.0]);
        assert_eq!(table.symbols().collect::<Vec<_>>(), vec!["AAPL", "TSLA"]);
    }

    #[test]
    fn test_from_series_sorts_and_drops_non_finite() {
        let table =
            PriceTable::from_series([("GME", vec![(d(4), 3.0), (d(2), f64::NAN), (d(3), 2.0)])])
                .unwrap();

        assert_eq!(table.dates(), &[d(3), d(4)]);
        assert_eq!(table.column("GME").unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn test_from_series_disjoint_calendars() {
        let result = PriceTable::from_series([
            ("AAPL", vec![(d(2), 10.0)]),
            ("TSLA", vec![(d(3), 20.0)]),
        ]);
        assert!(matches!(result, Err(DataError::MissingData { .. })));
    }

    #[test]
    fn test_from_series_symbol_without_prices() {
        let result = PriceTable::from_series([("AAPL", vec![(d(2), f64::NAN)])]);
        assert!(matches!(
            result,
            Err(DataError::MissingData { symbol, .. }) if symbol == "AAPL"
        ));
    }

    #[test]
    fn test_new_rejects_unsorted_dates() {
        let mut columns = BTreeMap::new();
        columns.insert("AAPL".to_string(), vec![1.0, 2.0]);
        let result = PriceTable::new(vec![d(3), d(2)], columns);
        assert!(matches!(result, Err(DataError::InvalidPriceTable(_))));
    }

    #[test]
    fn test_new_rejects_negative_price() {
        let mut columns = BTreeMap::new();
        columns.insert("AAPL".to_string(), vec![1.0, -2.0]);
        let result = PriceTable::new(vec![d(2), d(3)], columns);
        assert!(matches!(result, Err(DataError::InvalidPriceTable(_))));
    }

    #[test]
    fn test_new_rejects_ragged_column() {
        let mut columns = BTreeMap::new();
        columns.insert("AAPL".to_string(), vec![1.0]);
        let result = PriceTable::new(vec![d(2), d(3)], columns);
        assert!(matches!(result, Err(DataError::InvalidPriceTable(_))));
    }

    #[test]
    fn test_frame_conversion_preserves_table() {
        let table = PriceTable::from_series([
            ("AAPL", vec![(d(2), 10.0), (d(3), 11.0)]),
            ("VOO", vec![(d(2), 400.0), (d(3), 401.5)]),
        ])
        .unwrap();

        let df = table.to_frame().unwrap();
        assert_eq!(df.height(), 4);

        let rebuilt = PriceTable::from_frame(&df).unwrap();
        assert_eq!(rebuilt, table);
        assert_eq!(rebuilt.dates()[0].day(), 2);
    }
}
