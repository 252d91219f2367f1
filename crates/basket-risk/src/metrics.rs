//! Series construction and scalar metrics.
//!
//! Free functions over value and return series. [`crate::Portfolio`] uses
//! them for its own series and the benchmark's; they are also usable on
//! series from elsewhere.

use crate::error::{PortfolioError, Result};
use crate::holdings::Holdings;
use basket_data::{DataError, PriceTable};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Daily market value: Σ price × shares over every held symbol.
///
/// # Errors
/// Returns [`PortfolioError::DataUnavailable`] if a held symbol has no
/// column in `prices`.
pub fn value_series(holdings: &Holdings, prices: &PriceTable) -> Result<Array1<f64>> {
    let mut values = Array1::<f64>::zeros(prices.len());

    for (symbol, shares) in holdings.iter() {
        let column = prices.column(symbol).ok_or_else(|| {
            PortfolioError::DataUnavailable(DataError::missing(symbol, "no column in price table"))
        })?;
        values.scaled_add(shares as f64, &ArrayView1::from(column));
    }

    Ok(values)
}

/// Simple daily returns `(v[t] - v[t-1]) / v[t-1]` for `t >= 1`.
///
/// The first day has no return, so the result is one shorter than `values`.
///
/// # Errors
/// Returns [`PortfolioError::InsufficientData`] if a previous-day value is zero.
pub fn daily_returns(values: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
    let mut returns = Array1::<f64>::zeros(values.len().saturating_sub(1));

    for t in 1..values.len() {
        let prev = values[t - 1];
        if prev == 0.0 {
            return Err(PortfolioError::InsufficientData(format!(
                "zero value on day {} leaves the next return undefined",
                t - 1
            )));
        }
        returns[t - 1] = (values[t] - prev) / prev;
    }

    Ok(returns)
}

/// Compound average daily growth: `(v_last / v_first)^(1/N) - 1`.
///
/// `N` is the number of days in the series, not the number of intervals.
///
/// # Errors
/// Returns [`PortfolioError::InsufficientData`] for fewer than two days, a
/// zero first value, or a value that changed sign (no real root).
pub fn average_daily_return(values: ArrayView1<'_, f64>) -> Result<f64> {
    let n = values.len();
    if n < 2 {
        return Err(PortfolioError::InsufficientData(format!(
            "average daily return needs at least 2 days, got {n}"
        )));
    }

    let first = values[0];
    let last = values[n - 1];
    if first == 0.0 {
        return Err(PortfolioError::InsufficientData(
            "first portfolio value is zero".to_string(),
        ));
    }

    let growth = last / first;
    if growth < 0.0 {
        return Err(PortfolioError::InsufficientData(
            "portfolio value changed sign over the period".to_string(),
        ));
    }

    Ok(growth.powf(1.0 / n as f64) - 1.0)
}

/// Sample standard deviation (N-1 denominator) of a return series.
///
/// # Errors
/// Returns [`PortfolioError::InsufficientData`] for fewer than two returns.
pub fn sample_volatility(returns: ArrayView1<'_, f64>) -> Result<f64> {
    if returns.len() < 2 {
        return Err(PortfolioError::InsufficientData(format!(
            "volatility needs at least 2 returns, got {}",
            returns.len()
        )));
    }
    Ok(returns.std(1.0))
}

/// Ratio of portfolio volatility to benchmark volatility.
///
/// # Errors
/// Returns [`PortfolioError::DivisionByZero`] if `benchmark_volatility` is exactly zero.
pub fn risk_ratio(portfolio_volatility: f64, benchmark_volatility: f64) -> Result<f64> {
    if benchmark_volatility == 0.0 {
        return Err(PortfolioError::DivisionByZero(
            "benchmark volatility is zero".to_string(),
        ));
    }
    Ok(portfolio_volatility / benchmark_volatility)
}

/// Deepest peak-to-trough decline of a value series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
    /// Index of the peak the decline started from
    pub peak_index: usize,
    /// Index of the lowest point before the next new high
    pub trough_index: usize,
    /// Value at the peak
    pub peak_value: f64,
    /// Value at the trough
    pub trough_value: f64,
    /// Decline as a fraction of the peak value
    pub fraction: f64,
}

impl Drawdown {
    /// Absolute decline `peak - trough`.
    pub fn absolute(&self) -> f64 {
        self.peak_value - self.trough_value
    }
}

/// Locate the largest absolute drawdown in one left-to-right pass.
///
/// The running peak resets at every new high; the trough is the lowest value
/// since that reset. The reported fraction divides by the peak in force when
/// the largest decline was measured. A non-decreasing series yields a zero
/// drawdown anchored at index 0.
///
/// # Errors
/// Returns [`PortfolioError::EmptySeries`] for an empty series and
/// [`PortfolioError::DivisionByZero`] if the decline is measured from a
/// non-positive peak.
pub fn drawdown(values: ArrayView1<'_, f64>) -> Result<Drawdown> {
    let Some(&first) = values.first() else {
        return Err(PortfolioError::EmptySeries);
    };

    let (mut peak_index, mut peak) = (0, first);
    let mut trough = first;
    let mut best = Drawdown {
        peak_index: 0,
        trough_index: 0,
        peak_value: first,
        trough_value: first,
        fraction: 0.0,
    };

    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > peak {
            peak_index = i;
            peak = value;
            trough = value;
        } else if value < trough {
            trough = value;
        }

        if peak - trough > best.absolute() {
            best = Drawdown {
                peak_index,
                trough_index: i,
                peak_value: peak,
                trough_value: trough,
                fraction: 0.0,
            };
        }
    }

    if best.absolute() > 0.0 {
        if best.peak_value <= 0.0 {
            return Err(PortfolioError::DivisionByZero(
                "drawdown measured from a non-positive peak".to_string(),
            ));
        }
        best.fraction = best.absolute() / best.peak_value;
    }

    Ok(best)
}

/// Maximum drawdown as a fraction of the peak it was measured from.
pub fn max_drawdown(values: ArrayView1<'_, f64>) -> Result<f64> {
    drawdown(values).map(|d| d.fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::array;
    use rstest::rstest;

    #[test]
    fn test_value_series_weights_by_shares() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        let prices = PriceTable::from_series([
            ("AAPL", vec![(start, 10.0), (start.succ_opt().unwrap(), 12.0)]),
            ("GME", vec![(start, 2.0), (start.succ_opt().unwrap(), 1.0)]),
        ])
        .unwrap();
        let holdings = Holdings::new([("AAPL", 3), ("GME", -5)]).unwrap();

        let values = value_series(&holdings, &prices).unwrap();
        assert_eq!(values, array![20.0, 31.0]);
    }

    #[test]
    fn test_value_series_missing_column() {
        let prices = PriceTable::from_series([(
            "AAPL",
            vec![(NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(), 1.0)],
        )])
        .unwrap();
        let holdings = Holdings::new([("TSLA", 1)]).unwrap();

        let result = value_series(&holdings, &prices);
        assert!(matches!(result, Err(PortfolioError::DataUnavailable(_))));
    }

    #[test]
    fn test_daily_returns() {
        let returns = daily_returns(array![100.0, 110.0, 99.0].view()).unwrap();
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_daily_returns_short_series() {
        assert!(daily_returns(array![42.0].view()).unwrap().is_empty());
        assert!(daily_returns(Array1::<f64>::zeros(0).view()).unwrap().is_empty());
    }

    #[test]
    fn test_daily_returns_zero_value() {
        let result = daily_returns(array![100.0, 0.0, 50.0].view());
        assert!(matches!(result, Err(PortfolioError::InsufficientData(_))));
    }

    #[test]
    fn test_average_daily_return_uses_day_count() {
        // 4 days, doubling: 2^(1/4) - 1
        let adr = average_daily_return(array![100.0, 130.0, 170.0, 200.0].view()).unwrap();
        assert_relative_eq!(adr, 2f64.powf(0.25) - 1.0, epsilon = 1e-12);
    }

    #[rstest]
    #[case(array![100.0])]
    #[case(array![0.0, 10.0])]
    #[case(array![10.0, -10.0])]
    fn test_average_daily_return_insufficient(#[case] values: Array1<f64>) {
        let result = average_daily_return(values.view());
        assert!(matches!(result, Err(PortfolioError::InsufficientData(_))));
    }

    #[test]
    fn test_sample_volatility() {
        // mean 0.02, squared deviations 0.0004 + 0.0004 + 0 = 0.0008, / (3 - 1)
        let vol = sample_volatility(array![0.0, 0.04, 0.02].view()).unwrap();
        assert_relative_eq!(vol, 0.0004f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_sample_volatility_single_return() {
        let result = sample_volatility(array![0.01].view());
        assert!(matches!(result, Err(PortfolioError::InsufficientData(_))));
    }

    #[test]
    fn test_risk_ratio() {
        assert_relative_eq!(risk_ratio(0.03, 0.015).unwrap(), 2.0);
        assert!(matches!(
            risk_ratio(0.03, 0.0),
            Err(PortfolioError::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_drawdown_reference_series() {
        let dd = drawdown(array![100.0, 80.0, 120.0, 60.0].view()).unwrap();
        assert_eq!(dd.peak_index, 2);
        assert_eq!(dd.trough_index, 3);
        assert_relative_eq!(dd.absolute(), 60.0);
        assert_relative_eq!(dd.fraction, 0.5);
    }

    #[test]
    fn test_drawdown_uses_peak_in_force() {
        // 50 from 200 beats 40 from 100 in absolute terms
        let dd = drawdown(array![100.0, 60.0, 200.0, 150.0, 180.0].view()).unwrap();
        assert_relative_eq!(dd.absolute(), 50.0);
        assert_relative_eq!(dd.fraction, 0.25);
        assert_eq!((dd.peak_index, dd.trough_index), (2, 3));
    }

    #[test]
    fn test_drawdown_trough_keeps_lowest_since_peak() {
        let dd = drawdown(array![100.0, 70.0, 90.0, 80.0].view()).unwrap();
        assert_relative_eq!(dd.fraction, 0.3);
        assert_eq!(dd.trough_index, 1);
    }

    #[rstest]
    #[case(array![1.0, 2.0, 3.0, 4.0])]
    #[case(array![5.0, 5.0, 5.0])]
    #[case(array![7.0])]
    fn test_drawdown_non_decreasing(#[case] values: Array1<f64>) {
        assert_eq!(max_drawdown(values.view()).unwrap(), 0.0);
    }

    #[test]
    fn test_drawdown_empty() {
        let result = max_drawdown(Array1::<f64>::zeros(0).view());
        assert!(matches!(result, Err(PortfolioError::EmptySeries)));
    }
}
