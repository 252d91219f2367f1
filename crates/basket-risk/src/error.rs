//! Portfolio engine errors.

use basket_data::DataError;
use chrono::NaiveDate;
use thiserror::Error;

/// Result type for portfolio operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Errors raised by portfolio construction and metric evaluation.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// Start date after end date
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange {
        /// Requested start date
        start: NaiveDate,
        /// Requested end date
        end: NaiveDate,
    },

    /// Portfolio constructed without holdings
    #[error("Portfolio has no holdings")]
    EmptyPortfolio,

    /// Malformed ticker symbol
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// The provider could not supply the requested prices
    #[error("Price data unavailable: {0}")]
    DataUnavailable(#[source] DataError),

    /// Too few observations, or a zero value in a denominator
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A ratio's denominator was exactly zero
    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    /// Drawdown requested over an empty value series
    #[error("Value series is empty")]
    EmptySeries,

    /// A share count left the representable range
    #[error("Position overflow: {0}")]
    PositionOverflow(String),

    /// A marginal impact was committed to a portfolio it was not computed for
    #[error("Marginal impact was computed against different holdings")]
    StaleImpact,
}

impl From<DataError> for PortfolioError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::InvalidSymbol(msg) => Self::InvalidSymbol(msg),
            other => Self::DataUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_mapping() {
        let err: PortfolioError = DataError::missing("GME", "no rows").into();
        assert!(matches!(err, PortfolioError::DataUnavailable(_)));
        assert!(err.to_string().contains("GME"));

        let err: PortfolioError = DataError::InvalidSymbol("A B".to_string()).into();
        assert!(matches!(err, PortfolioError::InvalidSymbol(_)));
    }
}
