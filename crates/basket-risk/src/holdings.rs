//! Share counts per symbol.

use crate::error::{PortfolioError, Result};
use basket_data::normalize_symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Immutable basket of positions: symbol to signed share count.
///
/// Symbols are normalized on insert and kept sorted, so provider requests
/// built from a `Holdings` value are deterministic. Negative counts are short
/// positions. Hypothetical trades produce a new value via [`Holdings::with_trade`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Holdings {
    positions: BTreeMap<String, i64>,
}

impl Holdings {
    /// Build holdings from `(symbol, shares)` pairs.
    ///
    /// # Errors
    /// Returns [`PortfolioError::InvalidSymbol`] for a malformed symbol or
    /// one listed twice (after normalization).
    pub fn new<I, S>(positions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for (symbol, shares) in positions {
            let symbol = normalize_symbol(symbol.as_ref())?;
            if map.insert(symbol.clone(), shares).is_some() {
                return Err(PortfolioError::InvalidSymbol(format!(
                    "{symbol} listed more than once"
                )));
            }
        }
        Ok(Self { positions: map })
    }

    /// Holdings with `shares` added to `symbol`, creating the position if needed.
    ///
    /// `self` is left untouched.
    pub fn with_trade(&self, symbol: &str, shares: i64) -> Result<Self> {
        let symbol = normalize_symbol(symbol)?;
        let mut positions = self.positions.clone();
        let position = positions.entry(symbol.clone()).or_insert(0);
        *position = position
            .checked_add(shares)
            .ok_or(PortfolioError::PositionOverflow(symbol))?;
        Ok(Self { positions })
    }

    /// Shares held in `symbol`, if it is part of the basket.
    ///
    /// `symbol` is normalized first; a malformed one is never held.
    pub fn shares(&self, symbol: &str) -> Option<i64> {
        let symbol = normalize_symbol(symbol).ok()?;
        self.positions.get(&symbol).copied()
    }

    /// Held symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    /// `(symbol, shares)` pairs, sorted by symbol.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.positions.iter().map(|(s, n)| (s.as_str(), *n))
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the basket has no positions.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl fmt::Display for Holdings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .positions
            .iter()
            .map(|(symbol, shares)| format!("{symbol}={shares}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basket() -> Holdings {
        Holdings::new([("aapl", 50), ("GME", 150), ("TSLA", 5)]).unwrap()
    }

    #[test]
    fn test_new_normalizes_and_sorts() {
        let holdings = basket();
        assert_eq!(holdings.symbols(), vec!["AAPL", "GME", "TSLA"]);
        assert_eq!(holdings.shares("AAPL"), Some(50));
        assert_eq!(holdings.len(), 3);
        assert_eq!(holdings.to_string(), "AAPL=50, GME=150, TSLA=5");
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let result = Holdings::new([("AAPL", 1), ("aapl", 2)]);
        assert!(matches!(result, Err(PortfolioError::InvalidSymbol(_))));
    }

    #[test]
    fn test_new_rejects_malformed_symbol() {
        let result = Holdings::new([("", 1)]);
        assert!(matches!(result, Err(PortfolioError::InvalidSymbol(_))));
    }

    #[test]
    fn test_with_trade_existing_position() {
        let holdings = basket();
        let traded = holdings.with_trade("gme", 300).unwrap();

        assert_eq!(traded.shares("GME"), Some(450));
        assert_eq!(holdings.shares("GME"), Some(150));
    }

    #[test]
    fn test_shares_lookup_normalizes() {
        let holdings = basket();
        assert_eq!(holdings.shares("gme"), Some(150));
        assert_eq!(holdings.shares(" tsla "), Some(5));
        assert_eq!(holdings.shares("G M E"), None);
    }

    #[test]
    fn test_with_trade_new_position() {
        let holdings = basket();
        let traded = holdings.with_trade("AMZN", 1).unwrap();

        assert_eq!(traded.shares("AMZN"), Some(1));
        assert_eq!(traded.len(), 4);
        assert_eq!(holdings.shares("AMZN"), None);
    }

    #[test]
    fn test_with_trade_short() {
        let traded = basket().with_trade("TSLA", -10).unwrap();
        assert_eq!(traded.shares("TSLA"), Some(-5));
    }

    #[test]
    fn test_with_trade_overflow() {
        let holdings = Holdings::new([("AAPL", i64::MAX)]).unwrap();
        assert!(matches!(
            holdings.with_trade("AAPL", 1),
            Err(PortfolioError::PositionOverflow(_))
        ));
    }
}
