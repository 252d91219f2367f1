//! Ticker symbol normalization.

use crate::error::{DataError, Result};
use std::collections::BTreeSet;

/// Normalize a raw ticker symbol.
///
/// Symbols are trimmed and upper-cased. Accepted characters are ASCII
/// alphanumerics plus `.`, `-`, `^` and `=`, which covers share classes
/// (`BRK-B`), indices (`^GSPC`) and currency pairs (`EURUSD=X`).
///
/// # Examples
///
/// ```
/// use basket_data::normalize_symbol;
///
/// assert_eq!(normalize_symbol(" brk-b ").unwrap(), "BRK-B");
/// assert!(normalize_symbol("A B").is_err());
/// ```
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim();
    if symbol.is_empty() {
        return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
    }

    if let Some(bad) = symbol
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
    {
        return Err(DataError::InvalidSymbol(format!(
            "{symbol:?} contains unsupported character {bad:?}"
        )));
    }

    Ok(symbol.to_ascii_uppercase())
}

/// Normalize and deduplicate a request's symbol list.
///
/// The result is sorted, so identical requests always reach a provider in
/// the same order.
pub fn normalize_symbols<S: AsRef<str>>(symbols: &[S]) -> Result<Vec<String>> {
    if symbols.is_empty() {
        return Err(DataError::InvalidSymbol("No symbols requested".to_string()));
    }

    let unique = symbols
        .iter()
        .map(|s| normalize_symbol(s.as_ref()))
        .collect::<Result<BTreeSet<_>>>()?;

    Ok(unique.into_iter().collect())
}
