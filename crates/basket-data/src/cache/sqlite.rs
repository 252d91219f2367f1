//! SQLite caching layer for adjusted close prices.

use crate::error::{DataError, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// SQLite cache for adjusted close prices.
///
/// Besides the prices themselves the cache records every date range it was
/// filled for, so a lookup can tell "no trading on that day" apart from
/// "never fetched".
#[derive(Debug)]
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Open (or create) a cache database.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS quotes (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                adjusted_close REAL NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (symbol, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_quotes_symbol_date ON quotes(symbol, date)",
            [],
        )?;

        // Ranges the quotes table is known to be complete for
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS quote_ranges (
                symbol TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (symbol, start_date, end_date)
            )",
            [],
        )?;

        Ok(())
    }

    /// Check whether a single fetched range covers `[start, end]` for `symbol`.
    pub fn has_quotes(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM quote_ranges
             WHERE symbol = ?1 AND start_date <= ?2 AND end_date >= ?3",
            params![symbol, start.to_string(), end.to_string()],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// Get cached `(date, adjusted_close)` observations, dates ascending.
    ///
    /// # Errors
    /// Returns [`DataError::MissingData`] when nothing is cached in range.
    pub fn get_quotes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, adjusted_close
             FROM quotes
             WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(params![symbol, start.to_string(), end.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut quotes = Vec::new();
        for row in rows {
            let (date, adj_close) = row?;
            let date = date
                .parse::<NaiveDate>()
                .map_err(|e| DataError::Parse(format!("cached date {date:?}: {e}")))?;
            quotes.push((date, adj_close));
        }

        if quotes.is_empty() {
            return Err(DataError::missing(symbol, "No cached data found"));
        }

        Ok(quotes)
    }

    /// Store the observations fetched for `[start, end]` and mark the range covered.
    ///
    /// Replaces everything cached for `symbol`. Adjusted closes are re-based
    /// after splits and dividends, so rows from an earlier fetch must never be
    /// served next to rows from this one.
    pub fn put_quotes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        quotes: &[(NaiveDate, f64)],
    ) -> Result<()> {
        let cached_at = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM quotes WHERE symbol = ?1", params![symbol])?;
        tx.execute("DELETE FROM quote_ranges WHERE symbol = ?1", params![symbol])?;

        for (date, adj_close) in quotes {
            tx.execute(
                "INSERT INTO quotes (symbol, date, adjusted_close, cached_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![symbol, date.to_string(), adj_close, cached_at],
            )?;
        }

        tx.execute(
            "INSERT INTO quote_ranges (symbol, start_date, end_date, cached_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![symbol, start.to_string(), end.to_string(), cached_at],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Clear all cached data.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM quotes", [])?;
        self.conn.execute("DELETE FROM quote_ranges", [])?;
        Ok(())
    }

    /// Clear cached data for a specific symbol.
    pub fn clear_symbol(&self, symbol: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM quotes WHERE symbol = ?1", params![symbol])?;
        self.conn
            .execute("DELETE FROM quote_ranges WHERE symbol = ?1", params![symbol])?;
        Ok(())
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let quotes_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;

        let symbols_count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT symbol) FROM quotes", [], |row| {
                    row.get(0)
                })?;

        let ranges_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM quote_ranges", [], |row| row.get(0))?;

        Ok(CacheStats {
            total_quotes: quotes_count as usize,
            unique_symbols: symbols_count as usize,
            cached_ranges: ranges_count as usize,
        })
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of quote records
    pub total_quotes: usize,
    /// Number of unique symbols
    pub unique_symbols: usize,
    /// Number of recorded fetch ranges
    pub cached_ranges: usize,
}
