//! Cache manager for market data.
//!
//! Locates the SQLite price cache in a platform-specific directory, or in
//! `$BASKET_CACHE_DIR` when that is set.

use basket_data::{DataError, SqliteCache};
use std::path::PathBuf;

/// Environment variable overriding the cache directory.
pub(crate) const CACHE_DIR_ENV: &str = "BASKET_CACHE_DIR";

/// Get the default cache directory path.
///
/// Uses platform-specific cache directories:
/// - Linux: `~/.cache/basket/`
/// - macOS: `~/Library/Caches/basket/`
/// - Windows: `%LOCALAPPDATA%\basket\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("basket")
}

/// Cache directory, honoring `$BASKET_CACHE_DIR`.
pub(crate) fn cache_dir() -> PathBuf {
    resolve_cache_dir(std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from))
}

fn resolve_cache_dir(override_dir: Option<PathBuf>) -> PathBuf {
    override_dir
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(default_cache_dir)
}

/// Get the configured cache database path.
pub(crate) fn get_cache_path() -> PathBuf {
    cache_dir().join("basket.db")
}

/// Open the cache, creating the directory if needed.
pub(crate) fn open_cache() -> Result<SqliteCache, DataError> {
    let cache_path = get_cache_path();

    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!(path = %cache_path.display(), "opening price cache");
    SqliteCache::new(&cache_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let dir = resolve_cache_dir(Some(PathBuf::from("/tmp/basket-test")));
        assert_eq!(dir, PathBuf::from("/tmp/basket-test"));
    }

    #[test]
    fn test_empty_override_ignored() {
        assert_eq!(resolve_cache_dir(Some(PathBuf::new())), default_cache_dir());
        assert_eq!(resolve_cache_dir(None), default_cache_dir());
    }

    #[test]
    fn test_default_dir_is_namespaced() {
        assert!(default_cache_dir().ends_with("basket"));
    }
}
