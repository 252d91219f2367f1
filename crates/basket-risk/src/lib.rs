#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/basket/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod holdings;
pub mod metrics;
pub mod portfolio;
pub mod valuation;

pub use error::{PortfolioError, Result};
pub use holdings::Holdings;
pub use metrics::Drawdown;
pub use portfolio::{DrawdownDetail, MarginalImpact, Portfolio, PortfolioMetrics};
pub use valuation::Valuation;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
