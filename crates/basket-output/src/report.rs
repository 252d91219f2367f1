//! Portfolio analysis reports.

use basket_risk::{MarginalImpact, PortfolioMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The builder was not given portfolio metrics.
    #[error("Report has no portfolio metrics")]
    MissingMetrics,
}

/// Format a fraction as a percentage rounded to three decimals.
pub fn format_percent(fraction: f64) -> String {
    format!("{:.3}%", fraction * 100.0)
}

/// Format a unitless ratio rounded to three decimals.
pub fn format_ratio(ratio: f64) -> String {
    format!("{ratio:.3}")
}

/// Outcome of a what-if trade, as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginalSummary {
    /// Traded ticker.
    pub ticker: String,

    /// Shares added (negative for a sale).
    pub shares: i64,

    /// Volatility before the trade.
    pub baseline_volatility: f64,

    /// Volatility after the trade.
    pub volatility: f64,

    /// Change in volatility.
    pub delta: f64,
}

impl From<&MarginalImpact> for MarginalSummary {
    fn from(impact: &MarginalImpact) -> Self {
        Self {
            ticker: impact.ticker().to_string(),
            shares: impact.shares(),
            baseline_volatility: impact.baseline_volatility(),
            volatility: impact.volatility(),
            delta: impact.delta(),
        }
    }
}

/// Metrics of one portfolio analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Report generation timestamp.
    pub generated_at: DateTime<Utc>,

    /// Portfolio metrics.
    pub metrics: PortfolioMetrics,

    /// What-if trade, if one was evaluated.
    pub marginal: Option<MarginalSummary>,
}

impl Report {
    /// Create a new report.
    pub fn new(metrics: PortfolioMetrics, marginal: Option<MarginalSummary>) -> Self {
        Self {
            generated_at: Utc::now(),
            metrics,
            marginal,
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `(label, formatted value)` rows in display order.
    pub fn rows(&self) -> Vec<(String, String)> {
        let m = &self.metrics;
        let mut rows = vec![
            (
                "Average daily return".to_string(),
                format_percent(m.average_daily_return),
            ),
            ("Volatility".to_string(), format_percent(m.volatility)),
            (
                format!("Benchmark volatility ({})", m.benchmark),
                format_percent(m.benchmark_volatility),
            ),
            ("Risk ratio".to_string(), format_ratio(m.risk_ratio)),
        ];

        if let Some(marginal) = &self.marginal {
            rows.push((
                format!("Marginal volatility ({} {:+})", marginal.ticker, marginal.shares),
                format_percent(marginal.delta),
            ));
        }

        rows.push((
            "Max drawdown".to_string(),
            format_percent(m.max_drawdown.fraction),
        ));
        rows
    }

    /// Render as a plain-text table.
    pub fn to_ascii_table(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        let rows = self.rows();
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

        writeln!(f, "Portfolio: {}", m.holdings)?;
        writeln!(
            f,
            "Period: {} to {} ({} trading days)",
            m.start, m.end, m.trading_days
        )?;
        writeln!(f, "{}", "=".repeat(width + 16))?;
        for (label, value) in &rows {
            writeln!(f, "{label:<width$}  {value:>14}")?;
        }
        if m.max_drawdown.fraction > 0.0 {
            writeln!(
                f,
                "Drawdown from {} ({:.2}) to {} ({:.2})",
                m.max_drawdown.peak_date,
                m.max_drawdown.peak_value,
                m.max_drawdown.trough_date,
                m.max_drawdown.trough_value
            )?;
        }
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    metrics: Option<PortfolioMetrics>,
    marginal: Option<MarginalSummary>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the portfolio metrics.
    pub fn metrics(mut self, metrics: PortfolioMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Add the outcome of a what-if trade.
    pub fn marginal(mut self, impact: &MarginalImpact) -> Self {
        self.marginal = Some(impact.into());
        self
    }

    /// Build the report.
    pub fn build(self) -> Result<Report, ReportError> {
        let metrics = self.metrics.ok_or(ReportError::MissingMetrics)?;
        Ok(Report::new(metrics, self.marginal))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use basket_risk::{DrawdownDetail, Holdings};
    use chrono::NaiveDate;
    use rstest::rstest;

    pub(crate) fn sample_metrics() -> PortfolioMetrics {
        PortfolioMetrics {
            holdings: Holdings::new([("AAPL", 50), ("GME", 150)]).unwrap(),
            start: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            benchmark: "SPY".to_string(),
            trading_days: 505,
            average_daily_return: 0.001_234_5,
            volatility: 0.034_567_8,
            benchmark_volatility: 0.017_283_9,
            risk_ratio: 2.0,
            max_drawdown: DrawdownDetail {
                peak_date: NaiveDate::from_ymd_opt(2020, 2, 19).unwrap(),
                trough_date: NaiveDate::from_ymd_opt(2020, 3, 23).unwrap(),
                peak_value: 10_000.0,
                trough_value: 6_543.21,
                fraction: 0.345_679,
            },
        }
    }

    #[rstest]
    #[case(0.001_234_5, "0.123%")]
    #[case(0.5, "50.000%")]
    #[case(-0.000_04, "-0.004%")]
    #[case(0.0, "0.000%")]
    fn test_format_percent(#[case] fraction: f64, #[case] expected: &str) {
        assert_eq!(format_percent(fraction), expected);
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(1.23456), "1.235");
    }

    #[test]
    fn test_report_text() {
        let report = Report::new(sample_metrics(), None);
        let text = report.to_ascii_table();

        assert!(text.contains("Portfolio: AAPL=50, GME=150"));
        assert!(text.contains("505 trading days"));
        assert!(text.contains("0.123%"));
        assert!(text.contains("3.457%"));
        assert!(text.contains("2.000"));
        assert!(text.contains("34.568%"));
        assert!(text.contains("2020-03-23"));
        assert!(!text.contains("Marginal"));
    }

    #[test]
    fn test_report_json() {
        let report = Report::new(sample_metrics(), None);
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metrics"]["benchmark"], "SPY");
        assert_eq!(value["metrics"]["trading_days"], 505);
        assert!(value["marginal"].is_null());
    }

    #[test]
    fn test_report_builder_requires_metrics() {
        assert!(matches!(
            ReportBuilder::new().build(),
            Err(ReportError::MissingMetrics)
        ));
    }

    #[test]
    fn test_marginal_row() {
        let mut report = Report::new(sample_metrics(), None);
        report.marginal = Some(MarginalSummary {
            ticker: "GME".to_string(),
            shares: 300,
            baseline_volatility: 0.03,
            volatility: 0.045,
            delta: 0.015,
        });

        let rows = report.rows();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[4].0, "Marginal volatility (GME +300)");
        assert_eq!(rows[4].1, "1.500%");
    }
}
