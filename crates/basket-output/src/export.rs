//! CSV and JSON export of reports and daily series.

use crate::report::Report;
use basket_risk::Valuation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Pick the format from a file extension; `.json` exports pretty-printed.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::PrettyJson),
            _ => Err(ExportError::InvalidFormat(format!(
                "cannot infer export format from {}",
                path.display()
            ))),
        }
    }
}

/// One trading day of a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesRecord {
    /// Trading day.
    pub date: NaiveDate,

    /// Portfolio value at the close.
    pub value: f64,

    /// Return from the previous trading day; absent on the first day.
    pub daily_return: Option<f64>,
}

/// Daily value and return series of a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesExport {
    /// Records in date order.
    pub records: Vec<SeriesRecord>,
}

impl SeriesExport {
    /// Collect the series of a valuation.
    pub fn from_valuation(valuation: &Valuation) -> Self {
        let records = valuation
            .dates()
            .iter()
            .zip(valuation.values())
            .enumerate()
            .map(|(day, (date, value))| SeriesRecord {
                date: *date,
                value: *value,
                daily_return: valuation.return_on(day),
            })
            .collect();
        Self { records }
    }
}

/// A single labeled metric, the CSV shape of a [`Report`].
#[derive(Debug, Serialize)]
struct MetricRecord<'a> {
    metric: &'a str,
    value: f64,
}

fn into_csv_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for SeriesExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in &self.records {
                    wtr.serialize(record)?;
                }
                into_csv_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(&self.records)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(&self.records)?),
        }
    }
}

impl Exporter for Report {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let m = &self.metrics;
                let mut records = vec![
                    MetricRecord {
                        metric: "average_daily_return",
                        value: m.average_daily_return,
                    },
                    MetricRecord {
                        metric: "volatility",
                        value: m.volatility,
                    },
                    MetricRecord {
                        metric: "benchmark_volatility",
                        value: m.benchmark_volatility,
                    },
                    MetricRecord {
                        metric: "risk_ratio",
                        value: m.risk_ratio,
                    },
                    MetricRecord {
                        metric: "max_drawdown",
                        value: m.max_drawdown.fraction,
                    },
                ];
                if let Some(marginal) = &self.marginal {
                    records.push(MetricRecord {
                        metric: "marginal_volatility",
                        value: marginal.delta,
                    });
                }

                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in &records {
                    wtr.serialize(record)?;
                }
                into_csv_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}
