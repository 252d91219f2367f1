//! Basket CLI binary.
//!
//! Provides command-line interface for portfolio analysis.

mod integration;

use basket::data::{YahooConfig, normalize_symbol};
use basket::digits::divisible;
use basket::output::{ExportError, ExportFormat, Exporter, ReportBuilder, SeriesExport};
use basket::{Holdings, Portfolio};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use integration::cache_manager;
use integration::data_pipeline::{FetchConfig, QuoteSource, print_cache_info};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration as StdDuration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "basket")]
#[command(about = "Basket: stock portfolio valuation and risk metrics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Value a portfolio and report its risk metrics
    Analyze {
        /// Position as SYMBOL=SHARES (repeatable)
        #[arg(long = "holding", value_parser = parse_position, required = true)]
        holdings: Vec<(String, i64)>,

        /// First day of the analysis (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the analysis (YYYY-MM-DD), today if omitted
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Benchmark ticker for the risk ratio
        #[arg(long, default_value = "SPY")]
        benchmark: String,

        /// Hypothetical trade as SYMBOL=SHARES to evaluate
        #[arg(long, value_parser = parse_position)]
        marginal: Option<(String, i64)>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the daily value/return series to a .csv or .json file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write the metrics report to a .csv or .json file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write JSON files without indentation
        #[arg(long)]
        compact: bool,

        /// Disable caching (always fetch fresh data)
        #[arg(long)]
        no_cache: bool,

        /// Force refresh cached data
        #[arg(long)]
        refresh: bool,
    },

    /// List the numbers in a string divisible by a divisor
    Divisible {
        /// Text to scan for digit runs
        input: String,

        /// Divisor; values below 1 yield nothing
        #[arg(allow_negative_numbers = true)]
        divisor: i64,
    },

    /// Inspect or clear the price cache
    Cache {
        /// Show cache statistics
        #[arg(long)]
        stats: bool,

        /// Remove every cached quote
        #[arg(long)]
        clear: bool,

        /// Remove cached quotes for one symbol
        #[arg(long)]
        clear_symbol: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            holdings,
            start,
            end,
            benchmark,
            marginal,
            format,
            export,
            report,
            compact,
            no_cache,
            refresh,
        } => {
            let config = FetchConfig {
                use_cache: !no_cache,
                force_refresh: refresh,
            };
            let request = AnalyzeRequest {
                holdings: Holdings::new(holdings)?,
                start,
                end: end.unwrap_or_else(|| Utc::now().date_naive()),
                benchmark,
                marginal,
                format,
                export,
                report,
                compact,
            };
            analyze(request, config).await?;
        }
        Commands::Divisible { input, divisor } => {
            let found: Vec<String> = divisible(&input, divisor)
                .iter()
                .map(ToString::to_string)
                .collect();
            println!("{{{}}}", found.join(", "));
        }
        Commands::Cache {
            stats,
            clear,
            clear_symbol,
        } => {
            manage_cache(stats, clear, clear_symbol)?;
        }
    }

    Ok(())
}

/// Parse `SYMBOL=SHARES`.
fn parse_position(s: &str) -> Result<(String, i64), String> {
    let (symbol, shares) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=SHARES, got '{s}'"))?;
    let symbol = normalize_symbol(symbol).map_err(|e| e.to_string())?;
    let shares = shares
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid share count '{shares}': {e}"))?;
    Ok((symbol, shares))
}

struct AnalyzeRequest {
    holdings: Holdings,
    start: NaiveDate,
    end: NaiveDate,
    benchmark: String,
    marginal: Option<(String, i64)>,
    format: OutputFormat,
    export: Option<PathBuf>,
    report: Option<PathBuf>,
    compact: bool,
}

/// Export format for `path`, compact JSON if requested.
fn file_format(path: &Path, compact: bool) -> Result<ExportFormat, ExportError> {
    match ExportFormat::from_path(path)? {
        ExportFormat::PrettyJson if compact => Ok(ExportFormat::Json),
        format => Ok(format),
    }
}

async fn analyze(
    request: AnalyzeRequest,
    config: FetchConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let AnalyzeRequest {
        holdings,
        start,
        end,
        benchmark,
        marginal,
        format,
        export,
        report: report_path,
        compact,
    } = request;

    // fail on a bad export path before spending requests
    let export_format = export
        .as_deref()
        .map(|path| file_format(path, compact))
        .transpose()?;
    let report_format = report_path
        .as_deref()
        .map(|path| file_format(path, compact))
        .transpose()?;

    if format == OutputFormat::Text {
        println!("Analyzing {holdings} from {start} to {end}");
        if config.use_cache {
            print_cache_info();
            if config.force_refresh {
                println!("  Mode: Force refresh (re-fetching all data)");
            }
        } else {
            println!("  Cache: Disabled");
        }
        println!();
    }

    let provider = QuoteSource::new(config, YahooConfig::default())?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(StdDuration::from_millis(100));
    pb.set_message("Fetching portfolio prices...");

    let outcome = async {
        let portfolio = Portfolio::new(provider, holdings, start, end, &benchmark).await?;

        pb.set_message(format!("Fetching benchmark {}...", portfolio.benchmark()));
        let metrics = portfolio.metrics().await?;

        let mut builder = ReportBuilder::new().metrics(metrics);
        if let Some((ticker, shares)) = &marginal {
            pb.set_message(format!("Evaluating trade {ticker} {shares:+}..."));
            let impact = portfolio.marginal_volatility(ticker, *shares).await?;
            builder = builder.marginal(&impact);
        }

        Ok::<_, Box<dyn std::error::Error>>((portfolio, builder.build()?))
    }
    .await;
    pb.finish_and_clear();
    let (portfolio, report) = outcome?;

    tracing::info!(
        holdings = %portfolio.holdings(),
        trading_days = report.metrics.trading_days,
        "analysis complete"
    );

    match format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if let (Some(path), Some(export_format)) = (&export, export_format) {
        SeriesExport::from_valuation(portfolio.valuation()).export_to_file(path, export_format)?;
        if format == OutputFormat::Text {
            println!("\nSeries written to {}", path.display());
        }
    }

    if let (Some(path), Some(report_format)) = (&report_path, report_format) {
        report.export_to_file(path, report_format)?;
        if format == OutputFormat::Text {
            println!("Report written to {}", path.display());
        }
    }

    Ok(())
}

fn manage_cache(
    stats: bool,
    clear: bool,
    clear_symbol: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let show_stats = stats || (!clear && clear_symbol.is_none());
    let cache = cache_manager::open_cache()?;

    if clear {
        cache.clear_all()?;
        println!("Cleared all cached quotes");
    }
    if let Some(symbol) = clear_symbol {
        let symbol = normalize_symbol(&symbol)?;
        cache.clear_symbol(&symbol)?;
        println!("Cleared cached quotes for {symbol}");
    }
    if show_stats {
        let stats = cache.get_stats()?;
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "path": cache_manager::get_cache_path().display().to_string(),
                "total_quotes": stats.total_quotes,
                "unique_symbols": stats.unique_symbols,
                "cached_ranges": stats.cached_ranges,
            }))?
        );
    }

    Ok(())
}
