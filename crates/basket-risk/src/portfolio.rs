//! Portfolio valuation engine.

use crate::error::{PortfolioError, Result};
use crate::holdings::Holdings;
use crate::metrics::{self, Drawdown};
use crate::valuation::Valuation;
use basket_data::{PriceSeriesProvider, normalize_symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Holdings valued over a fixed date range, with a benchmark to compare against.
///
/// The valuation is computed once at construction. Metrics are derived from
/// it on demand and can be called in any order. Benchmark figures and
/// what-if trades issue their own provider requests.
#[derive(Debug)]
pub struct Portfolio<P> {
    provider: P,
    holdings: Holdings,
    start: NaiveDate,
    end: NaiveDate,
    benchmark: String,
    valuation: Valuation,
}

/// Result of a hypothetical trade, see [`Portfolio::marginal_volatility`].
#[derive(Debug, Clone, PartialEq)]
pub struct MarginalImpact {
    base_holdings: Holdings,
    start: NaiveDate,
    end: NaiveDate,
    ticker: String,
    shares: i64,
    holdings: Holdings,
    valuation: Valuation,
    baseline_volatility: f64,
    volatility: f64,
}

impl MarginalImpact {
    /// Ticker that was traded.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Shares added (negative for a sale).
    pub const fn shares(&self) -> i64 {
        self.shares
    }

    /// Holdings after the trade.
    pub const fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    /// Valuation of the holdings after the trade.
    pub const fn valuation(&self) -> &Valuation {
        &self.valuation
    }

    /// Volatility before the trade.
    pub const fn baseline_volatility(&self) -> f64 {
        self.baseline_volatility
    }

    /// Volatility after the trade.
    pub const fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Change in volatility caused by the trade.
    pub fn delta(&self) -> f64 {
        self.volatility - self.baseline_volatility
    }
}

/// [`Drawdown`] with the trading days of its peak and trough.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownDetail {
    /// Day of the peak
    pub peak_date: NaiveDate,
    /// Day of the trough
    pub trough_date: NaiveDate,
    /// Portfolio value at the peak
    pub peak_value: f64,
    /// Portfolio value at the trough
    pub trough_value: f64,
    /// Decline as a fraction of the peak value
    pub fraction: f64,
}

/// Every scalar metric of a portfolio, evaluated together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// Holdings the metrics were computed for
    pub holdings: Holdings,
    /// First requested day
    pub start: NaiveDate,
    /// Last requested day
    pub end: NaiveDate,
    /// Benchmark ticker
    pub benchmark: String,
    /// Number of trading days in the value series
    pub trading_days: usize,
    /// Compound average daily return
    pub average_daily_return: f64,
    /// Sample standard deviation of daily returns
    pub volatility: f64,
    /// Volatility of the benchmark over the same range
    pub benchmark_volatility: f64,
    /// Portfolio volatility over benchmark volatility
    pub risk_ratio: f64,
    /// Deepest peak-to-trough decline
    pub max_drawdown: DrawdownDetail,
}

impl<P: PriceSeriesProvider> Portfolio<P> {
    /// Fetch prices for `holdings` over `[start, end]` and value them.
    ///
    /// # Errors
    /// Checked in order: [`PortfolioError::InvalidRange`] if `start > end`,
    /// [`PortfolioError::EmptyPortfolio`] for empty holdings,
    /// [`PortfolioError::InvalidSymbol`] for a malformed benchmark. Then
    /// [`PortfolioError::DataUnavailable`] if the provider cannot supply the
    /// prices.
    pub async fn new(
        provider: P,
        holdings: Holdings,
        start: NaiveDate,
        end: NaiveDate,
        benchmark: &str,
    ) -> Result<Self> {
        if start > end {
            return Err(PortfolioError::InvalidRange { start, end });
        }
        if holdings.is_empty() {
            return Err(PortfolioError::EmptyPortfolio);
        }
        let benchmark = normalize_symbol(benchmark)?;

        tracing::debug!(%holdings, %start, %end, %benchmark, "constructing portfolio");
        let valuation = value(&provider, &holdings, start, end).await?;

        Ok(Self {
            provider,
            holdings,
            start,
            end,
            benchmark,
            valuation,
        })
    }

    /// Compound average daily return over the value series.
    pub fn average_daily_return(&self) -> Result<f64> {
        metrics::average_daily_return(self.valuation.values())
    }

    /// Sample standard deviation of daily returns.
    pub fn volatility(&self) -> Result<f64> {
        metrics::sample_volatility(self.valuation.returns()?.view())
    }

    /// Volatility of one share of the benchmark over the same range.
    pub async fn benchmark_volatility(&self) -> Result<f64> {
        let benchmark = Holdings::new([(self.benchmark.as_str(), 1)])?;
        let valuation = value(&self.provider, &benchmark, self.start, self.end).await?;
        metrics::sample_volatility(valuation.returns()?.view())
    }

    /// Portfolio volatility relative to the benchmark's.
    ///
    /// # Errors
    /// Returns [`PortfolioError::DataUnavailable`] if the benchmark cannot be
    /// fetched and [`PortfolioError::DivisionByZero`] if its volatility is zero.
    pub async fn risk_ratio(&self) -> Result<f64> {
        let benchmark_volatility = self.benchmark_volatility().await?;
        self.risk_ratio_against(benchmark_volatility)
    }

    /// Portfolio volatility relative to an already known benchmark volatility.
    pub fn risk_ratio_against(&self, benchmark_volatility: f64) -> Result<f64> {
        metrics::risk_ratio(self.volatility()?, benchmark_volatility)
    }

    /// Evaluate trading `shares` of `ticker` without changing the portfolio.
    ///
    /// Prices for the resulting holdings are fetched afresh. Pass the result
    /// to [`Portfolio::commit`] to keep the trade.
    pub async fn marginal_volatility(&self, ticker: &str, shares: i64) -> Result<MarginalImpact> {
        let ticker = normalize_symbol(ticker)?;
        let holdings = self.holdings.with_trade(&ticker, shares)?;
        let baseline_volatility = self.volatility()?;

        let valuation = value(&self.provider, &holdings, self.start, self.end).await?;
        let volatility = metrics::sample_volatility(valuation.returns()?.view())?;

        tracing::debug!(
            %ticker,
            shares,
            baseline_volatility,
            volatility,
            "evaluated marginal trade"
        );

        Ok(MarginalImpact {
            base_holdings: self.holdings.clone(),
            start: self.start,
            end: self.end,
            ticker,
            shares,
            holdings,
            valuation,
            baseline_volatility,
            volatility,
        })
    }
}

impl<P> Portfolio<P> {
    /// Adopt the holdings and valuation of a hypothetical trade.
    ///
    /// # Errors
    /// Returns [`PortfolioError::StaleImpact`] if `impact` was computed for
    /// other holdings or another date range.
    pub fn commit(&mut self, impact: MarginalImpact) -> Result<()> {
        if impact.base_holdings != self.holdings || impact.start != self.start || impact.end != self.end {
            return Err(PortfolioError::StaleImpact);
        }

        tracing::debug!(ticker = %impact.ticker, shares = impact.shares, "committed trade");
        self.holdings = impact.holdings;
        self.valuation = impact.valuation;
        Ok(())
    }

    /// Maximum drawdown of the value series as a fraction of its peak.
    pub fn max_drawdown(&self) -> Result<f64> {
        metrics::max_drawdown(self.valuation.values())
    }

    /// Maximum drawdown with the days and values it spans.
    pub fn max_drawdown_detail(&self) -> Result<DrawdownDetail> {
        let Drawdown {
            peak_index,
            trough_index,
            peak_value,
            trough_value,
            fraction,
        } = metrics::drawdown(self.valuation.values())?;
        let dates = self.valuation.dates();

        Ok(DrawdownDetail {
            peak_date: dates[peak_index],
            trough_date: dates[trough_index],
            peak_value,
            trough_value,
            fraction,
        })
    }

    /// Current holdings.
    pub const fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    /// Current valuation.
    pub const fn valuation(&self) -> &Valuation {
        &self.valuation
    }

    /// First requested day.
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last requested day.
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Benchmark ticker, normalized.
    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    /// The price provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: PriceSeriesProvider> Portfolio<P> {
    /// Evaluate every scalar metric, fetching the benchmark once.
    pub async fn metrics(&self) -> Result<PortfolioMetrics> {
        let benchmark_volatility = self.benchmark_volatility().await?;

        Ok(PortfolioMetrics {
            holdings: self.holdings.clone(),
            start: self.start,
            end: self.end,
            benchmark: self.benchmark.clone(),
            trading_days: self.valuation.len(),
            average_daily_return: self.average_daily_return()?,
            volatility: self.volatility()?,
            benchmark_volatility,
            risk_ratio: self.risk_ratio_against(benchmark_volatility)?,
            max_drawdown: self.max_drawdown_detail()?,
        })
    }
}

async fn value<P: PriceSeriesProvider>(
    provider: &P,
    holdings: &Holdings,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Valuation> {
    let prices = provider.fetch(&holdings.symbols(), start, end).await?;
    Valuation::new(holdings, prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use basket_data::InMemoryProvider;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 3, day).unwrap()
    }

    fn provider() -> InMemoryProvider {
        InMemoryProvider::new()
            .with_daily_prices("AAPL", date(1), &[100.0, 102.0, 99.0, 104.0, 103.0])
            .unwrap()
            .with_daily_prices("GME", date(1), &[20.0, 25.0, 18.0, 22.0, 30.0])
            .unwrap()
            .with_daily_prices("SPY", date(1), &[400.0, 404.0, 398.0, 406.0, 405.0])
            .unwrap()
    }

    async fn portfolio() -> Portfolio<InMemoryProvider> {
        let holdings = Holdings::new([("AAPL", 10), ("GME", 5)]).unwrap();
        Portfolio::new(provider(), holdings, date(1), date(5), "spy")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_construction_values_holdings() {
        let portfolio = portfolio().await;
        assert_eq!(portfolio.benchmark(), "SPY");
        assert_eq!(
            portfolio.valuation().values().to_vec(),
            vec![1100.0, 1145.0, 1080.0, 1150.0, 1180.0]
        );
        assert_eq!(portfolio.provider().requests(), 1);
    }

    #[tokio::test]
    async fn test_validation_order() {
        let empty = Holdings::default();
        let result = Portfolio::new(provider(), empty.clone(), date(5), date(1), "??").await;
        assert!(matches!(result, Err(PortfolioError::InvalidRange { .. })));

        let result = Portfolio::new(provider(), empty, date(1), date(5), "??").await;
        assert!(matches!(result, Err(PortfolioError::EmptyPortfolio)));

        let holdings = Holdings::new([("AAPL", 1)]).unwrap();
        let result = Portfolio::new(provider(), holdings, date(1), date(5), "S P Y").await;
        assert!(matches!(result, Err(PortfolioError::InvalidSymbol(_))));
    }

    #[tokio::test]
    async fn test_metrics_agree_with_individual_calls() {
        let portfolio = portfolio().await;
        let metrics = portfolio.metrics().await.unwrap();

        assert_eq!(metrics.trading_days, 5);
        assert_relative_eq!(metrics.volatility, portfolio.volatility().unwrap());
        assert_relative_eq!(metrics.risk_ratio, portfolio.risk_ratio().await.unwrap());
        assert_relative_eq!(
            metrics.average_daily_return,
            (1180.0f64 / 1100.0).powf(1.0 / 5.0) - 1.0,
            epsilon = 1e-12
        );
        assert_eq!(metrics.max_drawdown.peak_date, date(2));
        assert_eq!(metrics.max_drawdown.trough_date, date(3));
        assert_relative_eq!(metrics.max_drawdown.fraction, 65.0 / 1145.0, epsilon = 1e-12);
    }

    #[tokio::test]
    async fn test_marginal_volatility_does_not_mutate() {
        let portfolio = portfolio().await;
        let before = portfolio.volatility().unwrap();

        let impact = portfolio.marginal_volatility("gme", 100).await.unwrap();
        assert_eq!(impact.ticker(), "GME");
        assert_eq!(impact.holdings().shares("GME"), Some(105));
        assert_relative_eq!(impact.baseline_volatility(), before);
        assert!(impact.delta() > 0.0);

        assert_eq!(portfolio.holdings().shares("GME"), Some(5));
        assert_relative_eq!(portfolio.volatility().unwrap(), before);
    }

    #[tokio::test]
    async fn test_commit_adopts_trade() {
        let mut portfolio = portfolio().await;
        let impact = portfolio.marginal_volatility("SPY", 2).await.unwrap();
        let expected = impact.volatility();
        let requests = portfolio.provider().requests();

        portfolio.commit(impact).unwrap();
        assert_eq!(portfolio.holdings().shares("SPY"), Some(2));
        assert_relative_eq!(portfolio.volatility().unwrap(), expected);
        assert_eq!(portfolio.provider().requests(), requests);
    }

    #[tokio::test]
    async fn test_commit_rejects_stale_impact() {
        let mut portfolio = portfolio().await;
        let first = portfolio.marginal_volatility("AAPL", 1).await.unwrap();
        let second = portfolio.marginal_volatility("GME", 1).await.unwrap();

        portfolio.commit(first).unwrap();
        assert!(matches!(
            portfolio.commit(second),
            Err(PortfolioError::StaleImpact)
        ));
        assert_eq!(portfolio.holdings().shares("GME"), Some(5));
    }

    #[tokio::test]
    async fn test_marginal_unknown_ticker() {
        let portfolio = portfolio().await;
        let result = portfolio.marginal_volatility("TSLA", 10).await;
        assert!(matches!(result, Err(PortfolioError::DataUnavailable(_))));
    }
}
