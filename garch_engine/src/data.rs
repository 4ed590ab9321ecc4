/// data.rs — Price / return series and the market-data capability
///
/// ─────────────────────────────────────────────────────────────────────────
/// PERCENTAGE RETURNS
/// ─────────────────────────────────────────────────────────────────────────
///
///   r_i = 100 · (P_i − P_{i−1}) / P_{i−1}
///
///   The first close has no predecessor and is dropped, so
///   len(returns) = len(prices) − 1.  Scaling by 100 keeps the GARCH
///   intercept ω in a well-conditioned range for the optimiser.
/// ─────────────────────────────────────────────────────────────────────────

pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use yahoo::YahooChartClient;

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date:  NaiveDate,
    pub close: f64,
}

/// One date-indexed value (returns, volatilities).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date:  NaiveDate,
    pub value: f64,
}

/// Closes ordered strictly by date.
pub type PriceSeries = Vec<PricePoint>;
/// Percentage returns, one per price after the first.
pub type ReturnSeries = Vec<SeriesPoint>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataSourceError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("market data API error {code}: {description}")]
    Api { code: String, description: String },

    #[error("failed to parse market data response: {0}")]
    Parse(String),

    #[error("invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

impl From<reqwest::Error> for DataSourceError {
    fn from(e: reqwest::Error) -> Self {
        DataSourceError::Http(e.to_string())
    }
}

/// Remote source of daily closing prices.
///
/// `start` and `end` are passed through exactly as the user typed them; an
/// implementation decides how to interpret them.  An unknown ticker or an
/// empty range is an empty series, not an error.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_close_prices(
        &self,
        ticker: &str,
        start:  &str,
        end:    &str,
    ) -> Result<PriceSeries, DataSourceError>;
}

/// First-difference percentage change, scaled by 100, first point dropped.
pub fn pct_returns(prices: &[PricePoint]) -> ReturnSeries {
    prices
        .windows(2)
        .map(|w| SeriesPoint {
            date:  w[1].date,
            value: 100.0 * (w[1].close - w[0].close) / w[0].close,
        })
        .collect()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, DataSourceError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DataSourceError::InvalidDate { value: value.to_owned() })
}
