/// data/yahoo.rs — Daily closes via the Yahoo Finance chart REST API
///
/// REQUEST:
///   GET {base}/v8/finance/chart/{TICKER}
///       ?period1={start 00:00 UTC}&period2={end 00:00 UTC}
///       &interval=1d&events=div,split&includeAdjustedClose=true
///
///   `end` is exclusive: a bar dated on `end` is not returned.
///
/// RESPONSE (only the fields used):
///   { "chart": { "result": [ { "meta": { "gmtoffset": -18000 },
///                              "timestamp": [ ... ],
///                              "indicators": { "quote":    [ { "close":    [ ... ] } ],
///                                              "adjclose": [ { "adjclose": [ ... ] } ] } } ],
///                "error": null } }
///
///   Missing bars are `null` and are skipped.  An unknown symbol answers
///   HTTP 404 with `chart.error.code = "Not Found"`; that is reported as an
///   empty series so the pipeline can classify it as "no data".

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{parse_date, DataSourceError, MarketDataSource, PricePoint, PriceSeries};
use crate::config::EngineConfig;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) garch_engine/0.1";

// ── Response types ────────────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Deserialize, Debug)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error:  Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code:        String,
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    #[serde(default)]
    meta:       ChartMeta,
    #[serde(default)]
    timestamp:  Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize, Debug, Default)]
struct ChartMeta {
    #[serde(rename = "gmtoffset", default)]
    gmt_offset: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    #[serde(default)]
    quote:    Vec<QuoteBlock>,
    #[serde(default)]
    adjclose: Vec<AdjCloseBlock>,
}

#[derive(Deserialize, Debug)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

// ── Client ────────────────────────────────────────────────────────────────

pub struct YahooChartClient {
    client:      Client,
    base_url:    String,
    auto_adjust: bool,
}

impl YahooChartClient {
    pub fn new(base_url: &str, timeout: Duration, auto_adjust: bool) -> Result<Self, DataSourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            auto_adjust,
        })
    }

    pub fn from_config(cfg: &EngineConfig) -> Result<Self, DataSourceError> {
        Self::new(
            &cfg.market_data_url,
            Duration::from_secs(cfg.http_timeout_secs),
            cfg.auto_adjust,
        )
    }

    fn chart_url(&self, ticker: &str) -> Result<Url, DataSourceError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| DataSourceError::Http(format!("bad base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| DataSourceError::Http(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        Ok(url)
    }
}

#[async_trait]
impl MarketDataSource for YahooChartClient {
    async fn fetch_close_prices(
        &self,
        ticker: &str,
        start:  &str,
        end:    &str,
    ) -> Result<PriceSeries, DataSourceError> {
        let start_date = parse_date(start)?;
        let end_date   = parse_date(end)?;
        if end_date <= start_date {
            warn!("Empty date range {} → {} for {}", start, end, ticker);
            return Ok(Vec::new());
        }

        let url = self.chart_url(ticker)?;
        let period1 = midnight_utc(start_date);
        let period2 = midnight_utc(end_date);
        info!("Fetching daily closes for {} ({} → {})", ticker, start, end);

        let resp = self.client
            .get(url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_owned()),
                ("events", "div,split".to_owned()),
                ("includeAdjustedClose", "true".to_owned()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body   = resp.text().await?;

        if status == StatusCode::NOT_FOUND {
            warn!("Ticker {} not found (HTTP 404)", ticker);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(match serde_json::from_str::<ChartEnvelope>(&body) {
                Ok(ChartEnvelope { chart: ChartBody { error: Some(e), .. } }) => DataSourceError::Api {
                    code:        e.code,
                    description: e.description,
                },
                _ => DataSourceError::Status {
                    status: status.as_u16(),
                    body:   body.chars().take(200).collect(),
                },
            });
        }

        let prices = parse_chart(&body, self.auto_adjust)?;
        debug!("Parsed {} closes for {}", prices.len(), ticker);
        Ok(prices)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Decode a chart response body into a date-ordered close series.
///
/// Adjusted closes are used when `auto_adjust` is set and the response
/// carries them; otherwise raw closes.  Bars are dated in exchange-local
/// time (`gmtoffset`), de-duplicated by date (last bar wins).
fn parse_chart(body: &str, auto_adjust: bool) -> Result<PriceSeries, DataSourceError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| DataSourceError::Parse(e.to_string()))?;

    if let Some(e) = envelope.chart.error {
        if e.code == "Not Found" {
            return Ok(Vec::new());
        }
        return Err(DataSourceError::Api { code: e.code, description: e.description });
    }

    let Some(result) = envelope.chart.result.and_then(|mut r| r.pop()) else {
        return Ok(Vec::new());
    };

    let adjusted = result.indicators.adjclose.into_iter().next().map(|b| b.adjclose);
    let raw      = result.indicators.quote.into_iter().next().map(|b| b.close);
    let closes = match (auto_adjust, adjusted, raw) {
        (true, Some(adj), _) => adj,
        (_, _, Some(raw))    => raw,
        (_, Some(adj), None) => adj,
        (_, None, None)      => return Ok(Vec::new()),
    };

    if closes.len() != result.timestamp.len() {
        return Err(DataSourceError::Parse(format!(
            "{} timestamps but {} closes",
            result.timestamp.len(),
            closes.len()
        )));
    }

    let offset = result.meta.gmt_offset;
    let mut prices: PriceSeries = Vec::with_capacity(closes.len());
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let Some(close) = close.filter(|c| c.is_finite()) else { continue };
        let date = DateTime::from_timestamp(ts + offset, 0)
            .ok_or_else(|| DataSourceError::Parse(format!("timestamp out of range: {ts}")))?
            .date_naive();
        prices.push(PricePoint { date, close });
    }

    prices.sort_by_key(|p| p.date);
    // keep the last bar of each date
    prices.reverse();
    prices.dedup_by_key(|p| p.date);
    prices.reverse();
    Ok(prices)
}
