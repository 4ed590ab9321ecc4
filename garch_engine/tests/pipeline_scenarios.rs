/// End-to-end pipeline runs against in-memory market data and fitters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use garch_engine::data::DataSourceError;
use garch_engine::models::{FitError, GarchMle};
use garch_engine::{
    validate_request, AnalysisPipeline, FitResult, FormInput, MarketDataSource, MeanModel,
    PipelineError, PriceSeries, PricePoint, SeriesPoint, Stage, VolModel, VolatilityFitter,
};

// ── Test doubles ──────────────────────────────────────────────────────────

/// Serves a fixed series for one ticker, empty for everything else.
struct StaticSource {
    ticker: String,
    prices: PriceSeries,
    calls:  Arc<AtomicUsize>,
}

#[async_trait]
impl MarketDataSource for StaticSource {
    async fn fetch_close_prices(&self, ticker: &str, _start: &str, _end: &str) -> Result<PriceSeries, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ticker == self.ticker { Ok(self.prices.clone()) } else { Ok(Vec::new()) }
    }
}

struct FailingSource;

#[async_trait]
impl MarketDataSource for FailingSource {
    async fn fetch_close_prices(&self, _: &str, _: &str, _: &str) -> Result<PriceSeries, DataSourceError> {
        Err(DataSourceError::Http("connection reset".into()))
    }
}

/// Wraps a fitter and counts invocations.
struct CountingFitter<F> {
    inner: F,
    calls: Arc<AtomicUsize>,
}

impl<F: VolatilityFitter> VolatilityFitter for CountingFitter<F> {
    fn fit(&self, r: &[SeriesPoint], m: MeanModel, v: VolModel, p: usize, q: usize) -> Result<FitResult, FitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fit(r, m, v, p, q)
    }
}

struct RejectingFitter;

impl VolatilityFitter for RejectingFitter {
    fn fit(&self, _: &[SeriesPoint], _: MeanModel, _: VolModel, _: usize, _: usize) -> Result<FitResult, FitError> {
        Err(FitError::Optimizer("simplex collapsed".into()))
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

/// Deterministic price path with clustered volatility.
fn price_path(n: usize) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2010, 1, 4).unwrap();
    let mut state: u64 = 12345;
    let mut close = 100.0;
    let mut vol = 1.0;
    (0..n)
        .map(|i| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let u = (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
            vol = 0.2 + 0.75 * vol + 0.05 * (u * 4.0).powi(2);
            if i > 0 {
                close *= 1.0 + 0.01 * vol.sqrt() * u * 3.4;
            }
            PricePoint { date: start + Duration::days(i as i64), close }
        })
        .collect()
}

struct Harness {
    pipeline:     AnalysisPipeline,
    fetch_calls:  Arc<AtomicUsize>,
    fit_calls:    Arc<AtomicUsize>,
}

fn harness(prices: PriceSeries) -> Harness {
    let fetch_calls = Arc::new(AtomicUsize::new(0));
    let fit_calls = Arc::new(AtomicUsize::new(0));
    let source = StaticSource { ticker: "SPY".into(), prices, calls: fetch_calls.clone() };
    let fitter = CountingFitter { inner: GarchMle::default(), calls: fit_calls.clone() };
    Harness {
        pipeline: AnalysisPipeline::new(Box::new(source), Box::new(fitter)),
        fetch_calls,
        fit_calls,
    }
}

fn form(ticker: &str, p: &str, q: &str) -> FormInput {
    FormInput { ticker: ticker.into(), p: p.into(), q: q.into(), ..FormInput::default() }
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn hundred_prices_give_ninety_nine_annualized_points() {
    let prices = price_path(100);
    let h = harness(prices.clone());
    let req = validate_request(&form("spy", "1", "1")).unwrap();
    let result = h.pipeline.run(&req).await.unwrap();

    assert_eq!(result.returns.len(), 99);
    assert_eq!(result.fit.conditional_volatility.len(), 99);
    assert_eq!(result.annualized.len(), 99);
    assert_eq!(result.returns[0].date, prices[1].date);
    for (a, s) in result.annualized.iter().zip(&result.fit.conditional_volatility) {
        assert_eq!(a.date, s.date);
        assert!((a.value - (s.value * 252f64.sqrt()).sqrt()).abs() < 1e-12);
    }
    assert!(result.fit.summary_text.contains("omega"));
    assert_eq!(result.title(), "SPY Returns and GARCH(1,1) Annualized Conditional Volatility");
    assert_eq!(h.fit_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_ticker_is_no_data() {
    let h = harness(price_path(50));
    let req = validate_request(&form("zzzzinvalid", "1", "1")).unwrap();
    let err = h.pipeline.run(&req).await.unwrap_err();
    assert_eq!(err, PipelineError::NoData { ticker: "ZZZZINVALID".into() });
    assert_eq!(err.to_string(), "No data found for ZZZZINVALID in the specified date range.");
    assert_eq!(h.fit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn negative_order_never_reaches_the_pipeline() {
    let h = harness(price_path(50));
    let err = validate_request(&form("SPY", "-1", "1")).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidOrder { .. }));
    assert_eq!(h.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn single_price_is_insufficient_and_skips_fit() {
    let h = harness(price_path(1));
    let req = validate_request(&form("SPY", "1", "1")).unwrap();
    let err = h.pipeline.run(&req).await.unwrap_err();
    assert_eq!(err, PipelineError::InsufficientData);
    assert_eq!(err.title(), "Data Error");
    assert_eq!(h.fetch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.fit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fitter_failure_is_model_fit_with_message() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = StaticSource { ticker: "SPY".into(), prices: price_path(30), calls };
    let pipeline = AnalysisPipeline::new(Box::new(source), Box::new(RejectingFitter));
    let req = validate_request(&form("SPY", "1", "1")).unwrap();
    match pipeline.run(&req).await {
        Err(PipelineError::ModelFit(msg)) => assert!(msg.contains("simplex collapsed")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn too_short_series_for_order_is_model_fit() {
    let h = harness(price_path(4));
    let req = validate_request(&form("SPY", "2", "2")).unwrap();
    let err = h.pipeline.run(&req).await.unwrap_err();
    assert!(matches!(err, PipelineError::ModelFit(_)));
}

#[tokio::test]
async fn transport_failure_is_unknown() {
    let pipeline = AnalysisPipeline::new(Box::new(FailingSource), Box::new(GarchMle::default()));
    let req = validate_request(&FormInput::default()).unwrap();
    match pipeline.run(&req).await {
        Err(PipelineError::Unknown(msg)) => assert!(msg.contains("connection reset")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn pipeline_is_reusable_after_failure() {
    let h = harness(price_path(80));
    let bad = validate_request(&form("NOPE", "1", "1")).unwrap();
    assert!(h.pipeline.run(&bad).await.is_err());
    let good = validate_request(&form("SPY", "1", "0")).unwrap();
    let result = h.pipeline.run(&good).await.unwrap();
    assert_eq!(result.annualized.len(), 79);
}

#[tokio::test]
async fn extreme_orders_are_a_model_fit_error_not_a_crash() {
    let h = harness(price_path(100));
    let max = i64::MAX.to_string();
    let req = validate_request(&form("SPY", &max, &max)).unwrap();
    let err = h.pipeline.run(&req).await.unwrap_err();
    assert!(matches!(err, PipelineError::ModelFit(_)), "{err:?}");
    assert_eq!(err.title(), "Error");

    // the pipeline keeps working afterwards
    let ok = validate_request(&form("SPY", "1", "1")).unwrap();
    assert_eq!(h.pipeline.run(&ok).await.unwrap().annualized.len(), 99);
}

#[tokio::test]
async fn zero_arch_order_is_a_model_fit_error() {
    let h = harness(price_path(100));
    for q in ["0", "1"] {
        let req = validate_request(&form("SPY", "0", q)).unwrap();
        match h.pipeline.run(&req).await {
            Err(PipelineError::ModelFit(msg)) => assert!(msg.contains("strictly positive"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[tokio::test]
async fn stages_are_reported_in_order() {
    let h = harness(price_path(40));
    let mut seen = Vec::new();
    let req = validate_request(&form("spy", "1", "1")).unwrap();
    h.pipeline.run_with_progress(&req, &mut |s: Stage| seen.push(s)).await.unwrap();
    assert_eq!(
        seen,
        vec![
            Stage::Fetching,
            Stage::Fitting { ticker: "SPY".into(), p: 1, q: 1, observations: 39 },
        ]
    );

    // no fit stage when the fetch comes back empty
    let mut seen = Vec::new();
    let req = validate_request(&form("NOPE", "1", "1")).unwrap();
    assert!(h.pipeline.run_with_progress(&req, &mut |s: Stage| seen.push(s)).await.is_err());
    assert_eq!(seen, vec![Stage::Fetching]);
}
