/// pipeline.rs — fetch → transform → fit → derive
///
/// ─────────────────────────────────────────────────────────────────────────
/// ANNUALIZED VOLATILITY (display transform)
/// ─────────────────────────────────────────────────────────────────────────
///
///   a_t = sqrt( σ_t · sqrt(D) ),   D = trading days per year (252)
///
///   σ_t is the fitted conditional volatility (a standard deviation, in %).
///   The transform is applied exactly as written; it is not the textbook
///   σ_t · sqrt(D).
/// ─────────────────────────────────────────────────────────────────────────
///
/// Each stage short-circuits: no transform on an empty fetch, no fit on an
/// empty return series.  The pipeline holds no state between runs.

use serde::Serialize;
use tracing::{error, info};

use crate::config::{EngineConfig, DEFAULT_TRADING_DAYS};
use crate::data::{pct_returns, MarketDataSource, ReturnSeries, SeriesPoint};
use crate::error::PipelineError;
use crate::models::{FitResult, MeanModel, VolModel, VolatilityFitter};
use crate::validate::AnalysisRequest;

/// Progress notifications emitted while a run advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// About to request prices.
    Fetching,
    /// Prices arrived and returns were computed; the fit starts next.
    Fitting { ticker: String, p: usize, q: usize, observations: usize },
}

/// Everything one successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub request:    AnalysisRequest,
    pub returns:    ReturnSeries,
    pub fit:        FitResult,
    pub annualized: Vec<SeriesPoint>,
}

impl AnalysisResult {
    /// Chart title for this run.
    pub fn title(&self) -> String {
        chart_title(&self.request)
    }
}

pub fn chart_title(req: &AnalysisRequest) -> String {
    format!(
        "{} Returns and GARCH({},{}) Annualized Conditional Volatility",
        req.ticker, req.p, req.q
    )
}

/// sqrt(v · sqrt(trading_days)) for every point.
pub fn annualize(cond_vol: &[SeriesPoint], trading_days: f64) -> Vec<SeriesPoint> {
    let factor = trading_days.sqrt();
    cond_vol
        .iter()
        .map(|p| SeriesPoint { date: p.date, value: (p.value * factor).sqrt() })
        .collect()
}

pub struct AnalysisPipeline {
    source:       Box<dyn MarketDataSource>,
    fitter:       Box<dyn VolatilityFitter>,
    trading_days: f64,
}

impl AnalysisPipeline {
    pub fn new(source: Box<dyn MarketDataSource>, fitter: Box<dyn VolatilityFitter>) -> Self {
        Self { source, fitter, trading_days: DEFAULT_TRADING_DAYS }
    }

    pub fn with_trading_days(mut self, trading_days: f64) -> Self {
        self.trading_days = trading_days;
        self
    }

    /// Pipeline wired to the configured HTTP source and MLE fitter.
    pub fn from_config(cfg: &EngineConfig) -> Result<Self, PipelineError> {
        let source = crate::data::YahooChartClient::from_config(cfg)?;
        let fitter = crate::models::GarchMle::new(crate::models::FitOptions {
            max_iter:     cfg.garch_max_iter,
            sd_tolerance: cfg.garch_sd_tolerance,
        });
        Ok(Self::new(Box::new(source), Box::new(fitter)).with_trading_days(cfg.trading_days))
    }

    pub async fn run(&self, req: &AnalysisRequest) -> Result<AnalysisResult, PipelineError> {
        self.run_with_progress(req, &mut |_| {}).await
    }

    /// Same as [`AnalysisPipeline::run`], reporting each stage to `progress`.
    pub async fn run_with_progress(
        &self,
        req:      &AnalysisRequest,
        progress: &mut (dyn FnMut(Stage) + Send),
    ) -> Result<AnalysisResult, PipelineError> {
        let result = self.run_stages(req, progress).await;
        if let Err(e) = &result {
            error!("{} analysis failed: {}", req.ticker, e);
        }
        result
    }

    async fn run_stages(
        &self,
        req:      &AnalysisRequest,
        progress: &mut (dyn FnMut(Stage) + Send),
    ) -> Result<AnalysisResult, PipelineError> {
        // ── fetch ──
        progress(Stage::Fetching);
        let prices = self
            .source
            .fetch_close_prices(&req.ticker, &req.start_date, &req.end_date)
            .await?;
        if prices.is_empty() {
            return Err(PipelineError::NoData { ticker: req.ticker.clone() });
        }
        info!("{}: {} closes fetched", req.ticker, prices.len());

        // ── transform ──
        let returns = pct_returns(&prices);
        if returns.is_empty() {
            return Err(PipelineError::InsufficientData);
        }

        // ── fit ──
        progress(Stage::Fitting {
            ticker:       req.ticker.clone(),
            p:            req.p,
            q:            req.q,
            observations: returns.len(),
        });
        let fit = self
            .fitter
            .fit(&returns, MeanModel::Constant, VolModel::Garch, req.p, req.q)?;

        // ── derive ──
        let annualized = annualize(&fit.conditional_volatility, self.trading_days);
        info!("{}: GARCH({},{}) fitted on {} returns", req.ticker, req.p, req.q, returns.len());

        Ok(AnalysisResult { request: req.clone(), returns, fit, annualized })
    }
}
