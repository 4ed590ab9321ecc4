/// lib.rs — GARCH Volatility Engine
///
/// Market data, percentage returns, GARCH(p,q) estimation and the
/// validate → fetch → fit pipeline behind the explorer front end.

pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod summary;
pub mod validate;

pub use config::EngineConfig;
pub use data::{MarketDataSource, PricePoint, PriceSeries, ReturnSeries, SeriesPoint, YahooChartClient};
pub use error::PipelineError;
pub use models::{FitResult, GarchMle, MeanModel, VolModel, VolatilityFitter};
pub use pipeline::{AnalysisPipeline, AnalysisResult, Stage};
pub use validate::{validate_request, AnalysisRequest, FormInput};
