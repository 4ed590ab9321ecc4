/// models.rs — Volatility model capability
///
/// `VolatilityFitter` is the seam between the pipeline and an estimator.
/// The shipped estimator is [`garch::GarchMle`].

pub mod garch;
pub mod inference;
pub mod transforms;

use std::fmt;

use serde::Serialize;

use crate::data::SeriesPoint;

pub use garch::{FitError, FitOptions, GarchEstimates, GarchMle, GarchParams};
pub use inference::CoefficientStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeanModel {
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VolModel {
    Garch,
}

impl fmt::Display for MeanModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeanModel::Constant => f.write_str("Constant Mean"),
        }
    }
}

impl fmt::Display for VolModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolModel::Garch => f.write_str("GARCH"),
        }
    }
}

/// Outcome of one fit. `conditional_volatility` is aligned one-to-one with
/// the returns it was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub estimates:              GarchEstimates,
    pub summary_text:           String,
    pub conditional_volatility: Vec<SeriesPoint>,
}

pub trait VolatilityFitter: Send + Sync {
    fn fit(
        &self,
        returns: &[SeriesPoint],
        mean:    MeanModel,
        vol:     VolModel,
        p:       usize,
        q:       usize,
    ) -> Result<FitResult, FitError>;
}
