/// error.rs — Pipeline error taxonomy
///
/// Every failure of a validate → fetch → transform → fit run is reported as
/// exactly one of these variants.  Callers branch on the variant, never on
/// the message text.  All variants are recoverable: the caller may re-prompt
/// and run again.

use thiserror::Error;

use crate::data::DataSourceError;
use crate::models::FitError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// p / q were not non-negative integers.  Raised before any external call.
    #[error("GARCH orders p and q must be non-negative integers (got p={p:?}, q={q:?}).")]
    InvalidOrder { p: String, q: String },

    /// The ticker / date-range combination yielded no prices.
    #[error("No data found for {ticker} in the specified date range.")]
    NoData { ticker: String },

    /// A single price point: nothing to difference against.
    #[error("Not enough data to calculate returns.")]
    InsufficientData,

    /// The volatility fitter raised; message preserved verbatim.
    #[error("GARCH model fit failed: {0}")]
    ModelFit(String),

    /// Anything else (transport failures, malformed responses, ...).
    #[error("An error occurred: {0}")]
    Unknown(String),
}

impl PipelineError {
    /// Title of the blocking notification shown for this error.
    pub fn title(&self) -> &'static str {
        match self {
            PipelineError::InvalidOrder { .. } => "Input Error",
            PipelineError::NoData { .. } | PipelineError::InsufficientData => "Data Error",
            PipelineError::ModelFit(_) | PipelineError::Unknown(_) => "Error",
        }
    }
}

impl From<FitError> for PipelineError {
    fn from(e: FitError) -> Self {
        PipelineError::ModelFit(e.to_string())
    }
}

impl From<DataSourceError> for PipelineError {
    fn from(e: DataSourceError) -> Self {
        PipelineError::Unknown(format!("market data fetch failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_follow_error_class() {
        let bad = PipelineError::InvalidOrder { p: "-1".into(), q: "1".into() };
        assert_eq!(bad.title(), "Input Error");
        assert_eq!(PipelineError::InsufficientData.title(), "Data Error");
        assert_eq!(PipelineError::ModelFit("x".into()).title(), "Error");
    }

    #[test]
    fn fit_error_message_is_preserved() {
        let e: PipelineError = FitError::DegenerateSeries.into();
        match e {
            PipelineError::ModelFit(msg) => assert!(msg.contains("zero variance")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
