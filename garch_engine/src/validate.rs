/// validate.rs — Form input → AnalysisRequest
///
/// Runs before any external call.  Only the GARCH orders are checked; the
/// ticker is normalised and the dates are passed through untouched for the
/// market-data source to interpret.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const DEFAULT_TICKER: &str = "SPY";
pub const DEFAULT_START_DATE: &str = "2010-01-01";
pub const DEFAULT_END_DATE: &str = "2023-12-31";
pub const DEFAULT_ORDER: &str = "1";

/// Raw text the user typed into the five inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    pub ticker:     String,
    pub start_date: String,
    pub end_date:   String,
    pub p:          String,
    pub q:          String,
}

impl Default for FormInput {
    fn default() -> Self {
        Self {
            ticker:     DEFAULT_TICKER.into(),
            start_date: DEFAULT_START_DATE.into(),
            end_date:   DEFAULT_END_DATE.into(),
            p:          DEFAULT_ORDER.into(),
            q:          DEFAULT_ORDER.into(),
        }
    }
}

/// A validated run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Upper-cased symbol
    pub ticker:     String,
    pub start_date: String,
    pub end_date:   String,
    /// ARCH order
    pub p:          usize,
    /// GARCH order
    pub q:          usize,
}

pub fn validate_request(input: &FormInput) -> Result<AnalysisRequest, PipelineError> {
    let invalid = || PipelineError::InvalidOrder { p: input.p.clone(), q: input.q.clone() };
    let p = parse_order(&input.p).ok_or_else(invalid)?;
    let q = parse_order(&input.q).ok_or_else(invalid)?;

    Ok(AnalysisRequest {
        ticker:     input.ticker.trim().to_uppercase(),
        start_date: input.start_date.trim().to_owned(),
        end_date:   input.end_date.trim().to_owned(),
        p,
        q,
    })
}

fn parse_order(text: &str) -> Option<usize> {
    let n: i64 = text.trim().parse().ok()?;
    usize::try_from(n).ok()
}
