/// session.rs — Form session: inputs → pipeline → panel
///
/// Owns every piece of mutable display state.  Each submission clears the
/// panel and the previous result first, so a failed run never leaves a stale
/// chart or summary behind.  The session stays usable after any failure.

use tracing::error;

use garch_engine::{validate_request, AnalysisPipeline, AnalysisResult, FormInput, PipelineError, Stage};

use crate::panel::OutputPanel;

pub struct Session {
    pipeline: AnalysisPipeline,
    panel:    OutputPanel,
    last:     Option<AnalysisResult>,
}

impl Session {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self { pipeline, panel: OutputPanel::new(), last: None }
    }

    pub fn panel(&self) -> &OutputPanel {
        &self.panel
    }

    pub fn last_result(&self) -> Option<&AnalysisResult> {
        self.last.as_ref()
    }

    /// Validate and run one analysis.
    pub async fn submit(&mut self, form: &FormInput) -> Result<&AnalysisResult, PipelineError> {
        self.panel.clear();
        self.last = None;

        let outcome = match validate_request(form) {
            Ok(req) => {
                let panel = &mut self.panel;
                self.pipeline
                    .run_with_progress(&req, &mut |stage: Stage| panel.show_stage(&stage))
                    .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                self.panel.show_result(&result);
                Ok(self.last.insert(result))
            }
            Err(e) => {
                error!("{}: {}", e.title(), e);
                self.panel.show_error(&e);
                Err(e)
            }
        }
    }
}

/// One-line blocking notification for a failed run.
pub fn notification(err: &PipelineError) -> String {
    format!("{}: {}", err.title(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};
    use garch_engine::data::DataSourceError;
    use garch_engine::{GarchMle, MarketDataSource, PriceSeries, PricePoint};

    struct OneTicker;

    #[async_trait]
    impl MarketDataSource for OneTicker {
        async fn fetch_close_prices(&self, ticker: &str, _: &str, _: &str) -> Result<PriceSeries, DataSourceError> {
            if ticker != "SPY" {
                return Ok(Vec::new());
            }
            let d0 = NaiveDate::from_ymd_opt(2015, 6, 1).unwrap();
            Ok((0..60)
                .map(|i| {
                    let wobble = ((i * 7919) % 13) as f64 - 6.0;
                    PricePoint { date: d0 + Duration::days(i), close: 200.0 + wobble + 0.1 * i as f64 }
                })
                .collect())
        }
    }

    fn session() -> Session {
        Session::new(AnalysisPipeline::new(Box::new(OneTicker), Box::new(GarchMle::default())))
    }

    fn form(ticker: &str, p: &str) -> FormInput {
        FormInput { ticker: ticker.into(), p: p.into(), ..FormInput::default() }
    }

    #[tokio::test]
    async fn failure_clears_previous_result_and_reports_error() {
        let mut s = session();
        assert!(s.submit(&form("spy", "1")).await.is_ok());
        assert!(s.last_result().is_some());
        let text = s.panel().text();
        assert!(text.starts_with("Fetching data...\nData fetched for SPY. Running GARCH(1,1) model...\n"));
        assert!(text.contains("Constant Mean - GARCH Model Results"));
        assert!(text.contains("Conditional Volatility (Annualized):"));

        let err = s.submit(&form("NOPE", "1")).await.unwrap_err();
        assert!(s.last_result().is_none());
        assert_eq!(
            s.panel().text(),
            "Fetching data...\n\nError: No data found for NOPE in the specified date range.\n"
        );
        assert_eq!(notification(&err), "Data Error: No data found for NOPE in the specified date range.");
    }

    #[tokio::test]
    async fn invalid_order_then_valid_run_succeeds() {
        let mut s = session();
        let err = s.submit(&form("SPY", "-1")).await.unwrap_err();
        assert!(notification(&err).starts_with("Input Error: "));
        assert!(s.panel().text().starts_with("\nError: "));
        assert!(!s.panel().text().contains("Fetching data..."));

        let result = s.submit(&form("SPY", "1")).await.unwrap();
        assert_eq!(result.annualized.len(), 59);
        assert!(!s.panel().text().contains("Error: "));
    }
}
