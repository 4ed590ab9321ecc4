/// panel.rs — Text output panel
///
/// The single scrolling text area of the explorer: cleared at the start of
/// every run, then filled with the model summary and the annualized
/// volatility series, or with the error of a failed run.

use std::fmt::Write;

use garch_engine::{AnalysisResult, PipelineError, SeriesPoint, Stage};

#[derive(Debug, Default, Clone)]
pub struct OutputPanel {
    text: String,
}

impl OutputPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn append(&mut self, s: &str) {
        self.text.push_str(s);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Progress line for a pipeline stage.
    pub fn show_stage(&mut self, stage: &Stage) {
        match stage {
            Stage::Fetching => self.append("Fetching data...\n"),
            Stage::Fitting { ticker, p, q, .. } => {
                self.append(&format!("Data fetched for {ticker}. Running GARCH({p},{q}) model...\n"))
            }
        }
    }

    /// Summary followed by the annualized conditional volatility.
    pub fn show_result(&mut self, result: &AnalysisResult) {
        self.append(&result.fit.summary_text);
        self.append("\nConditional Volatility (Annualized):\n");
        self.append(&format_series(&result.annualized));
    }

    pub fn show_error(&mut self, err: &PipelineError) {
        self.append(&format!("\nError: {err}\n"));
    }
}

/// One `date    value` row per point.
pub fn format_series(series: &[SeriesPoint]) -> String {
    let mut out = String::new();
    for p in series {
        let _ = writeln!(out, "{}    {:.6}", p.date.format("%Y-%m-%d"), p.value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(n: usize) -> Vec<SeriesPoint> {
        let d0 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..n)
            .map(|i| SeriesPoint { date: d0 + Duration::days(i as i64), value: i as f64 / 10.0 })
            .collect()
    }

    #[test]
    fn short_series_listed_in_full() {
        let text = format_series(&series(3));
        assert_eq!(text, "2020-01-01    0.000000\n2020-01-02    0.100000\n2020-01-03    0.200000\n");
    }

    #[test]
    fn long_series_lists_every_row() {
        let s = series(3_500);
        let text = format_series(&s);
        assert_eq!(text.lines().count(), 3_500);
        for (line, p) in text.lines().zip(&s) {
            assert!(line.starts_with(&p.date.format("%Y-%m-%d").to_string()));
        }
        assert!(text.contains("349.900000"));
        assert!(!text.contains("..."));
        assert!(!text.contains("Length"));
    }

    #[test]
    fn stage_lines_match_progress() {
        let mut panel = OutputPanel::new();
        panel.show_stage(&Stage::Fetching);
        panel.show_stage(&Stage::Fitting { ticker: "SPY".into(), p: 2, q: 1, observations: 10 });
        assert_eq!(panel.text(), "Fetching data...\nData fetched for SPY. Running GARCH(2,1) model...\n");
    }

    #[test]
    fn error_is_appended_not_replacing() {
        let mut panel = OutputPanel::new();
        panel.append("earlier");
        panel.show_error(&PipelineError::InsufficientData);
        assert_eq!(panel.text(), "earlier\nError: Not enough data to calculate returns.\n");
        panel.clear();
        assert!(panel.is_empty());
    }
}
