/// lib.rs — GARCH Volatility Explorer presentation layer
///
/// Text panel, interactive session and chart/report rendering on top of the
/// `garch_engine` pipeline.

pub mod panel;
pub mod report;
pub mod session;

pub use panel::OutputPanel;
pub use report::{ChartReport, ReportConfig, ReportFiles};
pub use session::{notification, Session};
