/// main.rs — GARCH Volatility Explorer entry point
///
/// Usage:
///   cargo run --bin garch_app -- run --ticker SPY --start-date 2010-01-01 --end-date 2023-12-31 -p 1 -q 1
///   cargo run --bin garch_app -- interactive
///   cargo run --bin garch_app -- --help

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use garch_app::{ChartReport, ReportConfig, Session, notification};
use garch_engine::validate::{DEFAULT_END_DATE, DEFAULT_ORDER, DEFAULT_START_DATE, DEFAULT_TICKER};
use garch_engine::{AnalysisPipeline, EngineConfig, FormInput};

#[derive(Parser)]
#[command(name = "garch_app")]
#[command(about = "GARCH Volatility Explorer - fit GARCH(p,q) to daily returns and chart annualized volatility")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one analysis and exit
    Run {
        /// Ticker symbol (e.g., SPY)
        #[arg(short, long, default_value = DEFAULT_TICKER)]
        ticker: String,

        /// Start date (YYYY-MM-DD)
        #[arg(short, long, default_value = DEFAULT_START_DATE)]
        start_date: String,

        /// End date (YYYY-MM-DD, exclusive)
        #[arg(short, long, default_value = DEFAULT_END_DATE)]
        end_date: String,

        /// ARCH order p
        #[arg(short, default_value = DEFAULT_ORDER, allow_hyphen_values = true)]
        p: String,

        /// GARCH order q
        #[arg(short, default_value = DEFAULT_ORDER, allow_hyphen_values = true)]
        q: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Prompt for inputs repeatedly; failures never end the session
    Interactive {
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Clone)]
pub struct OutputArgs {
    /// Output directory for charts and exports (defaults to REPORT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Skip the HTML chart
    #[arg(long)]
    no_html: bool,

    /// Skip the CSV export
    #[arg(long)]
    no_csv: bool,

    /// Skip the JSON export
    #[arg(long)]
    no_json: bool,
}

impl OutputArgs {
    fn report_config(&self, cfg: &EngineConfig) -> ReportConfig {
        ReportConfig {
            output_dir:  self.output_dir.clone().unwrap_or_else(|| PathBuf::from(&cfg.report_dir)),
            export_html: !self.no_html,
            export_csv:  !self.no_csv,
            export_json: !self.no_json,
        }
    }
}

/// Main application
pub struct ExplorerApp {
    cli:    Cli,
    config: EngineConfig,
}

impl ExplorerApp {
    pub fn new(cli: Cli, config: EngineConfig) -> Self {
        Self { cli, config }
    }

    pub async fn run(&self) -> Result<()> {
        let pipeline = AnalysisPipeline::from_config(&self.config)
            .context("building the analysis pipeline")?;
        let mut session = Session::new(pipeline);

        match &self.cli.command {
            Commands::Run { ticker, start_date, end_date, p, q, output } => {
                let form = FormInput {
                    ticker:     ticker.clone(),
                    start_date: start_date.clone(),
                    end_date:   end_date.clone(),
                    p:          p.clone(),
                    q:          q.clone(),
                };
                let report = ChartReport::new(output.report_config(&self.config));
                if !self.submit(&mut session, &report, &form).await? {
                    bail!("analysis failed");
                }
                Ok(())
            }
            Commands::Interactive { output } => {
                let report = ChartReport::new(output.report_config(&self.config));
                self.interactive(&mut session, &report).await
            }
        }
    }

    /// Run one form submission, print the panel and write the chart.
    /// Returns false when the pipeline reported an error.
    async fn submit(&self, session: &mut Session, report: &ChartReport, form: &FormInput) -> Result<bool> {
        let ok = match session.submit(form).await {
            Ok(result) => {
                let files = report.render(result)?;
                if let Some(html) = files.html {
                    info!("Chart: {}", html.display());
                }
                true
            }
            Err(e) => {
                eprintln!("{}", notification(&e));
                false
            }
        };
        println!("{}", session.panel().text());
        Ok(ok)
    }

    async fn interactive(&self, session: &mut Session, report: &ChartReport) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut form = FormInput::default();

        println!("GARCH Volatility Explorer. Press Enter to keep a value, Ctrl-D to quit.");
        loop {
            let Some(ticker) = prompt(&mut lines, "Ticker", &form.ticker).await? else { break };
            let Some(start) = prompt(&mut lines, "Start Date (YYYY-MM-DD)", &form.start_date).await? else { break };
            let Some(end) = prompt(&mut lines, "End Date (YYYY-MM-DD)", &form.end_date).await? else { break };
            let Some(p) = prompt(&mut lines, "p (ARCH order)", &form.p).await? else { break };
            let Some(q) = prompt(&mut lines, "q (GARCH order)", &form.q).await? else { break };
            form = FormInput { ticker, start_date: start, end_date: end, p, q };

            if let Err(e) = self.submit(session, report, &form).await {
                // export failures are reported but never end the session
                error!("{:#}", e);
                eprintln!("Error: {e:#}");
            }
        }
        info!("Session closed");
        Ok(())
    }
}

/// Ask for one field; empty input keeps `current`.  `None` on end of input.
async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str, current: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{label} [{current}]: ").as_bytes()).await?;
    stdout.flush().await?;

    let Some(line) = lines.next_line().await.context("reading stdin")? else {
        return Ok(None);
    };
    let line = line.trim();
    Ok(Some(if line.is_empty() { current.to_owned() } else { line.to_owned() }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env().context("loading configuration")?;

    let app = ExplorerApp::new(cli, config);
    if let Err(e) = app.run().await {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["garch_app", "run"]).unwrap();
        match cli.command {
            Commands::Run { ticker, start_date, end_date, p, q, output } => {
                assert_eq!(ticker, "SPY");
                assert_eq!(start_date, "2010-01-01");
                assert_eq!(end_date, "2023-12-31");
                assert_eq!((p.as_str(), q.as_str()), ("1", "1"));
                assert!(output.output_dir.is_none());
                assert!(!output.no_html);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_accepts_negative_order_text() {
        let cli = Cli::try_parse_from(["garch_app", "run", "-t", "aapl", "-p", "-1", "-q", "2", "--no-csv"]).unwrap();
        match cli.command {
            Commands::Run { ticker, p, q, output, .. } => {
                assert_eq!(ticker, "aapl");
                assert_eq!(p, "-1");
                assert_eq!(q, "2");
                assert!(output.no_csv);
                let rc = output.report_config(&EngineConfig::default());
                assert!(!rc.export_csv && rc.export_html && rc.export_json);
                assert_eq!(rc.output_dir, PathBuf::from("./reports"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_interactive_parses() {
        let cli = Cli::try_parse_from(["garch_app", "interactive", "--output-dir", "/tmp/x"]).unwrap();
        assert!(matches!(cli.command, Commands::Interactive { .. }));
    }
}
