/// report.rs — Chart and export rendering
///
/// Writes one self-contained HTML page per run (inline SVG line chart of
/// returns and annualized conditional volatility plus the model summary),
/// and optionally the underlying series as CSV and the full result as JSON.
///
/// File stem: `<TICKER>_garch_<p>_<q>`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use garch_engine::{AnalysisResult, SeriesPoint};

// ── Chart geometry ──
const CHART_W: f64 = 1000.0;
const CHART_H: f64 = 420.0;
const MARGIN_L: f64 = 60.0;
const MARGIN_R: f64 = 20.0;
const MARGIN_T: f64 = 40.0;
const MARGIN_B: f64 = 50.0;
const Y_TICKS: usize = 6;
const X_TICKS: usize = 8;

const RETURNS_COLOR: &str = "#7f7f7f";
const VOL_COLOR: &str = "#d62728";

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_dir:  PathBuf,
    pub export_html: bool,
    pub export_csv:  bool,
    pub export_json: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir:  PathBuf::from("./reports"),
            export_html: true,
            export_csv:  true,
            export_json: true,
        }
    }
}

/// Paths written by one [`ChartReport::render`] call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReportFiles {
    pub html: Option<PathBuf>,
    pub csv:  Option<PathBuf>,
    pub json: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    title:  String,
    result: &'a AnalysisResult,
}

pub struct ChartReport {
    config: ReportConfig,
}

impl ChartReport {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn render(&self, result: &AnalysisResult) -> Result<ReportFiles> {
        fs::create_dir_all(&self.config.output_dir)
            .with_context(|| format!("creating {}", self.config.output_dir.display()))?;

        let stem = file_stem(result);
        let mut files = ReportFiles::default();

        if self.config.export_html {
            let path = self.path(&stem, "html");
            fs::write(&path, html_page(result)).with_context(|| format!("writing {}", path.display()))?;
            info!("HTML chart exported to: {}", path.display());
            files.html = Some(path);
        }

        if self.config.export_csv {
            let path = self.path(&stem, "csv");
            export_csv(result, &path)?;
            info!("CSV series exported to: {}", path.display());
            files.csv = Some(path);
        }

        if self.config.export_json {
            let path = self.path(&stem, "json");
            let doc = JsonReport { title: result.title(), result };
            fs::write(&path, serde_json::to_string_pretty(&doc)?)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("JSON report exported to: {}", path.display());
            files.json = Some(path);
        }

        Ok(files)
    }

    fn path(&self, stem: &str, ext: &str) -> PathBuf {
        self.config.output_dir.join(format!("{stem}.{ext}"))
    }
}

/// `<TICKER>_garch_<p>_<q>` with characters unsafe in file names replaced.
pub fn file_stem(result: &AnalysisResult) -> String {
    let ticker: String = result
        .request
        .ticker
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    format!("{}_garch_{}_{}", ticker, result.request.p, result.request.q)
}

fn export_csv(result: &AnalysisResult, path: &Path) -> Result<()> {
    let mut df = df!(
        "date" => result.returns.iter()
            .map(|p| p.date.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>(),
        "return_pct" => result.returns.iter()
            .map(|p| p.value)
            .collect::<Vec<_>>(),
        "conditional_volatility" => result.fit.conditional_volatility.iter()
            .map(|p| p.value)
            .collect::<Vec<_>>(),
        "annualized_volatility" => result.annualized.iter()
            .map(|p| p.value)
            .collect::<Vec<_>>(),
    )?;

    let mut file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

// ── HTML / SVG ───────────────────────────────────────────────────────────

fn html_page(result: &AnalysisResult) -> String {
    let title = escape(&result.title());
    format!(r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; }}
        .header {{ background-color: #f0f0f0; padding: 20px; border-radius: 5px; }}
        .section {{ margin: 20px 0; }}
        pre {{ background-color: #f9f9f9; padding: 15px; border-radius: 5px; font-size: 0.85em; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>{title}</h1>
        <p>Period: {start} to {end} | Observations: {n}</p>
    </div>
    <div class="section">
{svg}
    </div>
    <div class="section">
        <h2>Model Summary</h2>
        <pre>{summary}</pre>
    </div>
</body>
</html>
"#,
        start = escape(&result.request.start_date),
        end = escape(&result.request.end_date),
        n = result.returns.len(),
        svg = svg_chart(&result.returns, &result.annualized, &result.title()),
        summary = escape(&result.fit.summary_text),
    )
}

/// Line chart of both series on a shared value axis.
pub fn svg_chart(returns: &[SeriesPoint], annualized: &[SeriesPoint], title: &str) -> String {
    let plot_w = CHART_W - MARGIN_L - MARGIN_R;
    let plot_h = CHART_H - MARGIN_T - MARGIN_B;
    let n = returns.len().max(annualized.len());

    let (lo, hi) = returns
        .iter()
        .chain(annualized)
        .map(|p| p.value)
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let (lo, hi) = if lo.is_finite() && hi > lo { (lo, hi) } else { (lo.min(0.0) - 1.0, hi.max(0.0) + 1.0) };
    let (lo, hi) = if lo.is_finite() && hi.is_finite() { (lo, hi) } else { (-1.0, 1.0) };

    let x = |i: usize| MARGIN_L + plot_w * i as f64 / (n.max(2) - 1) as f64;
    let y = |v: f64| MARGIN_T + plot_h * (hi - v) / (hi - lo);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{CHART_W}" height="{CHART_H}" viewBox="0 0 {CHART_W} {CHART_H}" font-family="Arial, sans-serif" font-size="11">"#
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="20" text-anchor="middle" font-size="14">{}</text>"#,
        CHART_W / 2.0,
        escape(title)
    );

    // grid + y labels
    for k in 0..=Y_TICKS {
        let v = lo + (hi - lo) * k as f64 / Y_TICKS as f64;
        let yy = y(v);
        let _ = writeln!(
            svg,
            r##"<line x1="{MARGIN_L}" y1="{yy:.1}" x2="{:.1}" y2="{yy:.1}" stroke="#cccccc" stroke-dasharray="4,3"/>"##,
            MARGIN_L + plot_w
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{v:.2}</text>"#,
            MARGIN_L - 6.0,
            yy + 4.0
        );
    }

    // x labels from the returns dates
    if n > 0 {
        let dates = if returns.len() >= annualized.len() { returns } else { annualized };
        let ticks = X_TICKS.min(n);
        for k in 0..ticks {
            let i = if ticks > 1 { k * (n - 1) / (ticks - 1) } else { 0 };
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                x(i),
                MARGIN_T + plot_h + 18.0,
                dates[i].date.format("%Y-%m-%d")
            );
        }
    }
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">Date</text>"#,
        MARGIN_L + plot_w / 2.0,
        CHART_H - 8.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="14" y="{:.1}" text-anchor="middle" transform="rotate(-90 14 {:.1})">Value (%)</text>"#,
        MARGIN_T + plot_h / 2.0,
        MARGIN_T + plot_h / 2.0
    );

    // axes
    let _ = writeln!(
        svg,
        r##"<rect x="{MARGIN_L}" y="{MARGIN_T}" width="{plot_w:.1}" height="{plot_h:.1}" fill="none" stroke="#333333"/>"##
    );

    for (series, color, width) in [(returns, RETURNS_COLOR, 0.8), (annualized, VOL_COLOR, 1.4)] {
        let points = series
            .iter()
            .enumerate()
            .filter(|(_, p)| p.value.is_finite())
            .map(|(i, p)| format!("{:.1},{:.1}", x(i), y(p.value)))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{color}" stroke-width="{width}" points="{points}"/>"#
        );
    }

    // legend
    let lx = MARGIN_L + 10.0;
    for (k, (label, color)) in [("Returns (%)", RETURNS_COLOR), ("Annualized Conditional Volatility (%)", VOL_COLOR)]
        .iter()
        .enumerate()
    {
        let ly = MARGIN_T + 14.0 + 16.0 * k as f64;
        let _ = writeln!(
            svg,
            r#"<line x1="{lx}" y1="{ly}" x2="{}" y2="{ly}" stroke="{color}" stroke-width="2"/><text x="{}" y="{}">{label}</text>"#,
            lx + 20.0,
            lx + 26.0,
            ly + 4.0
        );
    }

    svg.push_str("</svg>");
    svg
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
