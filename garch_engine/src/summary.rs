/// summary.rs — Plain-text model report
///
/// Layout:
///
///   title (centred)
///   ═══════
///   header block, two columns of `label ........ value`
///   Mean Model table
///   Volatility Model table
///   covariance note
///
/// Table columns: coef, std err, t, P>|t|, 95% confidence interval.

use std::fmt::Write;

use crate::models::{CoefficientStats, GarchEstimates, MeanModel, VolModel};

const WIDTH: usize = 78;
const HALF: usize = 39;

/// Render the report for one fit. `dep_var` names the fitted series.
pub fn render(est: &GarchEstimates, mean: MeanModel, vol: VolModel, dep_var: &str) -> String {
    let mut out = String::new();
    let title = format!("{mean} - {vol} Model Results");

    let _ = writeln!(out, "{title:^WIDTH$}");
    out.push_str(&"=".repeat(WIDTH));
    out.push('\n');

    let order = format!("{vol}({},{})", est.p(), est.q());
    let left = [
        ("Dep. Variable:", dep_var.to_owned()),
        ("Mean Model:", mean.to_string()),
        ("Vol Model:", order),
        ("Distribution:", "Normal".to_owned()),
        ("Method:", "Maximum Likelihood".to_owned()),
        ("Optimizer:", "Nelder-Mead".to_owned()),
        ("Status:", est.status.clone()),
        ("Iterations:", est.iterations.to_string()),
    ];
    let right = [
        ("Log-Likelihood:", format!("{:.3}", est.log_likelihood)),
        ("AIC:", format!("{:.3}", est.aic)),
        ("BIC:", format!("{:.3}", est.bic)),
        ("No. Observations:", est.n_obs.to_string()),
        ("Df Residuals:", est.n_obs.saturating_sub(1).to_string()),
        ("Df Model:", "1".to_owned()),
        ("Persistence:", format!("{:.4}", est.params.persistence())),
        ("", String::new()),
    ];
    for ((ll, lv), (rl, rv)) in left.iter().zip(right.iter()) {
        let line = format!("{} {}", cell(ll, lv, HALF - 1), cell(rl, rv, HALF));
        let _ = writeln!(out, "{}", line.trim_end());
    }

    let (mean_rows, vol_rows) = est.coefficients.split_at(1.min(est.coefficients.len()));
    table(&mut out, "Mean Model", mean_rows);
    table(&mut out, "Volatility Model", vol_rows);

    out.push('\n');
    out.push_str("Covariance estimator: classic (inverse observed information)\n");
    if !est.converged {
        out.push_str("WARNING: optimizer did not report convergence; estimates may be unreliable.\n");
    }
    out
}

/// `label value`, value right-aligned so the cell spans `width` columns.
fn cell(label: &str, value: &str, width: usize) -> String {
    let pad = width.saturating_sub(label.chars().count() + 1);
    format!("{label} {value:>pad$}")
}

fn table(out: &mut String, heading: &str, rows: &[CoefficientStats]) {
    let _ = writeln!(out, "{heading:^WIDTH$}");
    out.push_str(&"=".repeat(WIDTH));
    out.push('\n');
    let _ = writeln!(
        out,
        "{:<12}{:>10}{:>11}{:>9}{:>11}{:>25}",
        "", "coef", "std err", "t", "P>|t|", "95.0% Conf. Int."
    );
    out.push_str(&"-".repeat(WIDTH));
    out.push('\n');
    for c in rows {
        let ci = format!("[{},{}]", sci(c.ci_low), sci(c.ci_high));
        let _ = writeln!(
            out,
            "{:<12}{:>10.4}{:>11}{:>9.3}{:>11}{:>25}",
            c.name,
            c.coef,
            sci(c.std_err),
            c.t_stat,
            sci(c.p_value),
            ci
        );
    }
}

/// Compact scientific notation, `nan` for missing values.
fn sci(x: f64) -> String {
    if x.is_finite() { format!("{x:.3e}") } else { "nan".to_owned() }
}
