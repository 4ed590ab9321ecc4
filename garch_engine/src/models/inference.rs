// models/inference.rs — Standard errors and coefficient statistics
//
// Classical MLE inference from the observed information:
//
//     J(θ̂) = ∇ [−∇ℓ(θ)] |_{θ = θ̂}    (central differences of the analytic score)
//     Var(θ̂_i) = Σ_{k: λ_k > ε} Q[i,k]² / λ_k   with J = Q Λ Qᵀ
//
// Eigenvalues at or below `EIGEN_EPS` are dropped (pseudo-inverse), which
// leaves weakly identified directions with inflated, not infinite, errors.

use finitediff::FiniteDiff;
use nalgebra::DMatrix;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

pub const EIGEN_EPS: f64 = 1e-10;

/// z-value for a two-sided 95% interval.
const Z_95: f64 = 1.959_963_984_540_054;

/// Per-coefficient estimate, error and Wald statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientStats {
    pub name:    String,
    pub coef:    f64,
    pub std_err: f64,
    pub t_stat:  f64,
    pub p_value: f64,
    pub ci_low:  f64,
    pub ci_high: f64,
}

impl CoefficientStats {
    pub fn new(name: &str, coef: f64, std_err: f64) -> Self {
        let t_stat = if std_err > 0.0 { coef / std_err } else { f64::NAN };
        let p_value = two_sided_p(t_stat);
        Self {
            name: name.to_owned(),
            coef,
            std_err,
            t_stat,
            p_value,
            ci_low:  coef - Z_95 * std_err,
            ci_high: coef + Z_95 * std_err,
        }
    }
}

/// Two-sided p-value under N(0,1); NaN for a NaN statistic.
pub fn two_sided_p(t: f64) -> f64 {
    if !t.is_finite() {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        Ok(n) => 2.0 * (1.0 - n.cdf(t.abs())),
        Err(_) => f64::NAN,
    }
}

/// Standard errors of `params` given the gradient of the negative
/// log-likelihood.
///
/// Returns NaN entries when the Hessian cannot be evaluated (non-finite).
pub fn standard_errors<G>(nll_grad: &G, params: &[f64]) -> Vec<f64>
where
    G: Fn(&Vec<f64>) -> Vec<f64>,
{
    let n = params.len();
    if n == 0 {
        return Vec::new();
    }
    let x = params.to_vec();
    let hess: Vec<Vec<f64>> = x.central_hessian(nll_grad);

    if hess.len() != n || hess.iter().any(|row| row.len() != n || row.iter().any(|v| !v.is_finite())) {
        return vec![f64::NAN; n];
    }

    // symmetrise while copying into nalgebra
    let info = DMatrix::from_fn(n, n, |i, j| 0.5 * (hess[i][j] + hess[j][i]));
    pseudo_inverse_diag(info).into_iter().map(f64::sqrt).collect()
}

/// Diagonal of the eigen pseudo-inverse of a symmetric matrix.
fn pseudo_inverse_diag(info: DMatrix<f64>) -> Vec<f64> {
    let n = info.nrows();
    let eig = info.symmetric_eigen();
    let q = eig.eigenvectors;
    (0..n)
        .map(|i| {
            eig.eigenvalues
                .iter()
                .enumerate()
                .filter(|(_, lambda)| **lambda > EIGEN_EPS)
                .map(|(k, &lambda)| q[(i, k)] * q[(i, k)] / lambda)
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_matches_analytic_errors() {
        // −ℓ = ½ (4 x² + y²)  →  J = diag(4, 1)  →  SE = (0.5, 1)
        let grad = |p: &Vec<f64>| vec![4.0 * p[0], p[1]];
        let se = standard_errors(&grad, &[0.3, -0.2]);
        assert!((se[0] - 0.5).abs() < 1e-4, "se = {se:?}");
        assert!((se[1] - 1.0).abs() < 1e-4, "se = {se:?}");
    }

    #[test]
    fn flat_direction_is_dropped_not_infinite() {
        let grad = |p: &Vec<f64>| vec![p[0], 0.0];
        let se = standard_errors(&grad, &[0.0, 5.0]);
        assert!((se[0] - 1.0).abs() < 1e-4);
        assert!(se[1].abs() < 1e-6);
    }

    #[test]
    fn coefficient_stats_two_sided() {
        let c = CoefficientStats::new("mu", 1.96, 1.0);
        assert!((c.p_value - 0.05).abs() < 1e-3);
        assert!((c.ci_low - 0.0).abs() < 1e-2);
        let z = CoefficientStats::new("omega", 0.0, 0.0);
        assert!(z.t_stat.is_nan());
        assert!(z.p_value.is_nan());
    }
}
