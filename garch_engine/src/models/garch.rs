// models/garch.rs — Constant-mean GARCH(p,q) estimated by maximum likelihood
//
// ─────────────────────────────────────────────────────────────────────────
// MATHEMATICAL SPECIFICATION
// ─────────────────────────────────────────────────────────────────────────
//
// GARCH(p,q): Bollerslev (1986), constant mean, normal innovations
//
//   Return innovation:  ε_t = r_t − μ
//   Conditional variance:
//
//       σ²_t = ω  +  Σ_{i=1..p} α_i · ε²_{t−i}  +  Σ_{j=1..q} β_j · σ²_{t−j}
//
//   Pre-sample ε² and σ² are replaced by the backcast
//
//       σ̄² = Σ_{k<τ} w_k ε̃²_k,   w_k ∝ 0.94^k,   τ = min(75, n)
//
//   computed once from the demeaned returns ε̃ = r − r̄.
//
//   Constraints (covariance stationarity):
//     ω > 0,  α_i ≥ 0,  β_j ≥ 0,  Σα + Σβ < 1
//
//   Log-likelihood:
//       ℓ(θ) = −½ Σ_t [ ln 2π + ln σ²_t + ε²_t / σ²_t ]
//
//   Score (used for the observed information):
//       ∂(−ℓ)/∂θ = ½ Σ_t (1/σ²_t − ε²_t/σ⁴_t) · ∂σ²_t/∂θ   (− Σ ε_t/σ²_t for μ)
//
//   Information criteria (k = 2 + p + q):
//       AIC = −2ℓ + 2k,   BIC = −2ℓ + k·ln n
//
// ESTIMATION
//   Nelder-Mead over the unconstrained vector of `transforms`, started from
//   the best point of a small persistence grid and restarted once from its
//   own optimum.  Standard errors from the pseudo-inverse of the observed
//   information at θ̂.
// ─────────────────────────────────────────────────────────────────────────

use std::f64::consts::PI;

use argmin::core::{
    CostFunction, Error as ArgminError, Executor, State, TerminationReason, TerminationStatus,
};
use argmin::solver::neldermead::NelderMead;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::inference::{standard_errors, CoefficientStats};
use super::transforms::{inv_scaled_softmax, safe_softplus, safe_softplus_inv, scaled_softmax};
use super::{FitResult, MeanModel, VolModel, VolatilityFitter};
use crate::data::SeriesPoint;
use crate::summary;

/// Lower bound on σ²_t inside the recursion.
const VARIANCE_FLOOR: f64 = 1e-12;
/// Cost reported to the simplex for an unusable parameter vector.
const PENALTY_COST: f64 = 1e100;
const BACKCAST_DECAY: f64 = 0.94;
const BACKCAST_WINDOW: usize = 75;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("GARCH(0,{q}) is not identified: the ARCH order p must be strictly positive")]
    ZeroArchOrder { q: usize },

    #[error("GARCH({p},{q}) orders are too large to estimate")]
    OrderTooLarge { p: usize, q: usize },

    #[error("GARCH({p},{q}) has {k} parameters and needs more than {k} observations, got {n}")]
    TooFewObservations { p: usize, q: usize, k: usize, n: usize },

    #[error("returns contain a non-finite value at index {index}")]
    NonFiniteReturn { index: usize },

    #[error("returns have zero variance; nothing to model")]
    DegenerateSeries,

    #[error("optimizer failed: {0}")]
    Optimizer(String),

    #[error("optimizer returned no solution")]
    NoSolution,

    #[error("log-likelihood is not finite at the optimum")]
    NonFiniteLikelihood,
}

impl From<ArgminError> for FitError {
    fn from(e: ArgminError) -> Self {
        FitError::Optimizer(e.to_string())
    }
}

// ── Parameters ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GarchParams {
    /// μ: constant mean of returns
    pub mu:    f64,
    /// ω: variance intercept
    pub omega: f64,
    /// α_1..α_p: ARCH (shock) coefficients
    pub alpha: Vec<f64>,
    /// β_1..β_q: GARCH (persistence) coefficients
    pub beta:  Vec<f64>,
}

impl GarchParams {
    pub fn p(&self) -> usize {
        self.alpha.len()
    }

    pub fn q(&self) -> usize {
        self.beta.len()
    }

    /// Σα + Σβ
    pub fn persistence(&self) -> f64 {
        self.alpha.iter().sum::<f64>() + self.beta.iter().sum::<f64>()
    }

    /// σ²_∞ = ω / (1 − Σα − Σβ)
    pub fn long_run_variance(&self) -> f64 {
        self.omega / (1.0 - self.persistence())
    }

    /// Coefficient names in vector order: mu, omega, alpha[i], beta[j].
    pub fn names(p: usize, q: usize) -> Vec<String> {
        let mut names = vec!["mu".to_owned(), "omega".to_owned()];
        names.extend((1..=p).map(|i| format!("alpha[{i}]")));
        names.extend((1..=q).map(|j| format!("beta[{j}]")));
        names
    }

    /// Model-space vector [μ, ω, α.., β..].
    pub fn to_vec(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(2 + self.p() + self.q());
        v.push(self.mu);
        v.push(self.omega);
        v.extend_from_slice(&self.alpha);
        v.extend_from_slice(&self.beta);
        v
    }

    pub fn from_slice(p: usize, q: usize, v: &[f64]) -> Self {
        Self {
            mu:    v[0],
            omega: v[1],
            alpha: v[2..2 + p].to_vec(),
            beta:  v[2 + p..2 + p + q].to_vec(),
        }
    }

    /// Map an unconstrained optimiser vector into model space.
    pub fn from_theta(p: usize, q: usize, theta: &[f64]) -> Self {
        let mut weights = vec![0.0; p + q];
        scaled_softmax(&theta[2..2 + p + q], &mut weights);
        Self {
            mu:    theta[0],
            omega: safe_softplus(theta[1]).max(f64::MIN_POSITIVE),
            alpha: weights[..p].to_vec(),
            beta:  weights[p..].to_vec(),
        }
    }

    /// Inverse of [`GarchParams::from_theta`].
    pub fn to_theta(&self) -> Vec<f64> {
        let weights: Vec<f64> = self.alpha.iter().chain(&self.beta).copied().collect();
        let mut logits = vec![0.0; weights.len()];
        inv_scaled_softmax(&weights, &mut logits);
        let mut theta = Vec::with_capacity(2 + weights.len());
        theta.push(self.mu);
        theta.push(safe_softplus_inv(self.omega.max(1e-12)));
        theta.extend(logits);
        theta
    }

    /// Mean = sample mean, Σα / Σβ split evenly, ω matching sample variance.
    fn starting_values(p: usize, q: usize, mean: f64, var: f64, alpha_total: f64, beta_total: f64) -> Self {
        let alpha_total = if p > 0 { alpha_total } else { 0.0 };
        let beta_total  = if q > 0 { beta_total } else { 0.0 };
        let alpha = vec![alpha_total / p.max(1) as f64; p];
        let beta  = vec![beta_total / q.max(1) as f64; q];
        Self {
            mu:    mean,
            omega: var * (1.0 - alpha_total - beta_total),
            alpha,
            beta,
        }
    }
}

// ── Recursion & likelihood ───────────────────────────────────────────────

/// Exponentially weighted mean of the first τ squared residuals.
pub fn backcast(resids: &[f64]) -> f64 {
    let tau = resids.len().min(BACKCAST_WINDOW);
    if tau == 0 {
        return 0.0;
    }
    let mut num = 0.0;
    let mut den = 0.0;
    let mut w = 1.0;
    for e in &resids[..tau] {
        num += w * e * e;
        den += w;
        w *= BACKCAST_DECAY;
    }
    num / den
}

/// σ²_t for every observation.
pub fn conditional_variance(params: &GarchParams, returns: &[f64], backcast: f64) -> Vec<f64> {
    let mut sigma2 = Vec::with_capacity(returns.len());
    for t in 0..returns.len() {
        let mut s = params.omega;
        for (i, a) in params.alpha.iter().enumerate() {
            s += a * match t.checked_sub(i + 1) {
                Some(k) => (returns[k] - params.mu).powi(2),
                None => backcast,
            };
        }
        for (j, b) in params.beta.iter().enumerate() {
            s += b * match t.checked_sub(j + 1) {
                Some(k) => sigma2[k],
                None => backcast,
            };
        }
        sigma2.push(s.max(VARIANCE_FLOOR));
    }
    sigma2
}

/// Gaussian log-likelihood ℓ(θ).
pub fn log_likelihood(params: &GarchParams, returns: &[f64], backcast: f64) -> f64 {
    let sigma2 = conditional_variance(params, returns, backcast);
    let ln_2pi = (2.0 * PI).ln();
    -0.5 * returns
        .iter()
        .zip(&sigma2)
        .map(|(r, s)| ln_2pi + s.ln() + (r - params.mu).powi(2) / s)
        .sum::<f64>()
}

/// Analytic gradient of −ℓ with respect to [μ, ω, α.., β..].
pub fn nll_gradient(params: &GarchParams, returns: &[f64], backcast: f64) -> Vec<f64> {
    let (p, q) = (params.p(), params.q());
    let k = 2 + p + q;
    let n = returns.len();
    let sigma2 = conditional_variance(params, returns, backcast);
    // dsig[t * k + m] = ∂σ²_t / ∂θ_m
    let mut dsig = vec![0.0; n * k];
    let mut grad = vec![0.0; k];

    for t in 0..n {
        let mut d = vec![0.0; k];
        d[1] = 1.0;
        for i in 0..p {
            match t.checked_sub(i + 1) {
                Some(s) => {
                    let e = returns[s] - params.mu;
                    d[0] += params.alpha[i] * (-2.0 * e);
                    d[2 + i] += e * e;
                }
                None => d[2 + i] += backcast,
            }
        }
        for j in 0..q {
            match t.checked_sub(j + 1) {
                Some(s) => {
                    d[2 + p + j] += sigma2[s];
                    let prev = &dsig[s * k..(s + 1) * k];
                    for m in 0..k {
                        d[m] += params.beta[j] * prev[m];
                    }
                }
                None => d[2 + p + j] += backcast,
            }
        }

        let e = returns[t] - params.mu;
        let s = sigma2[t];
        let w = 0.5 * (1.0 / s - e * e / (s * s));
        for m in 0..k {
            grad[m] += w * d[m];
        }
        grad[0] -= e / s;
        dsig[t * k..(t + 1) * k].copy_from_slice(&d);
    }
    grad
}

// ── argmin problem ───────────────────────────────────────────────────────

struct GarchObjective<'a> {
    returns:  &'a [f64],
    backcast: f64,
    p:        usize,
    q:        usize,
}

impl GarchObjective<'_> {
    fn nll(&self, theta: &[f64]) -> f64 {
        let params = GarchParams::from_theta(self.p, self.q, theta);
        let ll = log_likelihood(&params, self.returns, self.backcast);
        if ll.is_finite() { -ll } else { PENALTY_COST }
    }
}

impl CostFunction for GarchObjective<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, ArgminError> {
        Ok(self.nll(theta))
    }
}

// ── Estimator ────────────────────────────────────────────────────────────

/// Optimiser controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub max_iter:     u64,
    pub sd_tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self { max_iter: 5_000, sd_tolerance: 1e-10 }
    }
}

/// Everything the estimator learned about one return series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GarchEstimates {
    pub params:         GarchParams,
    pub std_errors:     Vec<f64>,
    pub coefficients:   Vec<CoefficientStats>,
    pub log_likelihood: f64,
    pub aic:            f64,
    pub bic:            f64,
    pub n_obs:          usize,
    pub backcast:       f64,
    pub converged:      bool,
    pub status:         String,
    pub iterations:     u64,
}

impl GarchEstimates {
    pub fn p(&self) -> usize {
        self.params.p()
    }

    pub fn q(&self) -> usize {
        self.params.q()
    }

    pub fn n_params(&self) -> usize {
        2 + self.p() + self.q()
    }
}

/// Maximum-likelihood GARCH(p,q) fitter.
#[derive(Debug, Clone, Default)]
pub struct GarchMle {
    pub options: FitOptions,
}

impl GarchMle {
    pub fn new(options: FitOptions) -> Self {
        Self { options }
    }

    /// Estimate a constant-mean GARCH(p,q) on raw return values.
    pub fn estimate(&self, returns: &[f64], p: usize, q: usize) -> Result<GarchEstimates, FitError> {
        let n = returns.len();
        if p == 0 {
            return Err(FitError::ZeroArchOrder { q });
        }
        let Some(k) = 2usize.checked_add(p).and_then(|k| k.checked_add(q)) else {
            return Err(FitError::OrderTooLarge { p, q });
        };
        if let Some(index) = returns.iter().position(|r| !r.is_finite()) {
            return Err(FitError::NonFiniteReturn { index });
        }
        if n <= k {
            return Err(FitError::TooFewObservations { p, q, k, n });
        }

        let mean = returns.iter().sum::<f64>() / n as f64;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n as f64;
        if !(var > 1e-12) {
            return Err(FitError::DegenerateSeries);
        }

        let resids: Vec<f64> = returns.iter().map(|r| r - mean).collect();
        let problem = GarchObjective { returns, backcast: backcast(&resids), p, q };

        let theta0 = self.grid_start(&problem, mean, var);
        debug!("GARCH({},{}) start nll={:.4}", p, q, problem.nll(&theta0));

        let first = self.run_simplex(&problem, theta0)?;
        let second = self.run_simplex(&problem, first.theta.clone())?;
        let best = if second.cost <= first.cost { second } else { first };

        let params = GarchParams::from_theta(p, q, &best.theta);
        let ll = log_likelihood(&params, returns, problem.backcast);
        if !ll.is_finite() {
            return Err(FitError::NonFiniteLikelihood);
        }
        if !best.converged {
            warn!("GARCH({},{}) optimizer stopped before convergence: {}", p, q, best.status);
        }

        let bc = problem.backcast;
        let grad = |x: &Vec<f64>| nll_gradient(&GarchParams::from_slice(p, q, x), returns, bc);
        let std_errors = standard_errors(&grad, &params.to_vec());
        let coefficients = GarchParams::names(p, q)
            .iter()
            .zip(params.to_vec())
            .zip(&std_errors)
            .map(|((name, coef), se)| CoefficientStats::new(name, coef, *se))
            .collect();

        let kf = k as f64;
        let estimates = GarchEstimates {
            params,
            std_errors,
            coefficients,
            log_likelihood: ll,
            aic: -2.0 * ll + 2.0 * kf,
            bic: -2.0 * ll + kf * (n as f64).ln(),
            n_obs: n,
            backcast: bc,
            converged: best.converged,
            status: best.status,
            iterations: best.iterations,
        };
        info!(
            "GARCH({},{}) fitted: ℓ={:.3} persistence={:.4} iters={}",
            p, q, estimates.log_likelihood, estimates.params.persistence(), estimates.iterations
        );
        Ok(estimates)
    }

    /// Best starting point of a small (Σα, Σβ) grid.
    fn grid_start(&self, problem: &GarchObjective<'_>, mean: f64, var: f64) -> Vec<f64> {
        let mut best: Option<(f64, Vec<f64>)> = None;
        for &a in &[0.03, 0.1, 0.2] {
            for &b in &[0.5, 0.8, 0.9] {
                if a + b >= 0.99 {
                    continue;
                }
                let theta = GarchParams::starting_values(problem.p, problem.q, mean, var, a, b).to_theta();
                let cost = problem.nll(&theta);
                if best.as_ref().map_or(true, |(c, _)| cost < *c) {
                    best = Some((cost, theta));
                }
            }
        }
        best.map(|(_, t)| t)
            .unwrap_or_else(|| GarchParams::starting_values(problem.p, problem.q, mean, var, 0.1, 0.8).to_theta())
    }

    fn run_simplex(&self, problem: &GarchObjective<'_>, theta0: Vec<f64>) -> Result<SimplexOutcome, FitError> {
        let mut vertices = vec![theta0.clone()];
        for i in 0..theta0.len() {
            let mut v = theta0.clone();
            v[i] += if theta0[i].abs() > 0.1 { 0.25 * theta0[i].abs() } else { 0.1 };
            vertices.push(v);
        }
        let solver = NelderMead::new(vertices).with_sd_tolerance(self.options.sd_tolerance)?;
        let objective = GarchObjective { ..*problem };
        let result = Executor::new(objective, solver)
            .configure(|state| state.max_iters(self.options.max_iter))
            .run()?;

        let state = result.state();
        let theta = state.get_best_param().cloned().ok_or(FitError::NoSolution)?;
        let (converged, status) = match state.get_termination_status() {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => (true, "Converged".to_owned()),
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                (false, "Maximum iterations reached".to_owned())
            }
            other => (false, format!("{other:?}")),
        };
        Ok(SimplexOutcome {
            cost: state.get_best_cost(),
            theta,
            converged,
            status,
            iterations: state.get_iter(),
        })
    }
}

struct SimplexOutcome {
    theta:      Vec<f64>,
    cost:       f64,
    converged:  bool,
    status:     String,
    iterations: u64,
}

impl VolatilityFitter for GarchMle {
    fn fit(
        &self,
        returns: &[SeriesPoint],
        mean:    MeanModel,
        vol:     VolModel,
        p:       usize,
        q:       usize,
    ) -> Result<FitResult, FitError> {
        let values: Vec<f64> = returns.iter().map(|r| r.value).collect();
        let estimates = self.estimate(&values, p, q)?;

        let sigma2 = conditional_variance(&estimates.params, &values, estimates.backcast);
        let conditional_volatility = returns
            .iter()
            .zip(sigma2)
            .map(|(r, s)| SeriesPoint { date: r.date, value: s.sqrt() })
            .collect();
        let summary_text = summary::render(&estimates, mean, vol, "Returns");

        Ok(FitResult { estimates, summary_text, conditional_volatility })
    }
}
