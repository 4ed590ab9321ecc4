// models/transforms.rs — Unconstrained ↔ constrained GARCH parameters
//
// The optimiser searches over θ ∈ ℝ^{2+p+q}; the likelihood is evaluated on
// model-space parameters that always satisfy
//
//     ω > 0,   α_i ≥ 0,   β_j ≥ 0,   Σα + Σβ < 1
//
// Mapping:
//     ω              = softplus(θ_1)
//     (α, β, slack)  = (1 − STATIONARITY_MARGIN) · softmax(θ_2.., 0)
//
// The slack component has its logit pinned at 0 and acts as the softmax
// baseline, so the total persistence can never reach 1.

/// Buffer keeping Σα + Σβ strictly below one.
pub const STATIONARITY_MARGIN: f64 = 1e-6;

/// Smallest weight allowed when inverting the softmax (log of zero guard).
const WEIGHT_FLOOR: f64 = 1e-12;

/// Numerically stable softplus: ln(1 + eˣ).
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Inverse of softplus on (0, ∞): ln(eˣ − 1).
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp_m1().ln() }
}

/// Scaled softmax with an implicit zero logit for the slack term.
///
/// Writes `logits.len()` weights into `out`; their sum is < 1 − margin.
pub fn scaled_softmax(logits: &[f64], out: &mut [f64]) {
    debug_assert_eq!(logits.len(), out.len());
    let shift = logits.iter().copied().fold(0.0_f64, f64::max);
    let slack = (-shift).exp();
    let denom = slack + logits.iter().map(|x| (x - shift).exp()).sum::<f64>();
    let mass = 1.0 - STATIONARITY_MARGIN;
    for (o, x) in out.iter_mut().zip(logits) {
        *o = mass * (x - shift).exp() / denom;
    }
}

/// Inverse of [`scaled_softmax`]: logits relative to the slack component.
///
/// Weights are floored and, if they exhaust the available mass, shrunk so
/// the slack stays positive.
pub fn inv_scaled_softmax(weights: &[f64], out: &mut [f64]) {
    debug_assert_eq!(weights.len(), out.len());
    let mass = 1.0 - STATIONARITY_MARGIN;
    let floored: Vec<f64> = weights.iter().map(|w| w.max(WEIGHT_FLOOR)).collect();
    let total: f64 = floored.iter().sum();
    let scale = if total >= mass { 0.999 * mass / total } else { 1.0 };
    let slack = mass - scale * total;
    for (o, w) in out.iter_mut().zip(&floored) {
        *o = (scale * w / slack).ln();
    }
}
