//! Mean-variance (tangency) portfolio optimizer.
//!
//! Weights are `Σ⁻¹(μ - r_f)` from the annualized mean and sample covariance
//! of trailing simple returns. Negative weights are clipped to zero and the
//! rest renormalized to sum to one, then scaled by `invest_fraction`; the
//! remainder is cash. A rank-deficient covariance goes through the
//! Moore-Penrose pseudo-inverse, and when nothing usable is left the capital
//! is split equally.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::domain::allocation::AllocationVector;
use crate::domain::indicator::stddev::simple_returns;
use crate::domain::price_history::PriceHistory;

/// Ratio of smallest to largest singular value below which the covariance
/// matrix is treated as singular.
pub const RANK_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangencyConfig {
    /// Number of trailing returns used for the estimate.
    pub lookback: usize,
    /// Annualized risk-free rate.
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
    pub invest_fraction: f64,
}

impl Default for TangencyConfig {
    fn default() -> Self {
        Self {
            lookback: 60,
            risk_free_rate: 0.0,
            periods_per_year: 252.0,
            invest_fraction: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceEstimate {
    pub mean: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub observations: usize,
}

/// Annualized mean and sample covariance of the trailing `lookback` returns
/// of every asset. `None` when fewer than two returns are available.
pub fn estimate(
    history: &PriceHistory,
    lookback: usize,
    periods_per_year: f64,
) -> Option<CovarianceEstimate> {
    let n = history.asset_count();
    if n == 0 {
        return None;
    }

    let returns: Vec<Vec<f64>> = (0..n)
        .map(|i| simple_returns(history.window(i, lookback.saturating_add(1))))
        .collect();
    let t = returns.iter().map(Vec::len).min().unwrap_or(0);
    if t < 2 {
        return None;
    }

    let samples = DMatrix::from_fn(t, n, |row, col| {
        let r = &returns[col];
        r[r.len() - t + row]
    });
    let mean = DVector::from_fn(n, |i, _| samples.column(i).mean());
    let centered = DMatrix::from_fn(t, n, |row, col| samples[(row, col)] - mean[col]);
    let covariance = (centered.transpose() * &centered) / (t as f64 - 1.0);

    Some(CovarianceEstimate {
        mean: mean * periods_per_year,
        covariance: covariance * periods_per_year,
        observations: t,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inversion {
    Exact,
    Pseudo,
}

/// Invert a covariance matrix, falling back to the pseudo-inverse when it is
/// rank-deficient or the LU inverse is not finite.
pub fn invert_covariance(cov: &DMatrix<f64>) -> Option<(DMatrix<f64>, Inversion)> {
    if !cov.is_square() || cov.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let singular_values = cov.clone().svd(false, false).singular_values;
    let largest = singular_values.iter().copied().fold(0.0, f64::max);
    let smallest = singular_values
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);

    if largest > 0.0 && smallest > largest * RANK_TOLERANCE {
        if let Some(inv) = cov.clone().try_inverse() {
            if inv.iter().all(|v| v.is_finite()) {
                return Some((inv, Inversion::Exact));
            }
        }
    }

    let eps = largest * RANK_TOLERANCE;
    match cov.clone().pseudo_inverse(eps) {
        Ok(pinv) if pinv.iter().all(|v| v.is_finite()) => {
            warn!(smallest, largest, "covariance is singular, using pseudo-inverse");
            Some((pinv, Inversion::Pseudo))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TangencyWeights {
    /// Unconstrained Σ⁻¹(μ - r_f), empty when inversion failed.
    pub raw: Vec<f64>,
    /// Non-negative, summing to one.
    pub weights: Vec<f64>,
    pub inversion: Option<Inversion>,
    pub equal_weight_fallback: bool,
}

fn equal_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

pub fn tangency_weights(
    mean: &DVector<f64>,
    cov: &DMatrix<f64>,
    risk_free_rate: f64,
) -> TangencyWeights {
    let n = mean.len();
    let Some((inverse, inversion)) = invert_covariance(cov).filter(|(inv, _)| inv.ncols() == n)
    else {
        return TangencyWeights {
            raw: Vec::new(),
            weights: equal_weights(n),
            inversion: None,
            equal_weight_fallback: true,
        };
    };

    let excess = mean.add_scalar(-risk_free_rate);
    let raw: Vec<f64> = (inverse * excess).iter().copied().collect();

    let clipped: Vec<f64> = raw
        .iter()
        .map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 })
        .collect();
    let total: f64 = clipped.iter().sum();

    if !(total > 0.0) || !total.is_finite() {
        return TangencyWeights {
            raw,
            weights: equal_weights(n),
            inversion: Some(inversion),
            equal_weight_fallback: true,
        };
    }

    TangencyWeights {
        weights: clipped.iter().map(|w| w / total).collect(),
        raw,
        inversion: Some(inversion),
        equal_weight_fallback: false,
    }
}

/// Tangency allocation for every asset in `history`.
pub fn optimize(history: &PriceHistory, config: &TangencyConfig) -> AllocationVector {
    let names = history.assets();
    let invest = config.invest_fraction.clamp(0.0, 1.0);

    let Some(est) = estimate(history, config.lookback, config.periods_per_year) else {
        debug!(epochs = history.len(), "not enough returns, equal weighting");
        return AllocationVector::equal_split(names, invest);
    };

    let result = tangency_weights(&est.mean, &est.covariance, config.risk_free_rate);
    debug!(
        observations = est.observations,
        inversion = ?result.inversion,
        fallback = result.equal_weight_fallback,
        "tangency weights computed"
    );
    let fractions: Vec<f64> = result.weights.iter().map(|w| w * invest).collect();
    AllocationVector::from_fractions(names, &fractions)
}
