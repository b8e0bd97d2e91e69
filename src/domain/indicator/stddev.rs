//! Moving average, standard deviation and realized volatility.
//!
//! Population standard deviation (divides by N, not N-1) over the trailing
//! `period` values. Realized volatility is the population standard deviation
//! of simple returns.

/// Mean of the last `period` prices, or of everything available when history
/// is shorter. 0 for an empty slice.
pub fn sma(prices: &[f64], period: usize) -> f64 {
    let window = &prices[prices.len().saturating_sub(period)..];
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

/// Population standard deviation of the last `period` prices; 0 when fewer
/// than `period` prices exist or `period` is 0.
pub fn stddev(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period {
        return 0.0;
    }
    population_stddev(&prices[prices.len() - period..])
}

pub(crate) fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}

/// Simple returns `p[i] / p[i-1] - 1`. A zero base contributes a 0 return.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| if w[0] == 0.0 { 0.0 } else { w[1] / w[0] - 1.0 })
        .collect()
}

/// Standard deviation of the last `period` simple returns; 0 when fewer than
/// `period + 1` prices exist.
pub fn realized_volatility(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() <= period {
        return 0.0;
    }
    let returns = simple_returns(&prices[prices.len() - period - 1..]);
    population_stddev(&returns)
}
