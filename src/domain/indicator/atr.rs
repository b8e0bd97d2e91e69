//! Close-only average true range.
//!
//! With a single price per epoch the range of a step is |P[i] - P[i-1]|.
//! ATR(n) is the mean of the last n step ranges; 0 when fewer than n+1 prices
//! exist.

pub fn average_range(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() <= period {
        return 0.0;
    }
    let window = &prices[prices.len() - period - 1..];
    window.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / period as f64
}

/// High-low spread of the last n prices relative to their mean.
pub fn price_spread(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period {
        return 0.0;
    }
    let window = &prices[prices.len() - period..];
    let highest = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest = window.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = window.iter().sum::<f64>() / period as f64;
    if mean == 0.0 {
        return 0.0;
    }
    (highest - lowest) / mean
}
