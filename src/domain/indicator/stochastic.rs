//! Range oscillators: stochastic %K and Williams %R.
//!
//! %K = 100 * (last - min) / (max - min) over the last n prices; 50 on a zero
//! range or short history.
//! %R = -100 * (max - last) / (max - min); -50 on a zero range or short history.

pub const STOCHASTIC_NEUTRAL: f64 = 50.0;
pub const WILLIAMS_NEUTRAL: f64 = -50.0;

fn range(prices: &[f64], period: usize) -> Option<(f64, f64, f64)> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let window = &prices[prices.len() - period..];
    let highest = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest = window.iter().copied().fold(f64::INFINITY, f64::min);
    if highest == lowest {
        return None;
    }
    Some((highest, lowest, window[window.len() - 1]))
}

pub fn stochastic_k(prices: &[f64], period: usize) -> f64 {
    match range(prices, period) {
        Some((highest, lowest, last)) => 100.0 * (last - lowest) / (highest - lowest),
        None => STOCHASTIC_NEUTRAL,
    }
}

pub fn williams_r(prices: &[f64], period: usize) -> f64 {
    match range(prices, period) {
        Some((highest, lowest, last)) => -100.0 * (highest - last) / (highest - lowest),
        None => WILLIAMS_NEUTRAL,
    }
}
