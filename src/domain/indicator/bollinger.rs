//! Bollinger Bands and z-score.
//!
//! - Middle: mean of the last n prices
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//! - z: (last - Middle) / StdDev, defined as 0 when StdDev is 0
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//! With fewer than n prices the bands collapse onto the last price and z is 0.

use crate::domain::indicator::stddev::population_stddev;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub stddev: f64,
    pub z: f64,
}

pub fn bollinger(prices: &[f64], period: usize, multiplier: f64) -> Bands {
    let last = prices.last().copied().unwrap_or(0.0);
    if period == 0 || prices.len() < period {
        return Bands {
            upper: last,
            middle: last,
            lower: last,
            stddev: 0.0,
            z: 0.0,
        };
    }

    let window = &prices[prices.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let stddev = population_stddev(window);
    let z = if stddev > 0.0 {
        (last - middle) / stddev
    } else {
        0.0
    };

    Bands {
        upper: middle + multiplier * stddev,
        middle,
        lower: middle - multiplier * stddev,
        stddev,
        z,
    }
}

pub fn z_score(prices: &[f64], period: usize) -> f64 {
    bollinger(prices, period, 0.0).z
}
