//! Linear-trend strength and return autocorrelation.

/// Pearson correlation of two equal-length samples; 0 when either side has
/// zero variance or fewer than two points.
pub fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// Correlation of the last n prices with time (0, 1, ..., n-1).
/// +1 for a perfectly linear rise, -1 for a perfectly linear fall.
pub fn trend_correlation(prices: &[f64], period: usize) -> f64 {
    if period < 2 || prices.len() < period {
        return 0.0;
    }
    let window = &prices[prices.len() - period..];
    let time: Vec<f64> = (0..period).map(|i| i as f64).collect();
    correlation(&time, window)
}

/// Lag-1 autocorrelation of a return series.
pub fn lag1_autocorrelation(returns: &[f64]) -> f64 {
    if returns.len() < 3 {
        return 0.0;
    }
    correlation(&returns[..returns.len() - 1], &returns[1..])
}
