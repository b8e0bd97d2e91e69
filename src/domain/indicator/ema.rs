//! Exponential Moving Average over a supplied window.
//!
//! k = 2/(n+1). The seed is the oldest price of the window, then
//! EMA += (P[i] - EMA) * k in chronological order across the window.
//! With fewer than n prices the EMA is the last price; 0 for an empty window.
//!
//! Callers inside the engine pass the trailing `EMA_WINDOW_FACTOR * n` prices
//! (see [`ema_window`]) unless an [`EmaPair`] names its windows explicitly.

pub const EMA_WINDOW_FACTOR: usize = 2;

/// A fast and a slow EMA, each computed over its own trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaPair {
    pub fast: usize,
    pub slow: usize,
    pub fast_window: usize,
    pub slow_window: usize,
}

impl EmaPair {
    /// Windows default to `EMA_WINDOW_FACTOR` times each period.
    pub fn new(fast: usize, slow: usize) -> Self {
        Self {
            fast,
            slow,
            fast_window: fast.saturating_mul(EMA_WINDOW_FACTOR),
            slow_window: slow.saturating_mul(EMA_WINDOW_FACTOR),
        }
    }

    pub fn with_windows(mut self, fast_window: usize, slow_window: usize) -> Self {
        self.fast_window = fast_window;
        self.slow_window = slow_window;
        self
    }

    pub fn has_default_windows(&self) -> bool {
        *self == Self::new(self.fast, self.slow)
    }

    pub fn fast_ema(&self, series: &[f64]) -> f64 {
        ema_over(series, self.fast, self.fast_window)
    }

    pub fn slow_ema(&self, series: &[f64]) -> f64 {
        ema_over(series, self.slow, self.slow_window)
    }

    /// Prices needed before both EMAs leave their short-history fallback.
    pub fn lookback(&self) -> usize {
        self.fast.max(self.slow)
    }

    /// 2 above the fast EMA, 1 above only the slow EMA, 0 otherwise.
    pub fn position(&self, series: &[f64]) -> f64 {
        let Some(&last) = series.last() else {
            return 0.0;
        };
        if last > self.fast_ema(series) {
            2.0
        } else if last > self.slow_ema(series) {
            1.0
        } else {
            0.0
        }
    }
}

pub fn ema(prices: &[f64], period: usize) -> f64 {
    let Some(&last) = prices.last() else {
        return 0.0;
    };
    if period == 0 || prices.len() < period {
        return last;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut value = prices[0];
    for &p in &prices[1..] {
        value += (p - value) * k;
    }
    value
}

/// EMA over the trailing `EMA_WINDOW_FACTOR * period` prices of a full series.
pub fn ema_window(series: &[f64], period: usize) -> f64 {
    ema_over(series, period, period.saturating_mul(EMA_WINDOW_FACTOR))
}

/// EMA over the trailing `window` prices of a full series.
pub fn ema_over(series: &[f64], period: usize, window: usize) -> f64 {
    ema(&series[series.len().saturating_sub(window)..], period)
}
