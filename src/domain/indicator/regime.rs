//! Market regime classification.
//!
//! Trend strength is the normalized divergence of a fast and a slow SMA,
//! volatility is the population standard deviation of the returns inside the
//! last `vol_period` prices, and the lag-1 autocorrelation of the last
//! `autocorr_period` returns separates ranging markets from the rest. Checks run in
//! order: trend, high volatility, low volatility, ranging, otherwise neutral.

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::stddev::{population_stddev, simple_returns, sma};
use crate::domain::indicator::trend::lag1_autocorrelation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    BullTrend,
    BearTrend,
    HighVolatility,
    LowVolatility,
    Ranging,
    Neutral,
}

impl Regime {
    pub const ALL: [Regime; 6] = [
        Regime::BullTrend,
        Regime::BearTrend,
        Regime::HighVolatility,
        Regime::LowVolatility,
        Regime::Ranging,
        Regime::Neutral,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Regime::BullTrend => "bull_trend",
            Regime::BearTrend => "bear_trend",
            Regime::HighVolatility => "high_vol",
            Regime::LowVolatility => "low_vol",
            Regime::Ranging => "ranging",
            Regime::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Regime::ALL
            .iter()
            .copied()
            .find(|r| r.key() == s.trim())
            .ok_or_else(|| format!("unknown regime '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeThresholds {
    pub fast_ma: usize,
    pub slow_ma: usize,
    /// Prices (not returns) in the volatility window.
    pub vol_period: usize,
    /// Returns in the autocorrelation window.
    pub autocorr_period: usize,
    pub min_history: usize,
    pub trend_threshold: f64,
    pub high_vol: f64,
    pub low_vol: f64,
    pub autocorr_threshold: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            fast_ma: 20,
            slow_ma: 50,
            vol_period: 30,
            autocorr_period: 19,
            min_history: 60,
            trend_threshold: 0.025,
            high_vol: 0.013,
            low_vol: 0.007,
            autocorr_threshold: 0.1,
        }
    }
}

pub fn classify_regime(prices: &[f64], t: &RegimeThresholds) -> Regime {
    if prices.len() < t.min_history || prices.len() < t.slow_ma.max(t.fast_ma) {
        return Regime::Neutral;
    }

    let fast = sma(prices, t.fast_ma);
    let slow = sma(prices, t.slow_ma);
    if slow != 0.0 {
        let trend_strength = (fast - slow).abs() / slow.abs();
        if trend_strength > t.trend_threshold {
            return if fast > slow {
                Regime::BullTrend
            } else {
                Regime::BearTrend
            };
        }
    }

    let vol_window = &prices[prices.len().saturating_sub(t.vol_period)..];
    let volatility = if vol_window.len() < 2 {
        0.0
    } else {
        population_stddev(&simple_returns(vol_window))
    };
    if volatility > t.high_vol {
        return Regime::HighVolatility;
    }
    if volatility < t.low_vol {
        return Regime::LowVolatility;
    }

    let recent = &prices[prices.len().saturating_sub(t.autocorr_period.saturating_add(1))..];
    let autocorr = lag1_autocorrelation(&simple_returns(recent));
    if autocorr.abs() < t.autocorr_threshold {
        Regime::Ranging
    } else {
        Regime::Neutral
    }
}
