//! Technical indicators over trailing price windows.
//!
//! Every function here is pure and defined for every input length: short
//! history or degenerate statistics produce a documented neutral value,
//! never a panic or a NaN.
//!
//! - `IndicatorType`: indicator identity + parameters, as named in config
//! - `Reading`: what an indicator produces for the latest epoch

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod regime;
pub mod roc;
pub mod rsi;
pub mod stddev;
pub mod stochastic;
pub mod trend;

use std::fmt;

use self::ema::EmaPair;
use self::regime::{Regime, RegimeThresholds};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Value(f64),
    Regime(Regime),
}

impl Reading {
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            Reading::Regime(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorType {
    Rsi(usize),
    ZScore(usize),
    Momentum(usize),
    MomentumBlend(usize, usize, usize),
    Stochastic(usize),
    WilliamsR(usize),
    /// Average step range relative to the last price.
    Atr(usize),
    Spread(usize),
    Trend(usize),
    Volatility(usize),
    PriceVsSma(usize),
    PriceVsEma(usize),
    SmaTrend { fast: usize, slow: usize },
    /// Fast EMA relative to slow EMA.
    EmaTrend(EmaPair),
    /// Where the last price sits against the EMA pair: 2, 1 or 0.
    EmaPosition(EmaPair),
    /// EMA spread as a percentage of the last price.
    Macd { fast: usize, slow: usize },
    Regime(RegimeThresholds),
}

fn relative(value: f64, base: f64) -> f64 {
    if base == 0.0 { 0.0 } else { (value - base) / base }
}

impl IndicatorType {
    /// Number of trailing prices the indicator needs before it stops
    /// returning its neutral value.
    pub fn lookback(&self) -> usize {
        match self {
            IndicatorType::Rsi(n)
            | IndicatorType::Momentum(n)
            | IndicatorType::Atr(n)
            | IndicatorType::Volatility(n) => n.saturating_add(1),
            IndicatorType::ZScore(n)
            | IndicatorType::Stochastic(n)
            | IndicatorType::WilliamsR(n)
            | IndicatorType::Spread(n)
            | IndicatorType::Trend(n)
            | IndicatorType::PriceVsSma(n) => *n,
            IndicatorType::PriceVsEma(n) => *n,
            IndicatorType::MomentumBlend(a, b, c) => a.max(b).max(c).saturating_add(1),
            IndicatorType::SmaTrend { fast, slow } | IndicatorType::Macd { fast, slow } => {
                *fast.max(slow)
            }
            IndicatorType::EmaTrend(pair) | IndicatorType::EmaPosition(pair) => pair.lookback(),
            IndicatorType::Regime(t) => t.min_history,
        }
    }

    pub fn is_regime(&self) -> bool {
        matches!(self, IndicatorType::Regime(_))
    }

    /// Evaluate the indicator at the last price of `prices` (full series,
    /// oldest first).
    pub fn evaluate(&self, prices: &[f64]) -> Reading {
        let last = prices.last().copied().unwrap_or(0.0);
        let value = match self {
            IndicatorType::Rsi(n) => rsi::rsi(prices, *n),
            IndicatorType::ZScore(n) => bollinger::z_score(prices, *n),
            IndicatorType::Momentum(n) => roc::momentum(prices, *n),
            IndicatorType::MomentumBlend(a, b, c) => roc::momentum_blend(prices, &[*a, *b, *c]),
            IndicatorType::Stochastic(n) => stochastic::stochastic_k(prices, *n),
            IndicatorType::WilliamsR(n) => stochastic::williams_r(prices, *n),
            IndicatorType::Atr(n) => {
                let range = atr::average_range(prices, *n);
                if last == 0.0 { 0.0 } else { range / last }
            }
            IndicatorType::Spread(n) => atr::price_spread(prices, *n),
            IndicatorType::Trend(n) => trend::trend_correlation(prices, *n),
            IndicatorType::Volatility(n) => stddev::realized_volatility(prices, *n),
            IndicatorType::PriceVsSma(n) => relative(last, stddev::sma(prices, *n)),
            IndicatorType::PriceVsEma(n) => relative(last, ema::ema_window(prices, *n)),
            IndicatorType::SmaTrend { fast, slow } => {
                relative(stddev::sma(prices, *fast), stddev::sma(prices, *slow))
            }
            IndicatorType::EmaTrend(pair) => relative(pair.fast_ema(prices), pair.slow_ema(prices)),
            IndicatorType::EmaPosition(pair) => pair.position(prices),
            IndicatorType::Macd { fast, slow } => {
                if last == 0.0 {
                    0.0
                } else {
                    (ema::ema_window(prices, *fast) - ema::ema_window(prices, *slow)) / last
                        * 100.0
                }
            }
            IndicatorType::Regime(t) => return Reading::Regime(regime::classify_regime(prices, t)),
        };
        Reading::Value(value)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Rsi(n) => write!(f, "RSI({})", n),
            IndicatorType::ZScore(n) => write!(f, "ZSCORE({})", n),
            IndicatorType::Momentum(n) => write!(f, "MOMENTUM({})", n),
            IndicatorType::MomentumBlend(a, b, c) => {
                write!(f, "MOMENTUM_BLEND({},{},{})", a, b, c)
            }
            IndicatorType::Stochastic(n) => write!(f, "STOCHASTIC({})", n),
            IndicatorType::WilliamsR(n) => write!(f, "WILLIAMS({})", n),
            IndicatorType::Atr(n) => write!(f, "ATR({})", n),
            IndicatorType::Spread(n) => write!(f, "SPREAD({})", n),
            IndicatorType::Trend(n) => write!(f, "TREND({})", n),
            IndicatorType::Volatility(n) => write!(f, "VOLATILITY({})", n),
            IndicatorType::PriceVsSma(n) => write!(f, "PRICE_VS_SMA({})", n),
            IndicatorType::PriceVsEma(n) => write!(f, "PRICE_VS_EMA({})", n),
            IndicatorType::SmaTrend { fast, slow } => write!(f, "SMA_TREND({},{})", fast, slow),
            IndicatorType::EmaTrend(pair) => write!(f, "EMA_TREND({})", EmaArgs(pair)),
            IndicatorType::EmaPosition(pair) => write!(f, "EMA_POSITION({})", EmaArgs(pair)),
            IndicatorType::Macd { fast, slow } => write!(f, "MACD({},{})", fast, slow),
            IndicatorType::Regime(_) => write!(f, "REGIME"),
        }
    }
}

/// Periods, followed by the windows when they differ from the defaults.
struct EmaArgs<'a>(&'a EmaPair);

impl fmt::Display for EmaArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pair = self.0;
        write!(f, "{},{}", pair.fast, pair.slow)?;
        if !pair.has_default_windows() {
            write!(f, ",{},{}", pair.fast_window, pair.slow_window)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + 0.5 * i as f64).collect()
    }

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Rsi(14).to_string(), "RSI(14)");
        assert_eq!(
            IndicatorType::EmaTrend(EmaPair::new(20, 50)).to_string(),
            "EMA_TREND(20,50)"
        );
        assert_eq!(
            IndicatorType::EmaPosition(EmaPair::new(20, 50).with_windows(30, 60)).to_string(),
            "EMA_POSITION(20,50,30,60)"
        );
        assert_eq!(
            IndicatorType::MomentumBlend(8, 18, 30).to_string(),
            "MOMENTUM_BLEND(8,18,30)"
        );
        assert_eq!(
            IndicatorType::Regime(RegimeThresholds::default()).to_string(),
            "REGIME"
        );
    }

    #[test]
    fn lookback_covers_required_history() {
        assert_eq!(IndicatorType::Rsi(14).lookback(), 15);
        assert_eq!(IndicatorType::ZScore(20).lookback(), 20);
        assert_eq!(IndicatorType::MomentumBlend(8, 18, 30).lookback(), 31);
        assert_eq!(IndicatorType::Macd { fast: 12, slow: 26 }.lookback(), 26);
        assert_eq!(IndicatorType::EmaPosition(EmaPair::new(20, 50)).lookback(), 50);
    }

    #[test]
    fn huge_periods_stay_neutral() {
        let prices = [1.0, 2.0];
        assert_eq!(IndicatorType::Rsi(usize::MAX).evaluate(&prices), Reading::Value(50.0));
        assert_eq!(IndicatorType::Momentum(usize::MAX).evaluate(&prices), Reading::Value(0.0));
        assert_eq!(IndicatorType::Atr(usize::MAX).evaluate(&prices), Reading::Value(0.0));
        assert_eq!(
            IndicatorType::Volatility(usize::MAX).evaluate(&prices),
            Reading::Value(0.0)
        );
        assert_eq!(IndicatorType::Rsi(usize::MAX).lookback(), usize::MAX);
        assert_eq!(
            IndicatorType::MomentumBlend(1, 2, usize::MAX).lookback(),
            usize::MAX
        );
        let pair = EmaPair::new(usize::MAX, usize::MAX);
        assert_eq!(pair.fast_window, usize::MAX);
        assert!(IndicatorType::EmaTrend(pair).evaluate(&prices).value().unwrap().is_finite());
    }

    #[test]
    fn every_indicator_is_defined_on_empty_history() {
        let all = [
            IndicatorType::Rsi(14),
            IndicatorType::ZScore(20),
            IndicatorType::Momentum(10),
            IndicatorType::MomentumBlend(8, 18, 30),
            IndicatorType::Stochastic(14),
            IndicatorType::WilliamsR(14),
            IndicatorType::Atr(14),
            IndicatorType::Spread(10),
            IndicatorType::Trend(20),
            IndicatorType::Volatility(20),
            IndicatorType::PriceVsSma(20),
            IndicatorType::PriceVsEma(20),
            IndicatorType::SmaTrend { fast: 5, slow: 20 },
            IndicatorType::EmaTrend(EmaPair::new(20, 50)),
            IndicatorType::EmaPosition(EmaPair::new(20, 50).with_windows(30, 60)),
            IndicatorType::Macd { fast: 12, slow: 26 },
            IndicatorType::Regime(RegimeThresholds::default()),
        ];
        for ind in &all {
            for len in [0usize, 1, 2, 5] {
                let prices = vec![100.0; len];
                match ind.evaluate(&prices) {
                    Reading::Value(v) => assert!(v.is_finite(), "{} not finite", ind),
                    Reading::Regime(_) => assert!(ind.is_regime()),
                }
            }
        }
    }

    #[test]
    fn trend_readings_positive_on_rising_series() {
        let prices = rising(60);
        for ind in [
            IndicatorType::PriceVsEma(20),
            IndicatorType::PriceVsSma(20),
            IndicatorType::EmaTrend(EmaPair::new(20, 50)),
            IndicatorType::EmaPosition(EmaPair::new(20, 50)),
            IndicatorType::SmaTrend { fast: 5, slow: 20 },
            IndicatorType::Macd { fast: 12, slow: 26 },
            IndicatorType::Momentum(10),
        ] {
            let v = ind.evaluate(&prices).value().unwrap();
            assert!(v > 0.0, "{} should be positive, got {}", ind, v);
        }
    }

    #[test]
    fn atr_is_relative_to_price() {
        let prices = [100.0, 102.0, 100.0, 102.0];
        let v = IndicatorType::Atr(3).evaluate(&prices).value().unwrap();
        assert_relative_eq!(v, 2.0 / 102.0, epsilon = 1e-12);
    }

    #[test]
    fn regime_reading_is_categorical() {
        let r = IndicatorType::Regime(RegimeThresholds::default()).evaluate(&rising(80));
        assert_eq!(r, Reading::Regime(Regime::BullTrend));
        assert_eq!(r.value(), None);
    }
}
