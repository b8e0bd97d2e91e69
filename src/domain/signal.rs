//! Signal fusion: indicator readings → sub-signals → one weighted score.
//!
//! A band table is evaluated from the most extreme band to the least extreme
//! one, "below" bands before "above" bands, and the first strict match wins.
//! A reading that matches nothing contributes 0.

use std::fmt;

use crate::domain::indicator::regime::Regime;
use crate::domain::indicator::{IndicatorType, Reading};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandSide {
    Below,
    Above,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub side: BandSide,
    pub threshold: f64,
    pub signal: f64,
}

impl Band {
    pub fn below(threshold: f64, signal: f64) -> Self {
        Self {
            side: BandSide::Below,
            threshold,
            signal,
        }
    }

    pub fn above(threshold: f64, signal: f64) -> Self {
        Self {
            side: BandSide::Above,
            threshold,
            signal,
        }
    }

    fn matches(&self, value: f64) -> bool {
        match self.side {
            BandSide::Below => value < self.threshold,
            BandSide::Above => value > self.threshold,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.side {
            BandSide::Below => '<',
            BandSide::Above => '>',
        };
        write!(f, "{}{}:{}", op, self.threshold, self.signal)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandTable {
    bands: Vec<Band>,
}

impl BandTable {
    /// Orders the bands for evaluation: below bands by ascending threshold,
    /// then above bands by descending threshold.
    pub fn new(bands: Vec<Band>) -> Self {
        let (mut below, mut above): (Vec<Band>, Vec<Band>) =
            bands.into_iter().partition(|b| b.side == BandSide::Below);
        below.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));
        above.sort_by(|a, b| b.threshold.total_cmp(&a.threshold));
        below.extend(above);
        Self { bands: below }
    }

    pub fn signal(&self, value: f64) -> f64 {
        self.bands
            .iter()
            .find(|b| b.matches(value))
            .map(|b| b.signal)
            .unwrap_or(0.0)
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}

impl fmt::Display for BandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.bands.iter().map(|b| b.to_string()).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Fixed sub-signal per regime category.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegimeSignals {
    pub bull_trend: f64,
    pub bear_trend: f64,
    pub high_vol: f64,
    pub low_vol: f64,
    pub ranging: f64,
    pub neutral: f64,
}

impl RegimeSignals {
    pub fn get(&self, regime: Regime) -> f64 {
        match regime {
            Regime::BullTrend => self.bull_trend,
            Regime::BearTrend => self.bear_trend,
            Regime::HighVolatility => self.high_vol,
            Regime::LowVolatility => self.low_vol,
            Regime::Ranging => self.ranging,
            Regime::Neutral => self.neutral,
        }
    }

    pub fn set(&mut self, regime: Regime, signal: f64) {
        let slot = match regime {
            Regime::BullTrend => &mut self.bull_trend,
            Regime::BearTrend => &mut self.bear_trend,
            Regime::HighVolatility => &mut self.high_vol,
            Regime::LowVolatility => &mut self.low_vol,
            Regime::Ranging => &mut self.ranging,
            Regime::Neutral => &mut self.neutral,
        };
        *slot = signal;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalMap {
    Bands(BandTable),
    /// clamp((value - center) / scale, -1, 1), negated when `invert`.
    Linear { center: f64, scale: f64, invert: bool },
    Regime(RegimeSignals),
}

impl SignalMap {
    pub fn sub_signal(&self, reading: Reading) -> f64 {
        match (self, reading) {
            (SignalMap::Bands(table), Reading::Value(v)) => table.signal(v),
            (
                SignalMap::Linear {
                    center,
                    scale,
                    invert,
                },
                Reading::Value(v),
            ) => {
                if *scale == 0.0 {
                    return 0.0;
                }
                let s = ((v - center) / scale).clamp(-1.0, 1.0);
                if *invert { -s } else { s }
            }
            (SignalMap::Regime(signals), Reading::Regime(r)) => signals.get(r),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalComponent {
    pub name: String,
    pub indicator: IndicatorType,
    pub map: SignalMap,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FusionConfig {
    pub components: Vec<SignalComponent>,
    /// Symmetric bound applied to the fused score.
    pub saturation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub name: String,
    pub reading: Reading,
    pub sub_signal: f64,
    pub weighted: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusedSignal {
    pub score: f64,
    pub contributions: Vec<Contribution>,
}

pub fn fuse(config: &FusionConfig, prices: &[f64]) -> FusedSignal {
    let contributions: Vec<Contribution> = config
        .components
        .iter()
        .map(|c| {
            let reading = c.indicator.evaluate(prices);
            let sub_signal = c.map.sub_signal(reading);
            Contribution {
                name: c.name.clone(),
                reading,
                sub_signal,
                weighted: sub_signal * c.weight,
            }
        })
        .collect();

    let raw: f64 = contributions.iter().map(|c| c.weighted).sum();
    let score = match config.saturation {
        Some(bound) if bound > 0.0 => raw.clamp(-bound, bound),
        _ => raw,
    };

    FusedSignal {
        score,
        contributions,
    }
}
