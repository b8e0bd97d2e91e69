//! Allocation strategies.
//!
//! Every strategy reads the shared [`PriceHistory`] and returns a full
//! [`AllocationVector`]. Three families exist: indicator fusion, the
//! tangency optimizer, and relative momentum split.

use std::fmt;

use tracing::debug;

use crate::domain::allocation::{AllocationMapper, AllocationVector};
use crate::domain::error::AllocError;
use crate::domain::indicator::roc::momentum;
use crate::domain::optimizer::{self, TangencyConfig};
use crate::domain::price_history::PriceHistory;
use crate::domain::signal::{FusionConfig, fuse};

pub trait AllocationStrategy: Send {
    fn name(&self) -> &'static str;

    fn allocate(&self, history: &PriceHistory) -> Result<AllocationVector, AllocError>;
}

/// Scores each asset independently with the fused indicator signal and
/// gives it `mapped / n_assets` of the capital.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorStrategy {
    /// Epochs of history required before indicators are consulted.
    pub warmup: usize,
    /// Total invested fraction used before warmup completes.
    pub base_allocation: f64,
    pub fusion: FusionConfig,
    pub mapper: AllocationMapper,
}

impl AllocationStrategy for IndicatorStrategy {
    fn name(&self) -> &'static str {
        "indicator"
    }

    fn allocate(&self, history: &PriceHistory) -> Result<AllocationVector, AllocError> {
        let names = history.assets();
        if history.len() < self.warmup {
            return Ok(AllocationVector::equal_split(names, self.base_allocation));
        }

        let n = history.asset_count() as f64;
        let mut fractions = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let prices = history.series(i);
            let fused = fuse(&self.fusion, prices);
            if !fused.score.is_finite() {
                return Err(AllocError::MalformedAllocation {
                    reason: format!("non-finite score for {}", name),
                });
            }
            let allocation = self.mapper.allocate(fused.score, prices);
            debug!(asset = %name, score = fused.score, allocation, "asset scored");
            fractions.push(allocation / n);
        }
        Ok(AllocationVector::from_fractions(names, &fractions))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TangencyStrategy {
    pub config: TangencyConfig,
}

impl AllocationStrategy for TangencyStrategy {
    fn name(&self) -> &'static str {
        "tangency"
    }

    fn allocate(&self, history: &PriceHistory) -> Result<AllocationVector, AllocError> {
        Ok(optimizer::optimize(history, &self.config))
    }
}

/// Splits `invest_fraction` across assets in proportion to their positive
/// trailing momentum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumSplitStrategy {
    pub warmup: usize,
    pub lookback: usize,
    pub invest_fraction: f64,
}

impl Default for MomentumSplitStrategy {
    fn default() -> Self {
        Self {
            warmup: 30,
            lookback: 14,
            invest_fraction: 0.85,
        }
    }
}

impl AllocationStrategy for MomentumSplitStrategy {
    fn name(&self) -> &'static str {
        "momentum_split"
    }

    fn allocate(&self, history: &PriceHistory) -> Result<AllocationVector, AllocError> {
        let names = history.assets();
        if history.len() < self.warmup {
            // Equal shares across the assets and cash.
            let share = 1.0 / (names.len() + 1) as f64;
            return Ok(AllocationVector::equal_split(
                names,
                share * names.len() as f64,
            ));
        }

        let strengths: Vec<f64> = (0..names.len())
            .map(|i| momentum(history.series(i), self.lookback).max(0.0))
            .collect();
        let total: f64 = strengths.iter().sum();
        if !(total > 0.0) {
            return Ok(AllocationVector::all_cash(names));
        }

        let invest = self.invest_fraction.clamp(0.0, 1.0);
        let fractions: Vec<f64> = strengths.iter().map(|s| s / total * invest).collect();
        Ok(AllocationVector::from_fractions(names, &fractions))
    }
}

/// Resolved strategy selection, as built from configuration or a preset.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyConfig {
    Indicator(IndicatorStrategy),
    Tangency(TangencyStrategy),
    MomentumSplit(MomentumSplitStrategy),
}

impl StrategyConfig {
    pub fn build(self) -> Box<dyn AllocationStrategy> {
        match self {
            StrategyConfig::Indicator(s) => Box::new(s),
            StrategyConfig::Tangency(s) => Box::new(s),
            StrategyConfig::MomentumSplit(s) => Box::new(s),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StrategyConfig::Indicator(_) => "indicator",
            StrategyConfig::Tangency(_) => "tangency",
            StrategyConfig::MomentumSplit(_) => "momentum_split",
        }
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyConfig::Indicator(s) => {
                writeln!(
                    f,
                    "indicator: warmup {}, base allocation {}",
                    s.warmup, s.base_allocation
                )?;
                for c in &s.fusion.components {
                    writeln!(f, "  {} {} x{}", c.name, c.indicator, c.weight)?;
                }
                let (lo, hi) = s.mapper.map.bounds();
                write!(f, "  allocation range [{}, {}]", lo, hi)
            }
            StrategyConfig::Tangency(s) => write!(
                f,
                "tangency: lookback {}, risk-free {}, invest {}",
                s.config.lookback, s.config.risk_free_rate, s.config.invest_fraction
            ),
            StrategyConfig::MomentumSplit(s) => write!(
                f,
                "momentum_split: warmup {}, lookback {}, invest {}",
                s.warmup, s.lookback, s.invest_fraction
            ),
        }
    }
}
