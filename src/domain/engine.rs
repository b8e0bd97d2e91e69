//! Per-epoch decision engine.
//!
//! The engine owns the price history for one run. Each call to
//! [`DecisionEngine::decide`] records the epoch's prices (repairing missing
//! entries), asks the configured strategy for an allocation, and validates
//! it. A strategy error or a malformed vector yields a
//! [`Decision::Fallback`] with the safe default allocation instead.

use tracing::{debug, warn};

use crate::domain::allocation::AllocationVector;
use crate::domain::error::AllocError;
use crate::domain::preset;
use crate::domain::price_history::{DEFAULT_SEED_PRICE, PriceHistory};
use crate::domain::strategy::{AllocationStrategy, StrategyConfig};

/// Invested fraction of the fallback allocation.
pub const DEFAULT_FALLBACK_INVESTED: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub assets: Vec<String>,
    pub seed_price: f64,
    pub fallback_invested: f64,
    pub strategy: StrategyConfig,
}

impl EngineConfig {
    /// Default strategy and fallback for the given assets.
    pub fn new(assets: Vec<String>) -> Self {
        Self {
            assets,
            seed_price: DEFAULT_SEED_PRICE,
            fallback_invested: DEFAULT_FALLBACK_INVESTED,
            strategy: preset::default_strategy(),
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = strategy;
        self
    }
}

#[derive(Debug)]
pub enum Decision {
    Computed(AllocationVector),
    Fallback {
        allocation: AllocationVector,
        reason: AllocError,
    },
}

impl Decision {
    pub fn allocation(&self) -> &AllocationVector {
        match self {
            Decision::Computed(a) => a,
            Decision::Fallback { allocation, .. } => allocation,
        }
    }

    pub fn into_allocation(self) -> AllocationVector {
        match self {
            Decision::Computed(a) => a,
            Decision::Fallback { allocation, .. } => allocation,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Decision::Fallback { .. })
    }
}

pub struct DecisionEngine {
    history: PriceHistory,
    strategy: Box<dyn AllocationStrategy>,
    fallback: AllocationVector,
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let fallback = AllocationVector::equal_split(&config.assets, config.fallback_invested);
        let history = PriceHistory::with_seed_price(config.assets, config.seed_price);
        Self {
            history,
            strategy: config.strategy.build(),
            fallback,
        }
    }

    /// Record `prices` (one per asset, NaN for missing) and return the
    /// allocation for this epoch.
    pub fn decide(&mut self, epoch: u64, prices: &[f64]) -> Decision {
        let expected = self.history.asset_count();
        let repaired = self.history.record(epoch, prices);
        if prices.len() > expected {
            return self.fall_back(
                epoch,
                AllocError::DimensionMismatch {
                    expected,
                    got: prices.len(),
                },
            );
        }

        let result = self
            .strategy
            .allocate(&self.history)
            .and_then(|allocation| allocation.check().map(|_| allocation));

        match result {
            Ok(allocation) => {
                debug!(
                    epoch,
                    strategy = self.strategy.name(),
                    repaired = repaired.len(),
                    %allocation,
                    "decision"
                );
                Decision::Computed(allocation)
            }
            Err(reason) => self.fall_back(epoch, reason),
        }
    }

    fn fall_back(&self, epoch: u64, reason: AllocError) -> Decision {
        warn!(epoch, error = %reason, "using fallback allocation");
        Decision::Fallback {
            allocation: self.fallback.clone(),
            reason,
        }
    }

    pub fn reset(&mut self) {
        self.history.reset();
    }

    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::MomentumSplitStrategy;
    use approx::assert_relative_eq;

    fn names(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("Asset {}", (b'A' + i as u8) as char))
            .collect()
    }

    struct Failing;

    impl AllocationStrategy for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn allocate(&self, _history: &PriceHistory) -> Result<AllocationVector, AllocError> {
            Err(AllocError::PriceData {
                reason: "boom".into(),
            })
        }
    }

    #[test]
    fn first_decision_on_empty_history_is_well_formed() {
        let mut engine = DecisionEngine::new(EngineConfig::new(names(1)));
        let decision = engine.decide(0, &[100.0]);
        assert!(!decision.is_fallback());
        let alloc = decision.allocation();
        assert!(alloc.check().is_ok());
        assert_relative_eq!(alloc.get("Asset A").unwrap(), 0.90);
    }

    #[test]
    fn strategy_error_becomes_fallback() {
        let mut engine = DecisionEngine::new(EngineConfig::new(names(2)));
        engine.strategy = Box::new(Failing);
        let decision = engine.decide(0, &[1.0, 2.0]);
        match &decision {
            Decision::Fallback { allocation, reason } => {
                assert_eq!(allocation.get("Asset A"), Some(0.25));
                assert_eq!(allocation.get("Asset B"), Some(0.25));
                assert_eq!(allocation.cash(), 0.5);
                assert!(matches!(reason, AllocError::PriceData { .. }));
            }
            Decision::Computed(_) => panic!("expected fallback"),
        }
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn extra_prices_fall_back_but_are_recorded() {
        let mut engine = DecisionEngine::new(EngineConfig::new(names(1)));
        let decision = engine.decide(0, &[100.0, 50.0]);
        assert!(matches!(
            decision,
            Decision::Fallback {
                reason: AllocError::DimensionMismatch {
                    expected: 1,
                    got: 2
                },
                ..
            }
        ));
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn missing_prices_are_repaired() {
        let mut engine = DecisionEngine::new(EngineConfig::new(names(2)));
        engine.decide(0, &[100.0, 50.0]);
        let decision = engine.decide(1, &[101.0]);
        assert!(!decision.is_fallback());
        assert_eq!(engine.history().last(1), Some(50.0));
    }

    #[test]
    fn reset_clears_history() {
        let mut engine = DecisionEngine::new(EngineConfig::new(names(1)));
        for epoch in 0..5 {
            engine.decide(epoch, &[100.0]);
        }
        engine.reset();
        assert!(engine.history().is_empty());
    }

    #[test]
    fn engine_uses_configured_strategy() {
        let config = EngineConfig::new(names(2))
            .with_strategy(StrategyConfig::MomentumSplit(MomentumSplitStrategy::default()));
        let mut engine = DecisionEngine::new(config);
        assert_eq!(engine.strategy_name(), "momentum_split");
        let alloc = engine.decide(0, &[1.0, 1.0]).into_allocation();
        assert_relative_eq!(alloc.cash(), 1.0 / 3.0, epsilon = 1e-12);
    }
}
