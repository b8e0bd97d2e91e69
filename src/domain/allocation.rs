//! Allocation vectors and the score → allocation mapping.
//!
//! An [`AllocationVector`] always holds one non-negative fraction per asset
//! plus the reserved [`CASH`] entry, and the fractions sum to one.

use std::fmt;

use crate::domain::error::AllocError;
use crate::domain::indicator::stddev::realized_volatility;

pub const CASH: &str = "Cash";

/// Tolerance used when checking that an allocation sums to one.
pub const SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationVector {
    assets: Vec<(String, f64)>,
    cash: f64,
}

impl AllocationVector {
    /// Build from per-asset fractions. Negative or non-finite fractions become
    /// zero; if the remaining fractions exceed one they are scaled down so the
    /// assets sum to exactly one and cash is zero.
    pub fn from_fractions<S: AsRef<str>>(names: &[S], fractions: &[f64]) -> Self {
        let mut assets: Vec<(String, f64)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let f = fractions.get(i).copied().unwrap_or(0.0);
                let f = if f.is_finite() { f.max(0.0) } else { 0.0 };
                (n.as_ref().to_string(), f)
            })
            .collect();

        let invested: f64 = assets.iter().map(|(_, f)| f).sum();
        if invested > 1.0 {
            for (_, f) in &mut assets {
                *f /= invested;
            }
        }
        let invested: f64 = assets.iter().map(|(_, f)| f).sum();
        let cash = (1.0 - invested).max(0.0);

        Self { assets, cash }
    }

    /// Everything in cash.
    pub fn all_cash<S: AsRef<str>>(names: &[S]) -> Self {
        Self::from_fractions(names, &[])
    }

    /// `invested` split equally across the assets, remainder in cash.
    pub fn equal_split<S: AsRef<str>>(names: &[S], invested: f64) -> Self {
        if names.is_empty() {
            return Self::all_cash(names);
        }
        let each = invested.clamp(0.0, 1.0) / names.len() as f64;
        Self::from_fractions(names, &vec![each; names.len()])
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        if name == CASH {
            return Some(self.cash);
        }
        self.assets.iter().find(|(n, _)| n == name).map(|(_, f)| *f)
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn invested(&self) -> f64 {
        self.assets.iter().map(|(_, f)| f).sum()
    }

    pub fn total(&self) -> f64 {
        self.invested() + self.cash
    }

    pub fn asset_fractions(&self) -> impl Iterator<Item = (&str, f64)> {
        self.assets.iter().map(|(n, f)| (n.as_str(), *f))
    }

    /// Assets in order, followed by cash.
    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> {
        self.asset_fractions()
            .chain(std::iter::once((CASH, self.cash)))
    }

    pub fn check(&self) -> Result<(), AllocError> {
        for (name, f) in self.entries() {
            if !f.is_finite() || f < 0.0 {
                return Err(AllocError::MalformedAllocation {
                    reason: format!("{} has fraction {}", name, f),
                });
            }
        }
        let total = self.total();
        if (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(AllocError::MalformedAllocation {
                reason: format!("fractions sum to {}", total),
            });
        }
        Ok(())
    }
}

impl fmt::Display for AllocationVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries()
            .map(|(n, v)| format!("{}={:.4}", n, v))
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// One rung of a step ladder. A strict step needs `score > min_score`, an
/// inclusive one `score >= min_score`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub min_score: f64,
    pub allocation: f64,
    pub strict: bool,
}

impl Step {
    pub fn at_least(min_score: f64, allocation: f64) -> Self {
        Self {
            min_score,
            allocation,
            strict: false,
        }
    }

    pub fn above(min_score: f64, allocation: f64) -> Self {
        Self {
            min_score,
            allocation,
            strict: true,
        }
    }

    pub fn matches(&self, score: f64) -> bool {
        if self.strict {
            score > self.min_score
        } else {
            score >= self.min_score
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AllocationMap {
    /// Highest threshold first; the first matching step wins, else `floor`.
    Steps { steps: Vec<Step>, floor: f64 },
    /// center + score * range, limited to [min, max]
    Linear {
        center: f64,
        range: f64,
        min: f64,
        max: f64,
    },
}

impl AllocationMap {
    pub fn steps(mut steps: Vec<Step>, floor: f64) -> Self {
        steps.sort_by(|a, b| b.min_score.total_cmp(&a.min_score));
        AllocationMap::Steps { steps, floor }
    }

    pub fn map(&self, score: f64) -> f64 {
        match self {
            AllocationMap::Steps { steps, floor } => steps
                .iter()
                .find(|s| s.matches(score))
                .map(|s| s.allocation)
                .unwrap_or(*floor),
            AllocationMap::Linear {
                center,
                range,
                min,
                max,
            } => {
                let value = center + score * range;
                if value.is_nan() {
                    return min.min(*max);
                }
                // Inverted bounds resolve to `max`.
                value.max(*min).min(*max)
            }
        }
    }

    /// Lowest and highest allocation the map can produce.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            AllocationMap::Steps { steps, floor } => steps
                .iter()
                .fold((*floor, *floor), |(lo, hi), s| {
                    (lo.min(s.allocation), hi.max(s.allocation))
                }),
            AllocationMap::Linear { min, max, .. } => (*min, *max),
        }
    }

    pub fn midpoint(&self) -> f64 {
        let (lo, hi) = self.bounds();
        (lo + hi) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum VolatilityScaling {
    #[default]
    None,
    /// Multiply by min(1, target / realized).
    Target { period: usize, target: f64 },
    /// Multiply by `multiplier` when realized volatility exceeds `threshold`.
    Threshold {
        period: usize,
        threshold: f64,
        multiplier: f64,
    },
}

impl VolatilityScaling {
    pub fn factor(&self, prices: &[f64]) -> f64 {
        match *self {
            VolatilityScaling::None => 1.0,
            VolatilityScaling::Target { period, target } => {
                let realized = realized_volatility(prices, period);
                if realized > 0.0 {
                    (target / realized).min(1.0)
                } else {
                    1.0
                }
            }
            VolatilityScaling::Threshold {
                period,
                threshold,
                multiplier,
            } => {
                if realized_volatility(prices, period) > threshold {
                    multiplier
                } else {
                    1.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationMapper {
    pub map: AllocationMap,
    pub volatility: VolatilityScaling,
}

impl AllocationMapper {
    /// Allocation fraction in [0, 1] for one asset.
    pub fn allocate(&self, score: f64, prices: &[f64]) -> f64 {
        let mapped = self.map.map(score);
        let scaled = mapped * self.volatility.factor(prices);
        if scaled.is_finite() {
            scaled.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn names() -> Vec<String> {
        vec!["Asset A".to_string(), "Asset B".to_string()]
    }

    fn statarb_steps() -> AllocationMap {
        AllocationMap::steps(
            vec![
                Step::at_least(-0.8, 0.82),
                Step::at_least(2.5, 0.99),
                Step::at_least(0.2, 0.90),
                Step::at_least(-0.2, 0.87),
            ],
            0.65,
        )
    }

    #[test]
    fn vector_cash_absorbs_remainder() {
        let v = AllocationVector::from_fractions(&names(), &[0.3, 0.2]);
        assert_relative_eq!(v.cash(), 0.5);
        assert_relative_eq!(v.total(), 1.0);
        assert_eq!(v.get("Asset B"), Some(0.2));
        assert_eq!(v.get(CASH), Some(0.5));
        assert_eq!(v.get("Asset C"), None);
        assert!(v.check().is_ok());
    }

    #[test]
    fn vector_over_budget_is_rescaled() {
        let v = AllocationVector::from_fractions(&names(), &[0.9, 0.6]);
        assert_eq!(v.cash(), 0.0);
        assert_relative_eq!(v.total(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.get("Asset A").unwrap(), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn vector_drops_negative_and_nan() {
        let v = AllocationVector::from_fractions(&names(), &[-0.4, f64::NAN]);
        assert_eq!(v.get("Asset A"), Some(0.0));
        assert_eq!(v.get("Asset B"), Some(0.0));
        assert_eq!(v.cash(), 1.0);
    }

    #[test]
    fn vector_entries_end_with_cash() {
        let v = AllocationVector::equal_split(&names(), 0.5);
        let entries: Vec<(&str, f64)> = v.entries().collect();
        assert_eq!(
            entries,
            vec![("Asset A", 0.25), ("Asset B", 0.25), ("Cash", 0.5)]
        );
        assert_eq!(v.to_string(), "Asset A=0.2500 Asset B=0.2500 Cash=0.5000");
    }

    #[test]
    fn check_rejects_bad_sum() {
        let v = AllocationVector {
            assets: vec![("A".into(), 0.7)],
            cash: 0.7,
        };
        assert!(matches!(
            v.check(),
            Err(AllocError::MalformedAllocation { .. })
        ));
    }

    #[test]
    fn steps_evaluated_from_highest_threshold() {
        let map = statarb_steps();
        assert_eq!(map.map(3.0), 0.99);
        assert_eq!(map.map(2.5), 0.99);
        assert_eq!(map.map(1.0), 0.90);
        assert_eq!(map.map(0.0), 0.87);
        assert_eq!(map.map(-0.5), 0.82);
        assert_eq!(map.map(-5.0), 0.65);
    }

    #[test]
    fn strict_steps_skip_exact_threshold() {
        let map = AllocationMap::steps(
            vec![Step::above(2.5, 0.99), Step::above(-0.2, 0.87)],
            0.65,
        );
        assert_eq!(map.map(2.5), 0.87);
        assert_eq!(map.map(2.5001), 0.99);
        assert_eq!(map.map(-0.2), 0.65);
        assert_eq!(map.map(-0.1999), 0.87);
    }

    #[test]
    fn step_bounds_and_midpoint() {
        let map = statarb_steps();
        assert_eq!(map.bounds(), (0.65, 0.99));
        assert_relative_eq!(map.midpoint(), 0.82, epsilon = 1e-12);
    }

    #[test]
    fn linear_map_saturates() {
        let map = AllocationMap::Linear {
            center: 0.82,
            range: 0.17,
            min: 0.65,
            max: 0.99,
        };
        assert_relative_eq!(map.map(0.0), 0.82);
        assert_relative_eq!(map.map(0.5), 0.905, epsilon = 1e-12);
        assert_eq!(map.map(10.0), 0.99);
        assert_eq!(map.map(-10.0), 0.65);
    }

    #[test]
    fn inverted_linear_range_does_not_panic() {
        let map = AllocationMap::Linear {
            center: 0.82,
            range: 0.17,
            min: 0.995,
            max: 0.99,
        };
        assert_eq!(map.map(0.0), 0.99);
        assert_eq!(map.map(-10.0), 0.99);
        assert_eq!(map.map(f64::NAN), 0.99);
    }

    #[test]
    fn target_volatility_scales_down_only() {
        let choppy: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 110.0 })
            .collect();
        let scaling = VolatilityScaling::Target {
            period: 20,
            target: 0.01,
        };
        let f = scaling.factor(&choppy);
        assert!(f > 0.0 && f < 1.0);

        let calm = vec![100.0; 30];
        assert_eq!(scaling.factor(&calm), 1.0);
    }

    #[test]
    fn threshold_volatility_applies_multiplier() {
        let choppy: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 110.0 })
            .collect();
        let scaling = VolatilityScaling::Threshold {
            period: 20,
            threshold: 0.015,
            multiplier: 0.85,
        };
        assert_eq!(scaling.factor(&choppy), 0.85);
        assert_eq!(scaling.factor(&[100.0; 30]), 1.0);
    }

    #[test]
    fn mapper_clamps_to_unit_interval() {
        let mapper = AllocationMapper {
            map: AllocationMap::Linear {
                center: 0.5,
                range: 1.0,
                min: -1.0,
                max: 2.0,
            },
            volatility: VolatilityScaling::None,
        };
        assert_eq!(mapper.allocate(5.0, &[]), 1.0);
        assert_eq!(mapper.allocate(-5.0, &[]), 0.0);
    }
}
