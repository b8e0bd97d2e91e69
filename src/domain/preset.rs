//! Built-in strategy presets.
//!
//! Each preset is a complete [`StrategyConfig`] for one of the hand-tuned
//! strategy families. Config files select one with `[engine] preset = NAME`
//! and may override individual sections on top of it.

use crate::domain::allocation::{AllocationMap, AllocationMapper, Step, VolatilityScaling};
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator::ema::EmaPair;
use crate::domain::indicator::regime::RegimeThresholds;
use crate::domain::optimizer::TangencyConfig;
use crate::domain::signal::{
    Band, BandTable, FusionConfig, RegimeSignals, SignalComponent, SignalMap,
};
use crate::domain::strategy::{
    IndicatorStrategy, MomentumSplitStrategy, StrategyConfig, TangencyStrategy,
};

pub const DEFAULT_PRESET: &str = "trend_following";

/// Name and one-line description of every preset.
pub const PRESETS: &[(&str, &str)] = &[
    (
        "trend_following",
        "EMA trend, crossover, RSI and ROC confirmation; defensive floor on downtrends",
    ),
    (
        "hybrid_rsi_bollinger",
        "RSI and Bollinger double confirmation of overbought/oversold",
    ),
    (
        "statarb",
        "z-score, RSI and momentum blend with a nine-level allocation ladder",
    ),
    (
        "ultra_hybrid",
        "finer RSI and z-score bands with a fourteen-level ladder",
    ),
    (
        "feature_blend",
        "normalized features combined linearly, reduced in high volatility",
    ),
    (
        "regime_switching",
        "regime classification with RSI and z-score adjustments",
    ),
    ("stochastic", "stochastic %K overbought/oversold levels"),
    (
        "triple_momentum",
        "three-timeframe moving average alignment with a volatility filter",
    ),
    ("tangency", "mean-variance tangency portfolio"),
    (
        "momentum_split",
        "capital split in proportion to positive 14-epoch momentum",
    ),
];

fn component(name: &str, indicator: IndicatorType, bands: Vec<Band>, weight: f64) -> SignalComponent {
    SignalComponent {
        name: name.to_string(),
        indicator,
        map: SignalMap::Bands(BandTable::new(bands)),
        weight,
    }
}

fn linear(
    name: &str,
    indicator: IndicatorType,
    center: f64,
    scale: f64,
    invert: bool,
    weight: f64,
) -> SignalComponent {
    SignalComponent {
        name: name.to_string(),
        indicator,
        map: SignalMap::Linear {
            center,
            scale,
            invert,
        },
        weight,
    }
}

fn steps(pairs: &[(f64, f64)], floor: f64) -> AllocationMap {
    AllocationMap::steps(
        pairs
            .iter()
            .map(|&(min_score, allocation)| Step::at_least(min_score, allocation))
            .collect(),
        floor,
    )
}

/// Ladder where each rung needs the score strictly above its threshold.
fn strict_steps(pairs: &[(f64, f64)], floor: f64) -> AllocationMap {
    AllocationMap::steps(
        pairs
            .iter()
            .map(|&(min_score, allocation)| Step::above(min_score, allocation))
            .collect(),
        floor,
    )
}

fn indicator(
    warmup: usize,
    base_allocation: f64,
    components: Vec<SignalComponent>,
    map: AllocationMap,
    volatility: VolatilityScaling,
) -> StrategyConfig {
    StrategyConfig::Indicator(IndicatorStrategy {
        warmup,
        base_allocation,
        fusion: FusionConfig {
            components,
            saturation: None,
        },
        mapper: AllocationMapper { map, volatility },
    })
}

fn trend_following() -> StrategyConfig {
    let trend_emas = EmaPair::new(20, 50).with_windows(30, 60);
    indicator(
        50,
        0.90,
        vec![
            // +2 above the fast EMA, +1 above only the slow one, -1 below both.
            component(
                "ema_position",
                IndicatorType::EmaPosition(trend_emas),
                vec![
                    Band::above(1.5, 2.0),
                    Band::above(0.5, 1.0),
                    Band::below(0.5, -1.0),
                ],
                1.0,
            ),
            component(
                "ema_cross",
                IndicatorType::EmaTrend(trend_emas),
                vec![Band::above(0.0, 1.0)],
                1.0,
            ),
            component(
                "rsi",
                IndicatorType::Rsi(14),
                vec![Band::above(55.0, 1.0), Band::below(45.0, -1.0)],
                1.0,
            ),
            component(
                "roc",
                IndicatorType::Momentum(10),
                vec![Band::above(0.0, 1.0)],
                1.0,
            ),
        ],
        steps(&[(4.0, 1.0), (3.0, 0.98), (1.0, 0.95), (-1.0, 0.85)], 0.10),
        VolatilityScaling::None,
    )
}

fn hybrid_rsi_bollinger() -> StrategyConfig {
    indicator(
        20,
        0.85,
        vec![
            component(
                "rsi",
                IndicatorType::Rsi(14),
                vec![
                    Band::above(70.0, -2.0),
                    Band::above(60.0, -1.0),
                    Band::below(30.0, 2.0),
                    Band::below(40.0, 1.0),
                ],
                1.0,
            ),
            // Outside the 2-sigma band is a strong signal, past half of it a weak one.
            component(
                "bollinger",
                IndicatorType::ZScore(20),
                vec![
                    Band::above(2.0, -2.0),
                    Band::above(1.0, -1.0),
                    Band::below(-2.0, 2.0),
                    Band::below(-1.0, 1.0),
                ],
                1.0,
            ),
        ],
        steps(&[(3.0, 1.0), (1.0, 0.95), (0.0, 0.85), (-2.0, 0.20)], 0.0),
        VolatilityScaling::None,
    )
}

fn statarb() -> StrategyConfig {
    indicator(
        30,
        0.92,
        vec![
            component(
                "zscore",
                IndicatorType::ZScore(22),
                vec![
                    Band::below(-2.0, 2.5),
                    Band::below(-1.3, 1.5),
                    Band::below(-0.7, 0.5),
                    Band::above(2.0, -2.5),
                    Band::above(1.3, -1.5),
                    Band::above(0.7, -0.5),
                ],
                0.35,
            ),
            component(
                "rsi",
                IndicatorType::Rsi(14),
                vec![
                    Band::below(25.0, 2.5),
                    Band::below(32.0, 1.5),
                    Band::below(42.0, 0.5),
                    Band::above(75.0, -2.5),
                    Band::above(68.0, -1.5),
                    Band::above(58.0, -0.5),
                ],
                0.35,
            ),
            component(
                "momentum",
                IndicatorType::Momentum(10),
                vec![
                    Band::above(0.03, 1.5),
                    Band::above(0.015, 0.8),
                    Band::below(-0.03, -1.5),
                    Band::below(-0.015, -0.8),
                ],
                0.30,
            ),
        ],
        strict_steps(
            &[
                (2.5, 0.99),
                (1.5, 0.96),
                (0.8, 0.93),
                (0.2, 0.90),
                (-0.2, 0.87),
                (-0.8, 0.82),
                (-1.5, 0.76),
                (-2.5, 0.70),
            ],
            0.65,
        ),
        VolatilityScaling::None,
    )
}

fn ultra_hybrid() -> StrategyConfig {
    indicator(
        25,
        0.91,
        vec![
            component(
                "rsi",
                IndicatorType::Rsi(13),
                vec![
                    Band::below(22.0, 2.5),
                    Band::below(28.0, 2.0),
                    Band::below(35.0, 1.2),
                    Band::below(43.0, 0.5),
                    Band::above(78.0, -2.5),
                    Band::above(72.0, -2.0),
                    Band::above(65.0, -1.2),
                    Band::above(57.0, -0.5),
                ],
                0.45,
            ),
            component(
                "zscore",
                IndicatorType::ZScore(23),
                vec![
                    Band::below(-2.2, 2.8),
                    Band::below(-1.6, 2.2),
                    Band::below(-1.0, 1.5),
                    Band::below(-0.5, 0.7),
                    Band::above(2.2, -2.8),
                    Band::above(1.6, -2.2),
                    Band::above(1.0, -1.5),
                    Band::above(0.5, -0.7),
                ],
                0.55,
            ),
        ],
        steps(
            &[
                (4.5, 0.99),
                (3.8, 0.97),
                (3.0, 0.95),
                (2.2, 0.93),
                (1.5, 0.91),
                (0.8, 0.89),
                (0.3, 0.87),
                (-0.3, 0.85),
                (-0.8, 0.82),
                (-1.5, 0.78),
                (-2.2, 0.74),
                (-3.0, 0.70),
                (-3.8, 0.67),
            ],
            0.64,
        ),
        VolatilityScaling::None,
    )
}

fn feature_blend() -> StrategyConfig {
    indicator(
        30,
        0.91,
        vec![
            linear("zscore", IndicatorType::ZScore(20), 0.0, 2.5, true, 0.30),
            linear("rsi", IndicatorType::Rsi(14), 50.0, 50.0, true, 0.25),
            linear(
                "momentum",
                IndicatorType::MomentumBlend(5, 10, 20),
                0.0,
                0.1,
                false,
                0.25,
            ),
            // %R lives in [-100, 0]; inverted so oversold reads positive.
            linear("williams", IndicatorType::WilliamsR(14), 0.0, 100.0, true, 0.20),
        ],
        AllocationMap::Linear {
            center: 0.82,
            range: 0.17,
            min: 0.65,
            max: 0.99,
        },
        VolatilityScaling::Threshold {
            period: 20,
            threshold: 0.0092,
            multiplier: 0.85,
        },
    )
}

fn regime_switching() -> StrategyConfig {
    indicator(
        60,
        0.91,
        vec![
            SignalComponent {
                name: "regime".to_string(),
                indicator: IndicatorType::Regime(RegimeThresholds::default()),
                map: SignalMap::Regime(RegimeSignals {
                    bull_trend: 3.0,
                    bear_trend: -2.0,
                    high_vol: -1.0,
                    low_vol: 2.0,
                    ranging: 1.0,
                    neutral: 1.0,
                }),
                weight: 1.0,
            },
            component(
                "rsi",
                IndicatorType::Rsi(14),
                vec![Band::below(30.0, 1.0), Band::above(70.0, -1.0)],
                1.0,
            ),
            component(
                "zscore",
                IndicatorType::ZScore(20),
                vec![Band::below(-1.5, 1.0), Band::above(1.5, -1.0)],
                1.0,
            ),
        ],
        steps(
            &[
                (4.0, 0.98),
                (3.0, 0.96),
                (2.0, 0.95),
                (1.0, 0.90),
                (0.0, 0.82),
                (-1.0, 0.78),
            ],
            0.73,
        ),
        VolatilityScaling::None,
    )
}

fn stochastic() -> StrategyConfig {
    indicator(
        20,
        0.90,
        vec![component(
            "stochastic",
            IndicatorType::Stochastic(14),
            vec![
                Band::below(15.0, 2.0),
                Band::below(25.0, 1.0),
                Band::above(85.0, -2.0),
                Band::above(75.0, -1.0),
            ],
            1.0,
        )],
        steps(&[(2.0, 0.96), (1.0, 0.93), (0.0, 0.90), (-1.0, 0.82)], 0.72),
        VolatilityScaling::None,
    )
}

fn triple_momentum() -> StrategyConfig {
    indicator(
        60,
        0.92,
        vec![
            component(
                "short_trend",
                IndicatorType::SmaTrend { fast: 5, slow: 20 },
                vec![Band::above(0.0, 1.0)],
                1.0,
            ),
            component(
                "long_trend",
                IndicatorType::SmaTrend { fast: 20, slow: 50 },
                vec![Band::above(0.0, 1.0)],
                1.0,
            ),
            component(
                "price_vs_sma",
                IndicatorType::PriceVsSma(5),
                vec![Band::above(0.0, 1.0)],
                1.0,
            ),
        ],
        steps(&[(3.0, 0.97), (2.0, 0.92), (1.0, 0.82)], 0.70),
        VolatilityScaling::Threshold {
            period: 20,
            threshold: 0.015,
            multiplier: 0.85,
        },
    )
}

/// Look up a preset by name.
pub fn preset(name: &str) -> Option<StrategyConfig> {
    let config = match name {
        "trend_following" => trend_following(),
        "hybrid_rsi_bollinger" => hybrid_rsi_bollinger(),
        "statarb" => statarb(),
        "ultra_hybrid" => ultra_hybrid(),
        "feature_blend" => feature_blend(),
        "regime_switching" => regime_switching(),
        "stochastic" => stochastic(),
        "triple_momentum" => triple_momentum(),
        "tangency" => StrategyConfig::Tangency(TangencyStrategy {
            config: TangencyConfig::default(),
        }),
        "momentum_split" => StrategyConfig::MomentumSplit(MomentumSplitStrategy::default()),
        _ => return None,
    };
    Some(config)
}

pub fn default_strategy() -> StrategyConfig {
    trend_following()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_preset_resolves() {
        for (name, _) in PRESETS {
            assert!(preset(name).is_some(), "preset {} missing", name);
        }
        assert!(preset("nonexistent").is_none());
    }

    #[test]
    fn default_preset_is_trend_following() {
        assert_eq!(preset(DEFAULT_PRESET), Some(default_strategy()));
    }

    #[test]
    fn trend_following_midpoint() {
        let StrategyConfig::Indicator(s) = default_strategy() else {
            panic!("expected indicator strategy");
        };
        assert_eq!(s.mapper.map.bounds(), (0.10, 1.0));
        assert!((s.mapper.map.midpoint() - 0.55).abs() < 1e-12);
        assert_eq!(s.fusion.components.len(), 4);
    }

    #[test]
    fn indicator_presets_have_positive_warmup() {
        for (name, _) in PRESETS {
            if let Some(StrategyConfig::Indicator(s)) = preset(name) {
                assert!(s.warmup > 0, "{}", name);
                assert!((0.0..=1.0).contains(&s.base_allocation), "{}", name);
                let (lo, hi) = s.mapper.map.bounds();
                assert!(lo >= 0.0 && hi <= 1.0, "{}", name);
            }
        }
    }

    #[test]
    fn statarb_weights_are_convex() {
        let StrategyConfig::Indicator(s) = preset("statarb").unwrap() else {
            panic!("expected indicator strategy");
        };
        let total: f64 = s.fusion.components.iter().map(|c| c.weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn statarb_ladder_needs_score_above_threshold() {
        let StrategyConfig::Indicator(s) = preset("statarb").unwrap() else {
            panic!("expected indicator strategy");
        };
        assert_eq!(s.mapper.map.map(2.5), 0.96);
        assert_eq!(s.mapper.map.map(2.6), 0.99);
        assert_eq!(s.mapper.map.map(-2.5), 0.65);
    }
}
