//! Configuration validation.
//!
//! Checks every scalar field of an engine config before anything is built and
//! reports the first problem. Indicator, band and step strings are checked by
//! the parser when the engine config is built.

use crate::domain::allocation::CASH;
use crate::domain::error::AllocError;
use crate::domain::preset;
use crate::domain::signal_parser::MAX_PERIOD;
use crate::ports::config_port::ConfigPort;

pub const STRATEGY_KINDS: &[&str] = &["indicator", "tangency", "momentum_split"];

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), AllocError> {
    validate_assets(config)?;
    validate_strategy_selection(config)?;
    validate_engine_numbers(config)?;
    validate_indicator(config)?;
    validate_components(config)?;
    validate_allocation(config)?;
    validate_regime(config)?;
    validate_tangency(config)?;
    validate_momentum_split(config)?;
    Ok(())
}

/// Parsed value of a numeric key, `None` when absent.
pub fn number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, AllocError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(AllocError::invalid(
                section,
                key,
                format!("'{}' is not a number", raw),
            )),
        },
    }
}

pub fn integer(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<i64>, AllocError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<i64>().map(Some).map_err(|_| {
            AllocError::invalid(section, key, format!("'{}' is not an integer", raw))
        }),
    }
}

fn fraction(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), AllocError> {
    if let Some(v) = number(config, section, key)? {
        if !(0.0..=1.0).contains(&v) {
            return Err(AllocError::invalid(
                section,
                key,
                format!("{} must be between 0 and 1", key),
            ));
        }
    }
    Ok(())
}

fn positive(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), AllocError> {
    if let Some(v) = number(config, section, key)? {
        if v <= 0.0 {
            return Err(AllocError::invalid(
                section,
                key,
                format!("{} must be positive", key),
            ));
        }
    }
    Ok(())
}

fn non_negative(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), AllocError> {
    if let Some(v) = number(config, section, key)? {
        if v < 0.0 {
            return Err(AllocError::invalid(
                section,
                key,
                format!("{} must be non-negative", key),
            ));
        }
    }
    Ok(())
}

/// Integer window or period in `[min, MAX_PERIOD]`.
fn period(config: &dyn ConfigPort, section: &str, key: &str, min: i64) -> Result<(), AllocError> {
    if let Some(v) = integer(config, section, key)? {
        if v < min {
            return Err(AllocError::invalid(
                section,
                key,
                format!("{} must be at least {}", key, min),
            ));
        }
        if v > MAX_PERIOD as i64 {
            return Err(AllocError::invalid(
                section,
                key,
                format!("{} must be at most {}", key, MAX_PERIOD),
            ));
        }
    }
    Ok(())
}

fn one_of(config: &dyn ConfigPort, section: &str, key: &str, allowed: &[&str]) -> Result<(), AllocError> {
    if let Some(v) = config.get_string(section, key) {
        if !allowed.contains(&v.trim()) {
            return Err(AllocError::invalid(
                section,
                key,
                format!("'{}' is not one of {}", v.trim(), allowed.join(", ")),
            ));
        }
    }
    Ok(())
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), AllocError> {
    let assets = config.get_list("engine", "assets");
    if assets.is_empty() {
        return Err(AllocError::missing("engine", "assets"));
    }
    for (i, asset) in assets.iter().enumerate() {
        if asset == CASH {
            return Err(AllocError::invalid(
                "engine",
                "assets",
                format!("'{}' is reserved", CASH),
            ));
        }
        if assets[..i].contains(asset) {
            return Err(AllocError::invalid(
                "engine",
                "assets",
                format!("duplicate asset '{}'", asset),
            ));
        }
    }
    Ok(())
}

fn validate_strategy_selection(config: &dyn ConfigPort) -> Result<(), AllocError> {
    one_of(config, "engine", "strategy", STRATEGY_KINDS)?;

    let Some(name) = config.get_string("engine", "preset") else {
        return Ok(());
    };
    let name = name.trim();
    let Some(base) = preset::preset(name) else {
        return Err(AllocError::invalid(
            "engine",
            "preset",
            format!("unknown preset '{}'", name),
        ));
    };
    if let Some(kind) = config.get_string("engine", "strategy") {
        if kind.trim() != base.kind() {
            return Err(AllocError::invalid(
                "engine",
                "strategy",
                format!("preset '{}' is a {} strategy", name, base.kind()),
            ));
        }
    }
    Ok(())
}

fn validate_engine_numbers(config: &dyn ConfigPort) -> Result<(), AllocError> {
    positive(config, "engine", "seed_price")?;
    fraction(config, "engine", "fallback_invested")?;
    Ok(())
}

fn validate_indicator(config: &dyn ConfigPort) -> Result<(), AllocError> {
    period(config, "indicator", "warmup", 0)?;
    fraction(config, "indicator", "base_allocation")?;
    positive(config, "indicator", "saturation")?;
    Ok(())
}

fn validate_components(config: &dyn ConfigPort) -> Result<(), AllocError> {
    let names = config.get_list("indicator", "components");
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(AllocError::invalid(
                "indicator",
                "components",
                format!("duplicate component '{}'", name),
            ));
        }
        let section = format!("component.{}", name);
        if !config.has_key(&section, "indicator") {
            return Err(AllocError::missing(&section, "indicator"));
        }
        number(config, &section, "weight")?;
        number(config, &section, "linear_center")?;
        positive(config, &section, "linear_scale")?;
    }
    Ok(())
}

fn validate_allocation(config: &dyn ConfigPort) -> Result<(), AllocError> {
    one_of(config, "allocation", "mapping", &["steps", "linear"])?;
    fraction(config, "allocation", "floor")?;
    fraction(config, "allocation", "center")?;
    number(config, "allocation", "range")?;
    fraction(config, "allocation", "min")?;
    fraction(config, "allocation", "max")?;
    if let (Some(min), Some(max)) = (
        number(config, "allocation", "min")?,
        number(config, "allocation", "max")?,
    ) {
        if min > max {
            return Err(AllocError::invalid(
                "allocation",
                "min",
                "min must not exceed max",
            ));
        }
    }

    one_of(
        config,
        "allocation",
        "volatility_scaling",
        &["none", "target", "threshold"],
    )?;
    period(config, "allocation", "vol_period", 2)?;
    positive(config, "allocation", "target_vol")?;
    positive(config, "allocation", "vol_threshold")?;
    fraction(config, "allocation", "vol_multiplier")?;
    Ok(())
}

fn validate_regime(config: &dyn ConfigPort) -> Result<(), AllocError> {
    for key in [
        "fast_ma",
        "slow_ma",
        "vol_period",
        "autocorr_period",
        "min_history",
    ] {
        period(config, "regime", key, 1)?;
    }
    if let (Some(fast), Some(slow)) = (
        integer(config, "regime", "fast_ma")?,
        integer(config, "regime", "slow_ma")?,
    ) {
        if fast >= slow {
            return Err(AllocError::invalid(
                "regime",
                "fast_ma",
                "fast_ma must be shorter than slow_ma",
            ));
        }
    }
    for key in ["trend_threshold", "high_vol", "low_vol", "autocorr_threshold"] {
        non_negative(config, "regime", key)?;
    }
    if let (Some(low), Some(high)) = (
        number(config, "regime", "low_vol")?,
        number(config, "regime", "high_vol")?,
    ) {
        if low > high {
            return Err(AllocError::invalid(
                "regime",
                "low_vol",
                "low_vol must not exceed high_vol",
            ));
        }
    }
    Ok(())
}

fn validate_tangency(config: &dyn ConfigPort) -> Result<(), AllocError> {
    period(config, "tangency", "lookback", 2)?;
    number(config, "tangency", "risk_free_rate")?;
    positive(config, "tangency", "periods_per_year")?;
    fraction(config, "tangency", "invest_fraction")?;
    Ok(())
}

fn validate_momentum_split(config: &dyn ConfigPort) -> Result<(), AllocError> {
    period(config, "momentum_split", "warmup", 0)?;
    period(config, "momentum_split", "lookback", 1)?;
    fraction(config, "momentum_split", "invest_fraction")?;
    Ok(())
}
