//! Command-line interface: build an engine from an INI file and replay a
//! price table through it.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_price_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::allocation::{AllocationMap, AllocationMapper, AllocationVector, CASH, VolatilityScaling};
use crate::domain::config_validation::{number, validate_engine_config};
use crate::domain::engine::{DEFAULT_FALLBACK_INVESTED, DecisionEngine, EngineConfig};
use crate::domain::error::AllocError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator::regime::{Regime, RegimeThresholds};
use crate::domain::optimizer::TangencyConfig;
use crate::domain::preset::{self, DEFAULT_PRESET, PRESETS};
use crate::domain::price_history::DEFAULT_SEED_PRICE;
use crate::domain::signal::{RegimeSignals, SignalComponent, SignalMap};
use crate::domain::signal_parser::{parse_bands, parse_indicator, parse_steps};
use crate::domain::strategy::{
    IndicatorStrategy, MomentumSplitStrategy, StrategyConfig, TangencyStrategy,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;

#[derive(Parser, Debug)]
#[command(name = "tactical-alloc", about = "Per-epoch tactical capital allocation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a price table and write the allocation for every epoch
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        prices: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Validate a configuration and print the resolved strategy
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the built-in strategy presets
    Presets,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            prices,
            output,
            verbose,
        } => {
            init_logging(verbose);
            run_replay(&config, &prices, output.as_ref())
        }
        Command::Validate { config } => {
            init_logging(false);
            run_validate(&config)
        }
        Command::Presets => run_presets(),
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the default level.
pub fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // A second call (tests driving `run` in-process) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(filter)
        .try_init();
}

fn report(err: &AllocError) -> ExitCode {
    match err {
        AllocError::Syntax { input, source, .. } => {
            eprintln!("error: {err}\n{}", source.display_with_context(input));
        }
        _ => eprintln!("error: {err}"),
    }
    err.into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| report(&e))
}

/// Validate the config and resolve it into an engine config: the selected
/// preset (or the default one) with every configured section applied on top.
pub fn build_engine_config(adapter: &dyn ConfigPort) -> Result<EngineConfig, AllocError> {
    validate_engine_config(adapter)?;

    Ok(EngineConfig {
        assets: adapter.get_list("engine", "assets"),
        seed_price: adapter.get_double("engine", "seed_price", DEFAULT_SEED_PRICE),
        fallback_invested: adapter.get_double(
            "engine",
            "fallback_invested",
            DEFAULT_FALLBACK_INVESTED,
        ),
        strategy: build_strategy(adapter)?,
    })
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<StrategyConfig, AllocError> {
    let base_name = match (
        adapter.get_string("engine", "preset"),
        adapter.get_string("engine", "strategy"),
    ) {
        (Some(name), _) => name.trim().to_string(),
        (None, Some(kind)) if kind.trim() != "indicator" => kind.trim().to_string(),
        _ => DEFAULT_PRESET.to_string(),
    };
    let base = preset::preset(&base_name).ok_or_else(|| {
        AllocError::invalid("engine", "preset", format!("unknown preset '{}'", base_name))
    })?;

    Ok(match base {
        StrategyConfig::Indicator(s) => StrategyConfig::Indicator(build_indicator(adapter, s)?),
        StrategyConfig::Tangency(s) => StrategyConfig::Tangency(TangencyStrategy {
            config: build_tangency(adapter, s.config),
        }),
        StrategyConfig::MomentumSplit(s) => {
            StrategyConfig::MomentumSplit(build_momentum_split(adapter, s))
        }
    })
}

fn build_indicator(
    adapter: &dyn ConfigPort,
    mut strategy: IndicatorStrategy,
) -> Result<IndicatorStrategy, AllocError> {
    strategy.warmup = adapter
        .get_int("indicator", "warmup", strategy.warmup as i64)
        .max(0) as usize;
    strategy.base_allocation =
        adapter.get_double("indicator", "base_allocation", strategy.base_allocation);
    if let Some(bound) = number(adapter, "indicator", "saturation")? {
        strategy.fusion.saturation = Some(bound);
    }

    let names = adapter.get_list("indicator", "components");
    if !names.is_empty() {
        strategy.fusion.components = names
            .iter()
            .map(|name| build_component(adapter, name))
            .collect::<Result<_, _>>()?;
    }

    for component in &mut strategy.fusion.components {
        if let IndicatorType::Regime(thresholds) = &mut component.indicator {
            *thresholds = build_regime_thresholds(adapter, *thresholds)?;
        }
    }

    strategy.mapper = build_mapper(adapter, strategy.mapper)?;
    Ok(strategy)
}

fn build_component(adapter: &dyn ConfigPort, name: &str) -> Result<SignalComponent, AllocError> {
    let section = format!("component.{}", name);
    let text = adapter
        .get_string(&section, "indicator")
        .ok_or_else(|| AllocError::missing(&section, "indicator"))?;
    let indicator =
        parse_indicator(&text).map_err(|e| AllocError::syntax(&section, "indicator", &text, e))?;

    let map = if indicator.is_regime() {
        let mut signals = RegimeSignals::default();
        for regime in Regime::ALL {
            let key = format!("regime_{}", regime.key());
            signals.set(regime, adapter.get_double(&section, &key, 0.0));
        }
        SignalMap::Regime(signals)
    } else if let Some(bands) = adapter.get_string(&section, "bands") {
        SignalMap::Bands(
            parse_bands(&bands).map_err(|e| AllocError::syntax(&section, "bands", &bands, e))?,
        )
    } else if adapter.has_key(&section, "linear_scale") {
        SignalMap::Linear {
            center: adapter.get_double(&section, "linear_center", 0.0),
            scale: adapter.get_double(&section, "linear_scale", 1.0),
            invert: adapter.get_bool(&section, "linear_invert", false),
        }
    } else {
        return Err(AllocError::missing(&section, "bands"));
    };

    Ok(SignalComponent {
        name: name.to_string(),
        indicator,
        map,
        weight: adapter.get_double(&section, "weight", 1.0),
    })
}

fn build_mapper(
    adapter: &dyn ConfigPort,
    current: AllocationMapper,
) -> Result<AllocationMapper, AllocError> {
    let has = |key: &str| adapter.has_key("allocation", key);
    let mapping = match adapter.get_string("allocation", "mapping") {
        Some(m) => m.trim().to_string(),
        None if has("steps") => "steps".to_string(),
        None if has("center") || has("range") => "linear".to_string(),
        None => match current.map {
            AllocationMap::Steps { .. } => "steps".to_string(),
            AllocationMap::Linear { .. } => "linear".to_string(),
        },
    };

    let map = match mapping.as_str() {
        "steps" => {
            if let Some(key) = ["center", "range", "min", "max"].into_iter().find(|&k| has(k)) {
                return Err(AllocError::invalid(
                    "allocation",
                    key,
                    "only applies to linear mapping",
                ));
            }
            let (steps, floor) = match current.map {
                AllocationMap::Steps { steps, floor } => (steps, floor),
                AllocationMap::Linear { .. } => (Vec::new(), 0.0),
            };
            let steps = match adapter.get_string("allocation", "steps") {
                Some(text) => parse_steps(&text)
                    .map_err(|e| AllocError::syntax("allocation", "steps", &text, e))?,
                None if !steps.is_empty() => steps,
                None => return Err(AllocError::missing("allocation", "steps")),
            };
            let floor = adapter.get_double("allocation", "floor", floor);
            if !(0.0..=1.0).contains(&floor) {
                return Err(AllocError::invalid("allocation", "floor", "must lie in [0, 1]"));
            }
            AllocationMap::steps(steps, floor)
        }
        "linear" => {
            if let Some(key) = ["steps", "floor"].into_iter().find(|&k| has(k)) {
                return Err(AllocError::invalid(
                    "allocation",
                    key,
                    "only applies to steps mapping",
                ));
            }
            let (center, range, min, max) = match current.map {
                AllocationMap::Linear {
                    center,
                    range,
                    min,
                    max,
                } => (center, range, min, max),
                AllocationMap::Steps { .. } => (0.5, 0.25, 0.0, 1.0),
            };
            let min = adapter.get_double("allocation", "min", min);
            let max = adapter.get_double("allocation", "max", max);
            for (key, value) in [("min", min), ("max", max)] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(AllocError::invalid("allocation", key, "must lie in [0, 1]"));
                }
            }
            if min > max {
                return Err(AllocError::invalid(
                    "allocation",
                    "min",
                    format!("min {} exceeds max {}", min, max),
                ));
            }
            AllocationMap::Linear {
                center: adapter.get_double("allocation", "center", center),
                range: adapter.get_double("allocation", "range", range),
                min,
                max,
            }
        }
        other => {
            return Err(AllocError::invalid(
                "allocation",
                "mapping",
                format!("unknown mapping '{}'", other),
            ));
        }
    };

    let period = adapter.get_int("allocation", "vol_period", 20).max(2) as usize;
    let volatility = match adapter
        .get_string("allocation", "volatility_scaling")
        .as_deref()
        .map(str::trim)
    {
        Some("none") => VolatilityScaling::None,
        Some("target") => VolatilityScaling::Target {
            period,
            target: adapter.get_double("allocation", "target_vol", 0.01),
        },
        Some("threshold") => VolatilityScaling::Threshold {
            period,
            threshold: adapter.get_double("allocation", "vol_threshold", 0.015),
            multiplier: adapter.get_double("allocation", "vol_multiplier", 0.85),
        },
        _ => current.volatility,
    };

    Ok(AllocationMapper { map, volatility })
}

fn build_regime_thresholds(
    adapter: &dyn ConfigPort,
    t: RegimeThresholds,
) -> Result<RegimeThresholds, AllocError> {
    let int = |key: &str, default: usize| adapter.get_int("regime", key, default as i64).max(1) as usize;
    let merged = RegimeThresholds {
        fast_ma: int("fast_ma", t.fast_ma),
        slow_ma: int("slow_ma", t.slow_ma),
        vol_period: int("vol_period", t.vol_period),
        autocorr_period: int("autocorr_period", t.autocorr_period),
        min_history: int("min_history", t.min_history),
        trend_threshold: adapter.get_double("regime", "trend_threshold", t.trend_threshold),
        high_vol: adapter.get_double("regime", "high_vol", t.high_vol),
        low_vol: adapter.get_double("regime", "low_vol", t.low_vol),
        autocorr_threshold: adapter.get_double("regime", "autocorr_threshold", t.autocorr_threshold),
    };
    if merged.fast_ma >= merged.slow_ma {
        return Err(AllocError::invalid(
            "regime",
            "fast_ma",
            format!(
                "fast_ma {} must be shorter than slow_ma {}",
                merged.fast_ma, merged.slow_ma
            ),
        ));
    }
    Ok(merged)
}

fn build_tangency(adapter: &dyn ConfigPort, c: TangencyConfig) -> TangencyConfig {
    TangencyConfig {
        lookback: adapter.get_int("tangency", "lookback", c.lookback as i64).max(2) as usize,
        risk_free_rate: adapter.get_double("tangency", "risk_free_rate", c.risk_free_rate),
        periods_per_year: adapter.get_double("tangency", "periods_per_year", c.periods_per_year),
        invest_fraction: adapter.get_double("tangency", "invest_fraction", c.invest_fraction),
    }
}

fn build_momentum_split(adapter: &dyn ConfigPort, s: MomentumSplitStrategy) -> MomentumSplitStrategy {
    MomentumSplitStrategy {
        warmup: adapter.get_int("momentum_split", "warmup", s.warmup as i64).max(0) as usize,
        lookback: adapter.get_int("momentum_split", "lookback", s.lookback as i64).max(1) as usize,
        invest_fraction: adapter.get_double("momentum_split", "invest_fraction", s.invest_fraction),
    }
}

/// One replayed epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRecord {
    pub epoch: u64,
    pub allocation: AllocationVector,
    pub fallback: bool,
}

/// Feed every row of the price table through a fresh engine, in order.
pub fn run_allocation_pipeline(
    config: EngineConfig,
    prices: &dyn PricePort,
) -> Result<Vec<AllocationRecord>, AllocError> {
    let table = prices.fetch_prices()?;
    for asset in &config.assets {
        if table.column(asset).is_none() {
            warn!(asset = %asset, "asset missing from price table, every epoch will be repaired");
        }
    }
    let table = table.select(&config.assets).ok_or_else(|| AllocError::PriceData {
        reason: format!(
            "price table has none of the configured assets ({})",
            config.assets.join(", ")
        ),
    })?;

    let mut engine = DecisionEngine::new(config);
    info!(
        strategy = engine.strategy_name(),
        epochs = table.len(),
        "replaying price table"
    );

    let records: Vec<AllocationRecord> = table
        .rows
        .iter()
        .map(|row| {
            let decision = engine.decide(row.epoch, &row.prices);
            AllocationRecord {
                epoch: row.epoch,
                fallback: decision.is_fallback(),
                allocation: decision.into_allocation(),
            }
        })
        .collect();

    let fallbacks = records.iter().filter(|r| r.fallback).count();
    info!(epochs = records.len(), fallbacks, "replay complete");
    Ok(records)
}

/// CSV with header `epoch,<asset>...,Cash,fallback`.
pub fn write_allocations<W: Write>(
    writer: W,
    assets: &[String],
    records: &[AllocationRecord],
) -> Result<(), AllocError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["epoch".to_string()];
    header.extend(assets.iter().cloned());
    header.push(CASH.to_string());
    header.push("fallback".to_string());
    wtr.write_record(&header).map_err(io::Error::from)?;

    for record in records {
        let mut row = vec![record.epoch.to_string()];
        row.extend(
            record
                .allocation
                .entries()
                .map(|(_, fraction)| format!("{:.6}", fraction)),
        );
        row.push(record.fallback.to_string());
        wtr.write_record(&row).map_err(io::Error::from)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn run_replay(config_path: &PathBuf, prices_path: &PathBuf, output: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let engine_config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return report(&e),
    };
    let assets = engine_config.assets.clone();

    let price_port = CsvPriceAdapter::new(prices_path.clone());
    let records = match run_allocation_pipeline(engine_config, &price_port) {
        Ok(r) => r,
        Err(e) => return report(&e),
    };

    let written = match output {
        Some(path) => File::create(path)
            .map_err(AllocError::from)
            .and_then(|file| write_allocations(file, &assets, &records)),
        None => write_allocations(io::stdout().lock(), &assets, &records),
    };
    if let Err(e) = written {
        return report(&e);
    }

    if let Some(path) = output {
        eprintln!("Allocations written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

pub fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating configuration: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match build_engine_config(&adapter) {
        Ok(config) => {
            eprintln!("\nAssets: {}", config.assets.join(", "));
            eprintln!("Seed price: {}", config.seed_price);
            eprintln!("Fallback invested: {}", config.fallback_invested);
            eprintln!("\nStrategy {}", config.strategy);
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}

fn run_presets() -> ExitCode {
    for (name, description) in PRESETS {
        let marker = if *name == DEFAULT_PRESET { " (default)" } else { "" };
        println!("{:<22} {}{}", name, description, marker);
    }
    ExitCode::SUCCESS
}
