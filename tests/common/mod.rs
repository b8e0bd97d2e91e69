#![allow(dead_code)]

use std::io::Write;
use tactical_alloc::domain::error::AllocError;
use tactical_alloc::ports::price_port::{PricePort, PriceRow, PriceTable};

pub struct MockPricePort {
    pub table: PriceTable,
    pub error: Option<String>,
}

impl MockPricePort {
    pub fn new(assets: &[&str]) -> Self {
        Self {
            table: PriceTable {
                assets: assets.iter().map(|a| a.to_string()).collect(),
                rows: Vec::new(),
            },
            error: None,
        }
    }

    /// One row per element of the columns, epochs numbered from zero.
    pub fn with_columns(mut self, columns: &[Vec<f64>]) -> Self {
        let len = columns.iter().map(Vec::len).max().unwrap_or(0);
        self.table.rows = (0..len)
            .map(|epoch| PriceRow {
                epoch: epoch as u64,
                prices: columns
                    .iter()
                    .map(|c| c.get(epoch).copied().unwrap_or(f64::NAN))
                    .collect(),
            })
            .collect();
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl PricePort for MockPricePort {
    fn fetch_prices(&self) -> Result<PriceTable, AllocError> {
        if let Some(reason) = &self.error {
            return Err(AllocError::PriceData {
                reason: reason.clone(),
            });
        }
        Ok(self.table.clone())
    }
}

pub fn asset_names(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("Asset {}", (b'A' + i as u8) as char))
        .collect()
}

/// Compounding at `rate` per epoch from `start`.
pub fn rising(len: usize, start: f64, rate: f64) -> Vec<f64> {
    (0..len).map(|i| start * (1.0 + rate).powi(i as i32)).collect()
}

/// `flat` epochs at `start`, then `drop` epochs each falling by `rate`.
pub fn flat_then_drop(flat: usize, drop: usize, start: f64, rate: f64) -> Vec<f64> {
    let mut prices = vec![start; flat];
    let mut p = start;
    for _ in 0..drop {
        p *= 1.0 - rate;
        prices.push(p);
    }
    prices
}

/// Deterministic oscillation around `center`.
pub fn choppy(len: usize, center: f64, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|i| center + amplitude * ((i as f64) * 0.7).sin() + 0.3 * amplitude * ((i as f64) * 2.3).cos())
        .collect()
}

/// Prices following a repeating pattern of simple returns.
pub fn from_returns(len: usize, start: f64, pattern: &[f64]) -> Vec<f64> {
    let mut prices = Vec::with_capacity(len);
    let mut p = start;
    for i in 0..len {
        if i > 0 {
            p *= 1.0 + pattern[(i - 1) % pattern.len()];
        }
        prices.push(p);
    }
    prices
}

pub fn write_temp_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    write_temp_file(content, ".ini")
}

/// CSV price table with an `epoch` column followed by one column per asset.
pub fn price_csv(assets: &[&str], columns: &[Vec<f64>]) -> String {
    let mut out = format!("epoch,{}\n", assets.join(","));
    let len = columns.iter().map(Vec::len).max().unwrap_or(0);
    for epoch in 0..len {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| match c.get(epoch) {
                Some(p) if p.is_finite() => p.to_string(),
                _ => String::new(),
            })
            .collect();
        out.push_str(&format!("{},{}\n", epoch, cells.join(",")));
    }
    out
}
