//! CSV price table adapter.
//!
//! Layout: a header row `epoch,<asset>,<asset>...` followed by one row per
//! epoch. Empty or non-numeric price cells are read as NaN; the price
//! history repairs them at record time.

use crate::domain::error::AllocError;
use crate::ports::price_port::{PricePort, PriceRow, PriceTable};
use std::fs;
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn parse(content: &str) -> Result<PriceTable, AllocError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = rdr.headers().map_err(|e| AllocError::PriceData {
            reason: format!("CSV header error: {}", e),
        })?;
        if headers.get(0) != Some("epoch") {
            return Err(AllocError::PriceData {
                reason: "first column must be 'epoch'".into(),
            });
        }
        let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        if assets.is_empty() {
            return Err(AllocError::PriceData {
                reason: "no asset columns".into(),
            });
        }

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| AllocError::PriceData {
                reason: format!("CSV parse error: {}", e),
            })?;

            let epoch_str = record.get(0).unwrap_or_default();
            let epoch: u64 = epoch_str.parse().map_err(|_| AllocError::PriceData {
                reason: format!("row {}: invalid epoch '{}'", line + 1, epoch_str),
            })?;

            let prices = (0..assets.len())
                .map(|i| {
                    record
                        .get(i + 1)
                        .and_then(|cell| cell.parse::<f64>().ok())
                        .unwrap_or(f64::NAN)
                })
                .collect();

            rows.push(PriceRow { epoch, prices });
        }

        Ok(PriceTable { assets, rows })
    }
}

impl PricePort for CsvPriceAdapter {
    fn fetch_prices(&self) -> Result<PriceTable, AllocError> {
        let content = fs::read_to_string(&self.path).map_err(|e| AllocError::PriceData {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        Self::parse(&content)
    }
}
