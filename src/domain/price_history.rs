//! Append-only price history, one series per tracked asset.
//!
//! Every stored value is finite: a missing or non-finite input is replaced by
//! the asset's previous price, or by the seed price when the asset has no
//! history yet.

use tracing::warn;

/// Substitute used when the very first observation of an asset is invalid.
pub const DEFAULT_SEED_PRICE: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct PriceHistory {
    assets: Vec<String>,
    series: Vec<Vec<f64>>,
    seed_price: f64,
    last_epoch: Option<u64>,
}

impl PriceHistory {
    pub fn new(assets: Vec<String>) -> Self {
        Self::with_seed_price(assets, DEFAULT_SEED_PRICE)
    }

    pub fn with_seed_price(assets: Vec<String>, seed_price: f64) -> Self {
        let series = vec![Vec::new(); assets.len()];
        Self {
            assets,
            series,
            seed_price,
            last_epoch: None,
        }
    }

    /// Append one observation per asset. Returns the indices of the assets
    /// whose input had to be repaired.
    pub fn record(&mut self, epoch: u64, prices: &[f64]) -> Vec<usize> {
        if let Some(last) = self.last_epoch {
            if epoch <= last {
                warn!(epoch, last_epoch = last, "non-increasing epoch recorded");
            }
        }

        let mut repaired = Vec::new();
        for (i, series) in self.series.iter_mut().enumerate() {
            let price = match prices.get(i) {
                Some(&p) if p.is_finite() => p,
                _ => {
                    let substitute = series.last().copied().unwrap_or(self.seed_price);
                    warn!(
                        epoch,
                        asset = %self.assets[i],
                        substitute,
                        "missing or invalid price repaired"
                    );
                    repaired.push(i);
                    substitute
                }
            };
            series.push(price);
        }

        self.last_epoch = Some(epoch);
        repaired
    }

    /// The most recent `length` prices of `asset`, oldest first. Shorter when
    /// history is shorter; empty for an unknown asset.
    pub fn window(&self, asset: usize, length: usize) -> &[f64] {
        match self.series.get(asset) {
            Some(s) => &s[s.len().saturating_sub(length)..],
            None => &[],
        }
    }

    pub fn series(&self, asset: usize) -> &[f64] {
        self.series.get(asset).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn last(&self, asset: usize) -> Option<f64> {
        self.series.get(asset).and_then(|s| s.last().copied())
    }

    /// Number of recorded epochs.
    pub fn len(&self) -> usize {
        self.series.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn last_epoch(&self) -> Option<u64> {
        self.last_epoch
    }

    /// Drop all recorded prices, keeping the asset list.
    pub fn reset(&mut self) {
        for s in &mut self.series {
            s.clear();
        }
        self.last_epoch = None;
    }
}
