//! Price input port trait.

use crate::domain::error::AllocError;

/// A rectangular table of prices: one row per epoch, one column per asset.
/// Missing observations are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    pub assets: Vec<String>,
    pub rows: Vec<PriceRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub epoch: u64,
    pub prices: Vec<f64>,
}

impl PriceTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column index of `asset`.
    pub fn column(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Reorder columns to `assets`. Assets absent from the table become NaN
    /// columns; `None` if none of them are present.
    pub fn select(&self, assets: &[String]) -> Option<PriceTable> {
        let columns: Vec<Option<usize>> = assets.iter().map(|a| self.column(a)).collect();
        if columns.iter().all(Option::is_none) {
            return None;
        }
        let rows = self
            .rows
            .iter()
            .map(|row| PriceRow {
                epoch: row.epoch,
                prices: columns
                    .iter()
                    .map(|c| c.and_then(|i| row.prices.get(i).copied()).unwrap_or(f64::NAN))
                    .collect(),
            })
            .collect();
        Some(PriceTable {
            assets: assets.to_vec(),
            rows,
        })
    }
}

pub trait PricePort {
    fn fetch_prices(&self) -> Result<PriceTable, AllocError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PriceTable {
        PriceTable {
            assets: vec!["Asset A".into(), "Asset B".into()],
            rows: vec![
                PriceRow {
                    epoch: 0,
                    prices: vec![100.0, 50.0],
                },
                PriceRow {
                    epoch: 1,
                    prices: vec![101.0, f64::NAN],
                },
            ],
        }
    }

    #[test]
    fn select_reorders_columns() {
        let t = table()
            .select(&["Asset B".to_string(), "Asset A".to_string()])
            .unwrap();
        assert_eq!(t.assets, vec!["Asset B", "Asset A"]);
        assert_eq!(t.rows[0].prices, vec![50.0, 100.0]);
        assert!(t.rows[1].prices[0].is_nan());
    }

    #[test]
    fn select_unknown_asset_is_nan_column() {
        let t = table()
            .select(&["Asset A".to_string(), "Asset C".to_string()])
            .unwrap();
        assert_eq!(t.len(), 2);
        assert!(t.rows[0].prices[1].is_nan());
    }

    #[test]
    fn select_nothing_known_is_none() {
        assert!(table().select(&["Asset Z".to_string()]).is_none());
    }
}
