//! Momentum / Rate of Change.
//!
//! ROC(n) = (P[last] - P[last-n]) / P[last-n], as a fraction (not percent).
//! 0 when fewer than n+1 prices exist or when P[last-n] == 0.

pub fn momentum(prices: &[f64], period: usize) -> f64 {
    if prices.len() <= period {
        return 0.0;
    }
    let last = prices[prices.len() - 1];
    let base = prices[prices.len() - 1 - period];
    if base == 0.0 {
        return 0.0;
    }
    (last - base) / base
}

/// Mean of the momenta over several look-backs.
pub fn momentum_blend(prices: &[f64], periods: &[usize]) -> f64 {
    if periods.is_empty() {
        return 0.0;
    }
    periods.iter().map(|&p| momentum(prices, p)).sum::<f64>() / periods.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn momentum_basic_calculation() {
        let prices = [100.0, 105.0, 110.0, 115.0];
        assert_relative_eq!(momentum(&prices, 2), (115.0 - 105.0) / 105.0);
        assert_relative_eq!(momentum(&prices, 3), 0.15);
    }

    #[test]
    fn momentum_insufficient_history() {
        assert_eq!(momentum(&[100.0, 105.0], 2), 0.0);
        assert_eq!(momentum(&[], 0), 0.0);
    }

    #[test]
    fn momentum_zero_division() {
        assert_eq!(momentum(&[0.0, 100.0, 110.0], 2), 0.0);
    }

    #[test]
    fn momentum_negative_change() {
        let v = momentum(&[100.0, 90.0, 80.0], 2);
        assert_relative_eq!(v, -0.2);
    }

    #[test]
    fn momentum_blend_averages() {
        let prices = [100.0, 100.0, 110.0, 121.0];
        let expected = (momentum(&prices, 1) + momentum(&prices, 3)) / 2.0;
        assert_relative_eq!(momentum_blend(&prices, &[1, 3]), expected);
        assert_eq!(momentum_blend(&prices, &[]), 0.0);
    }
}
