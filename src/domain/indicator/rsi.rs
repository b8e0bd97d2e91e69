//! RSI (Relative Strength Index) over a trailing window.
//!
//! Uses simple means of the gains and losses over the last `period` price
//! changes (no Wilder smoothing):
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! Neutral 50 when fewer than `period + 1` prices exist or `period` is 0.
//! If avg_loss == 0: RSI = 100 (this includes a perfectly flat window).

pub const RSI_NEUTRAL: f64 = 50.0;

pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() <= period {
        return RSI_NEUTRAL;
    }

    let window = &prices[prices.len() - period - 1..];
    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
}
