//! Parser for the indicator, band and step strings used in config files.
//!
//! ```text
//! indicator := NAME [ '(' integer { ',' integer } ')' ]      RSI(14), REGIME
//! bands     := band { ',' band }                             <25:2.5, >75:-2.5
//! band      := ('<' | '>') number ':' number
//! steps     := step { ',' step }                             >2.5:0.99, 1.5:0.96
//! step      := [ '>' ] number ':' number
//! ```
//!
//! `EMA_TREND` and `EMA_POSITION` take `(fast, slow)` or
//! `(fast, slow, fast_window, slow_window)`. A step prefixed with `>` needs
//! the score strictly above its threshold. Periods are capped at
//! [`MAX_PERIOD`]. Errors carry the byte offset of the offending token.

use std::str::FromStr;

use crate::domain::allocation::Step;
use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator::ema::EmaPair;
use crate::domain::indicator::regime::RegimeThresholds;
use crate::domain::signal::{Band, BandTable};

/// Largest period or window accepted in an indicator expression.
pub const MAX_PERIOD: usize = 100_000;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>, position: usize) -> ParseError {
        ParseError {
            message: message.into(),
            position,
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(
                format!("expected '{}', found '{}'", expected, ch),
                self.pos,
            )),
            None => Err(self.error(
                format!("expected '{}', found end of input", expected),
                self.pos,
            )),
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if matches!(self.peek(), Some('-') | Some('+')) {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(self.error("expected number", start));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map_err(|_| self.error(format!("invalid number: {}", num_str), start))
    }

    fn parse_period(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected integer", start));
        }

        let num_str = &self.input[start..self.pos];
        let period = num_str
            .parse::<usize>()
            .map_err(|_| self.error(format!("invalid integer: {}", num_str), start))?;
        if period == 0 {
            return Err(self.error("period must be positive", start));
        }
        if period > MAX_PERIOD {
            return Err(self.error(
                format!("period {} exceeds maximum of {}", period, MAX_PERIOD),
                start,
            ));
        }
        Ok(period)
    }

    /// `count` comma-separated periods inside parentheses.
    fn parse_periods(&mut self, count: usize) -> Result<Vec<usize>, ParseError> {
        self.parse_period_args(&[count])
    }

    /// Comma-separated periods inside parentheses; the count must be one of
    /// `counts` (ascending).
    fn parse_period_args(&mut self, counts: &[usize]) -> Result<Vec<usize>, ParseError> {
        let max = counts.last().copied().unwrap_or(0);
        self.expect_char('(')?;
        let mut periods = Vec::with_capacity(max);
        loop {
            if !periods.is_empty() {
                if periods.len() == max || !counts.contains(&periods.len()) {
                    self.expect_char(',')?;
                } else {
                    self.skip_whitespace();
                    if self.peek() != Some(',') {
                        break;
                    }
                    self.advance();
                }
            }
            periods.push(self.parse_period()?);
            if periods.len() == max {
                break;
            }
        }
        self.expect_char(')')?;
        Ok(periods)
    }

    fn parse_ema_pair(&mut self) -> Result<EmaPair, ParseError> {
        let args_at = self.pos;
        let p = self.parse_period_args(&[2, 4])?;
        if p[0] >= p[1] {
            return Err(self.error("fast period must be shorter than slow", args_at));
        }
        let pair = EmaPair::new(p[0], p[1]);
        if p.len() == 2 {
            return Ok(pair);
        }
        if p[2] < p[0] || p[3] < p[1] {
            return Err(self.error("EMA window must cover its period", args_at));
        }
        Ok(pair.with_windows(p[2], p[3]))
    }

    fn parse_indicator(&mut self) -> Result<IndicatorType, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let name = self.peek_word();
        if !name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            return Err(self.error(format!("expected indicator, found '{}'", name), start));
        }
        self.pos += name.len();

        let indicator = match name.as_str() {
            "RSI" => IndicatorType::Rsi(self.parse_periods(1)?[0]),
            "ZSCORE" => IndicatorType::ZScore(self.parse_periods(1)?[0]),
            "MOMENTUM" => IndicatorType::Momentum(self.parse_periods(1)?[0]),
            "MOMENTUM_BLEND" => {
                let p = self.parse_periods(3)?;
                IndicatorType::MomentumBlend(p[0], p[1], p[2])
            }
            "STOCHASTIC" => IndicatorType::Stochastic(self.parse_periods(1)?[0]),
            "WILLIAMS" => IndicatorType::WilliamsR(self.parse_periods(1)?[0]),
            "ATR" => IndicatorType::Atr(self.parse_periods(1)?[0]),
            "SPREAD" => IndicatorType::Spread(self.parse_periods(1)?[0]),
            "TREND" => IndicatorType::Trend(self.parse_periods(1)?[0]),
            "VOLATILITY" => IndicatorType::Volatility(self.parse_periods(1)?[0]),
            "PRICE_VS_SMA" => IndicatorType::PriceVsSma(self.parse_periods(1)?[0]),
            "PRICE_VS_EMA" => IndicatorType::PriceVsEma(self.parse_periods(1)?[0]),
            "SMA_TREND" | "MACD" => {
                let args_at = self.pos;
                let p = self.parse_periods(2)?;
                let (fast, slow) = (p[0], p[1]);
                if fast >= slow {
                    return Err(self.error("fast period must be shorter than slow", args_at));
                }
                if name == "SMA_TREND" {
                    IndicatorType::SmaTrend { fast, slow }
                } else {
                    IndicatorType::Macd { fast, slow }
                }
            }
            "EMA_TREND" => IndicatorType::EmaTrend(self.parse_ema_pair()?),
            "EMA_POSITION" => IndicatorType::EmaPosition(self.parse_ema_pair()?),
            "REGIME" => IndicatorType::Regime(RegimeThresholds::default()),
            _ => {
                return Err(self.error(format!("unknown indicator '{}'", name), start));
            }
        };
        Ok(indicator)
    }

    fn parse_band(&mut self) -> Result<Band, ParseError> {
        self.skip_whitespace();
        let band_at = self.pos;
        let below = match self.advance() {
            Some('<') => true,
            Some('>') => false,
            Some(ch) => {
                return Err(self.error(format!("expected '<' or '>', found '{}'", ch), band_at));
            }
            None => return Err(self.error("expected band, found end of input", band_at)),
        };
        let threshold = self.parse_number()?;
        self.expect_char(':')?;
        let signal = self.parse_number()?;
        Ok(if below {
            Band::below(threshold, signal)
        } else {
            Band::above(threshold, signal)
        })
    }

    fn parse_step(&mut self) -> Result<Step, ParseError> {
        self.skip_whitespace();
        let strict = self.peek() == Some('>');
        if strict {
            self.advance();
        }
        let min_score = self.parse_number()?;
        self.expect_char(':')?;
        self.skip_whitespace();
        let alloc_at = self.pos;
        let allocation = self.parse_number()?;
        if !(0.0..=1.0).contains(&allocation) {
            return Err(self.error(
                format!("allocation {} outside [0, 1]", allocation),
                alloc_at,
            ));
        }
        Ok(if strict {
            Step::above(min_score, allocation)
        } else {
            Step::at_least(min_score, allocation)
        })
    }

    /// One or more comma-separated items.
    fn parse_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = vec![item(&mut *self)?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some(',') {
                self.advance();
                items.push(item(&mut *self)?);
            } else {
                break;
            }
        }
        Ok(items)
    }

    fn finish(&mut self, what: &str) -> Result<(), ParseError> {
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(
                format!("unexpected input after {}: '{}'", what, self.remaining()),
                self.pos,
            ));
        }
        Ok(())
    }
}

pub fn parse_indicator(input: &str) -> Result<IndicatorType, ParseError> {
    let mut parser = Parser::new(input);
    let indicator = parser.parse_indicator()?;
    parser.finish("indicator")?;
    Ok(indicator)
}

pub fn parse_bands(input: &str) -> Result<BandTable, ParseError> {
    let mut parser = Parser::new(input);
    let bands = parser.parse_list(Parser::parse_band)?;
    parser.finish("bands")?;
    Ok(BandTable::new(bands))
}

pub fn parse_steps(input: &str) -> Result<Vec<Step>, ParseError> {
    let mut parser = Parser::new(input);
    let steps = parser.parse_list(Parser::parse_step)?;
    parser.finish("steps")?;
    Ok(steps)
}

impl FromStr for IndicatorType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_indicator(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::BandSide;

    #[test]
    fn parse_single_period_indicators() {
        assert_eq!(parse_indicator("RSI(14)").unwrap(), IndicatorType::Rsi(14));
        assert_eq!(
            parse_indicator("ZSCORE(22)").unwrap(),
            IndicatorType::ZScore(22)
        );
        assert_eq!(
            parse_indicator("WILLIAMS(14)").unwrap(),
            IndicatorType::WilliamsR(14)
        );
        assert_eq!(
            parse_indicator("PRICE_VS_EMA(20)").unwrap(),
            IndicatorType::PriceVsEma(20)
        );
    }

    #[test]
    fn parse_multi_period_indicators() {
        assert_eq!(
            parse_indicator("MOMENTUM_BLEND(5, 10, 20)").unwrap(),
            IndicatorType::MomentumBlend(5, 10, 20)
        );
        assert_eq!(
            parse_indicator("EMA_TREND(20,50)").unwrap(),
            IndicatorType::EmaTrend(EmaPair::new(20, 50))
        );
        assert_eq!(
            parse_indicator("EMA_POSITION(20, 50, 30, 60)").unwrap(),
            IndicatorType::EmaPosition(EmaPair::new(20, 50).with_windows(30, 60))
        );
        assert_eq!(
            parse_indicator(" MACD( 12 , 26 ) ").unwrap(),
            IndicatorType::Macd { fast: 12, slow: 26 }
        );
    }

    #[test]
    fn parse_regime_has_no_arguments() {
        assert!(parse_indicator("REGIME").unwrap().is_regime());
        let err = parse_indicator("REGIME(5)").unwrap_err();
        assert!(err.message.contains("unexpected input"));
    }

    #[test]
    fn display_output_parses_back() {
        for text in [
            "RSI(14)",
            "MOMENTUM_BLEND(8,18,30)",
            "SMA_TREND(5,20)",
            "EMA_TREND(20,50)",
            "EMA_POSITION(20,50,30,60)",
            "REGIME",
        ] {
            let ind: IndicatorType = text.parse().unwrap();
            assert_eq!(ind.to_string(), text);
        }
    }

    #[test]
    fn error_unknown_indicator() {
        let err = parse_indicator("KAMA(10)").unwrap_err();
        assert!(err.message.contains("unknown indicator 'KAMA'"));
        assert_eq!(err.position, 0);
    }

    #[test]
    fn error_lowercase_indicator() {
        let err = parse_indicator("rsi(14)").unwrap_err();
        assert!(err.message.contains("expected indicator"));
    }

    #[test]
    fn error_missing_paren() {
        let err = parse_indicator("RSI(14").unwrap_err();
        assert!(err.message.contains("expected ')'"));
        assert_eq!(err.position, 6);
    }

    #[test]
    fn error_zero_period() {
        let err = parse_indicator("RSI(0)").unwrap_err();
        assert!(err.message.contains("period must be positive"));
        assert_eq!(err.position, 4);
    }

    #[test]
    fn error_period_above_maximum() {
        let err = parse_indicator("RSI(18446744073709551615)").unwrap_err();
        assert_eq!(err.position, 4);
        assert!(parse_indicator("RSI(100000)").is_ok());
        let err = parse_indicator("RSI(100001)").unwrap_err();
        assert!(err.message.contains("exceeds maximum"));
        let err = parse_indicator("EMA_POSITION(20,50,30,999999999)").unwrap_err();
        assert!(err.message.contains("exceeds maximum"));
    }

    #[test]
    fn error_ema_window_shorter_than_period() {
        let err = parse_indicator("EMA_TREND(20,50,30,40)").unwrap_err();
        assert!(err.message.contains("window"));
    }

    #[test]
    fn error_ema_with_three_arguments() {
        let err = parse_indicator("EMA_TREND(20,50,30)").unwrap_err();
        assert!(err.message.contains("expected ','"));
    }

    #[test]
    fn error_inverted_trend_periods() {
        let err = parse_indicator("EMA_TREND(50,20)").unwrap_err();
        assert!(err.message.contains("fast period"));
    }

    #[test]
    fn error_missing_comma() {
        let err = parse_indicator("SMA_TREND(5 20)").unwrap_err();
        assert!(err.message.contains("expected ','"));
    }

    #[test]
    fn parse_band_list() {
        let table = parse_bands(">58:-0.5, <25:2.5, <-0.03:-1.5").unwrap();
        let bands = table.bands();
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0], Band::below(-0.03, -1.5));
        assert_eq!(bands[1].side, BandSide::Below);
        assert_eq!(bands[2], Band::above(58.0, -0.5));
    }

    #[test]
    fn error_band_without_direction() {
        let err = parse_bands("<25:2.5, 75:-2.5").unwrap_err();
        assert!(err.message.contains("expected '<' or '>'"));
        assert_eq!(err.position, 9);
    }

    #[test]
    fn error_band_missing_signal() {
        let err = parse_bands("<25:").unwrap_err();
        assert!(err.message.contains("expected number"));
    }

    #[test]
    fn error_empty_band_list() {
        let err = parse_bands("   ").unwrap_err();
        assert!(err.message.contains("end of input"));
    }

    #[test]
    fn parse_step_list() {
        let steps = parse_steps("2.5:0.99, 1.5:0.96, -0.8:0.82").unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].min_score, -0.8);
        assert_eq!(steps[2].allocation, 0.82);
        assert!(steps.iter().all(|s| !s.strict));
    }

    #[test]
    fn parse_strict_steps() {
        let steps = parse_steps(">2.5:0.99, 1.5:0.96, > -0.8:0.82").unwrap();
        assert_eq!(steps[0], Step::above(2.5, 0.99));
        assert_eq!(steps[1], Step::at_least(1.5, 0.96));
        assert_eq!(steps[2], Step::above(-0.8, 0.82));
    }

    #[test]
    fn error_step_allocation_out_of_range() {
        let err = parse_steps("1:0.9, 2:1.5").unwrap_err();
        assert!(err.message.contains("outside [0, 1]"));
        assert_eq!(err.position, 9);
    }

    #[test]
    fn error_trailing_input() {
        let err = parse_steps("1:0.9 garbage").unwrap_err();
        assert!(err.message.contains("unexpected input after steps"));
    }

    #[test]
    fn error_display_with_context() {
        let input = "<25:2.5, ?";
        let err = parse_bands(input).unwrap_err();
        let ctx = err.display_with_context(input);
        assert!(ctx.contains('^'));
        assert!(ctx.contains("position 9"));
    }
}
