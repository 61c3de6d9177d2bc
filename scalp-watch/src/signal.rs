//! Short-horizon trend heuristic and watchlist volatility pulse
//!
//! Both are illustrative: the thresholds are fixed and nothing here has any
//! predictive validation.

use crate::{
    indicators::{closes, ema_last},
    types::{Bar, Symbol},
};
use derive_more::Display;
use std::fmt;

/// Minimum history length before the heuristic is evaluated
pub const MIN_SIGNAL_BARS: usize = 25;

const SLOPE_THRESHOLD: f64 = 0.0008;
const RANGE_THRESHOLD: f64 = 0.0012;
const MAX_CONFIDENCE: f64 = 0.99;

const HIGH_VOL_THRESHOLD: f64 = 0.004;
const LOW_VOL_THRESHOLD: f64 = 0.0015;

/// Directional call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SignalSide {
    #[display("LONG")]
    Long,
    #[display("SHORT")]
    Short,
    #[display("FLAT")]
    Flat,
}

/// Heuristic output for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: Symbol,
    pub side: SignalSide,
    pub confidence: f64,
    /// ema9 / ema21 - 1
    pub slope: f64,
    /// (high - low) / close of the last bar
    pub range_ratio: f64,
}

impl Signal {
    /// Evaluate the heuristic over `bars`; `None` with fewer than 25 bars.
    pub fn evaluate(symbol: &Symbol, bars: &[Bar]) -> Option<Signal> {
        if bars.len() < MIN_SIGNAL_BARS {
            return None;
        }

        let closes = closes(bars);
        let ema9 = ema_last(&closes, 9)?;
        let ema21 = ema_last(&closes, 21)?;
        let slope = ema9 / ema21 - 1.0;
        let range_ratio = bars.last()?.range_ratio();

        let (side, confidence) = if slope > SLOPE_THRESHOLD && range_ratio > RANGE_THRESHOLD {
            (SignalSide::Long, confidence(slope, range_ratio))
        } else if slope < -SLOPE_THRESHOLD && range_ratio > RANGE_THRESHOLD {
            (SignalSide::Short, confidence(-slope, range_ratio))
        } else {
            (SignalSide::Flat, 0.5)
        };

        Some(Signal {
            symbol: symbol.clone(),
            side,
            confidence,
            slope,
            range_ratio,
        })
    }

    /// Confidence as a whole percentage
    pub fn confidence_pct(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }
}

fn confidence(slope: f64, range_ratio: f64) -> f64 {
    (0.5 + slope * 120.0 + range_ratio * 30.0).min(MAX_CONFIDENCE)
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AI SIGNAL: {} → {} ({}%)",
            self.symbol,
            self.side,
            self.confidence_pct()
        )
    }
}

/// Watchlist-wide volatility label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum MarketPulse {
    #[display("HIGH VOL")]
    HighVol,
    #[display("LOW VOL")]
    LowVol,
    #[default]
    #[display("MIXED")]
    Mixed,
}

impl MarketPulse {
    /// Classify the mean last-bar range ratio over `last_bars`.
    ///
    /// Symbols without data count as zero.
    pub fn from_last_bars<'a>(last_bars: impl IntoIterator<Item = Option<&'a Bar>>) -> Self {
        let (sum, count) = last_bars
            .into_iter()
            .map(|bar| bar.map(Bar::range_ratio).unwrap_or(0.0))
            .fold((0.0, 0usize), |(sum, count), ratio| (sum + ratio, count + 1));

        let mean = sum / count.max(1) as f64;

        if mean > HIGH_VOL_THRESHOLD {
            MarketPulse::HighVol
        } else if mean < LOW_VOL_THRESHOLD {
            MarketPulse::LowVol
        } else {
            MarketPulse::Mixed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc() -> Symbol {
        Symbol::parse("BTCUSDT").unwrap()
    }

    fn trending(n: usize, start: f64, step: f64, h: f64, l: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar {
                t: i as i64 * 60_000,
                o: start,
                h,
                l,
                c: start + step * i as f64,
                v: 100.0,
            })
            .collect()
    }

    #[test]
    fn test_requires_minimum_history() {
        let bars = trending(MIN_SIGNAL_BARS - 1, 10.0, 0.1, 11.0, 9.0);
        assert!(Signal::evaluate(&btc(), &bars).is_none());
    }

    #[test]
    fn test_rising_closes_resolve_long_capped() {
        let bars = trending(30, 10.0, 0.1, 11.0, 9.0);
        let signal = Signal::evaluate(&btc(), &bars).unwrap();

        assert!(signal.slope > SLOPE_THRESHOLD);
        assert_eq!(signal.side, SignalSide::Long);
        assert_eq!(signal.confidence, MAX_CONFIDENCE);
        assert_eq!(signal.to_string(), "AI SIGNAL: BTCUSDT → LONG (99%)");
    }

    #[test]
    fn test_falling_closes_resolve_short() {
        let bars = trending(30, 20.0, -0.1, 21.0, 16.0);
        let signal = Signal::evaluate(&btc(), &bars).unwrap();
        assert_eq!(signal.side, SignalSide::Short);
        assert!(signal.confidence > 0.5 && signal.confidence <= MAX_CONFIDENCE);
    }

    #[test]
    fn test_flat_when_range_too_narrow() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar { t: i, o: c, h: c, l: c, c, v: 1.0 }
            })
            .collect();
        let signal = Signal::evaluate(&btc(), &bars).unwrap();
        assert_eq!(signal.side, SignalSide::Flat);
        assert_eq!(signal.confidence, 0.5);
        assert_eq!(signal.to_string(), "AI SIGNAL: BTCUSDT → FLAT (50%)");
    }

    #[test]
    fn test_market_pulse_thresholds() {
        struct TestCase {
            ranges: Vec<Option<(f64, f64, f64)>>,
            expected: MarketPulse,
        }

        let tests = vec![
            TestCase {
                // TC0: wide ranges
                ranges: vec![Some((101.0, 99.0, 100.0)), Some((101.0, 99.0, 100.0))],
                expected: MarketPulse::HighVol,
            },
            TestCase {
                // TC1: tight ranges
                ranges: vec![Some((100.05, 100.0, 100.0))],
                expected: MarketPulse::LowVol,
            },
            TestCase {
                // TC2: in between
                ranges: vec![Some((100.25, 100.0, 100.0))],
                expected: MarketPulse::Mixed,
            },
            TestCase {
                // TC3: missing data counts as zero
                ranges: vec![Some((100.5, 100.0, 100.0)), None, None, None],
                expected: MarketPulse::LowVol,
            },
            TestCase {
                // TC4: empty watchlist
                ranges: vec![],
                expected: MarketPulse::LowVol,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let bars: Vec<Option<Bar>> = test
                .ranges
                .iter()
                .map(|r| r.map(|(h, l, c)| Bar { t: 0, o: c, h, l, c, v: 1.0 }))
                .collect();
            let actual = MarketPulse::from_last_bars(bars.iter().map(Option::as_ref));
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_market_pulse_labels() {
        assert_eq!(MarketPulse::HighVol.to_string(), "HIGH VOL");
        assert_eq!(MarketPulse::default().to_string(), "MIXED");
    }
}
