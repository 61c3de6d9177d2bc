//! Core data types shared by the feed, the history store and the dashboard
//!
//! Bars carry exchange timestamps in milliseconds; chart series use seconds.
use crate::error::WatchError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{fmt, str::FromStr};

/// Guard for divisions by a price or volume that may be zero
pub const EPSILON: f64 = 1e-9;

/// One OHLCV candle for a fixed time bucket
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Bar {
    /// Bucket start (ms since epoch)
    pub t: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
}

impl Bar {
    /// Bucket start in whole seconds, as used by chart series
    pub fn time_secs(&self) -> i64 {
        self.t.div_euclid(1000)
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.h + self.l + self.c) / 3.0
    }

    /// Close at or above open
    pub fn is_up(&self) -> bool {
        self.c >= self.o
    }

    /// High-low range relative to the close
    pub fn range_ratio(&self) -> f64 {
        (self.h - self.l) / self.c.max(EPSILON)
    }
}

/// Bar bucket duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeframe {
    #[default]
    M1,
    M3,
    M5,
    M15,
    H1,
}

impl Timeframe {
    /// Every selectable timeframe, in display order
    pub const ALL: [Timeframe; 5] = [
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
    ];

    /// Binance interval string
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s.trim())
            .ok_or_else(|| WatchError::UnknownTimeframe(s.to_string()))
    }
}

/// Normalised trading symbol, eg/ "BTCUSDT"
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Symbol(SmolStr);

impl Symbol {
    pub const MIN_LEN: usize = 5;
    pub const MAX_LEN: usize = 15;

    /// Trim and uppercase `raw`, then require 5-15 ASCII uppercase letters or digits.
    pub fn parse(raw: &str) -> Result<Self, WatchError> {
        let normalised = raw.trim().to_uppercase();
        let valid = (Self::MIN_LEN..=Self::MAX_LEN).contains(&normalised.len())
            && normalised
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());

        if valid {
            Ok(Self(SmolStr::new(normalised)))
        } else {
            Err(WatchError::InvalidSymbol(raw.to_string()))
        }
    }

    /// Symbol as reported by the exchange, uppercased but otherwise trusted.
    pub fn from_exchange(raw: &str) -> Self {
        Self(SmolStr::new(raw.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Lowercase form used in stream channel names
    pub fn stream_name(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Feed connection status updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
}

impl ConnectionStatus {
    /// Status line shown in the header
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "WS: connected",
            ConnectionStatus::Disconnected => "WS: disconnected",
            ConnectionStatus::Reconnecting => "WS: reconnecting",
        }
    }
}

/// Everything the dashboard controller consumes, funnelled through one channel
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Push feed connection state changed
    Status(ConnectionStatus),
    /// Live kline update for one symbol
    Kline {
        symbol: Symbol,
        timeframe: Timeframe,
        bar: Bar,
    },
    /// Historical bars fetched from the pull source
    Bootstrap {
        symbol: Symbol,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    },
    /// Pull request failed; the slot keeps whatever it had
    BootstrapFailed {
        symbol: Symbol,
        timeframe: Timeframe,
        error: String,
    },
    /// Symbols mentioned in Telegram messages
    TelegramSymbols(Vec<String>),
}

impl FeedEvent {
    /// Symbol this event is keyed by, if any
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            FeedEvent::Kline { symbol, .. }
            | FeedEvent::Bootstrap { symbol, .. }
            | FeedEvent::BootstrapFailed { symbol, .. } => Some(symbol),
            FeedEvent::Status(_) | FeedEvent::TelegramSymbols(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_parse() {
        struct TestCase {
            input: &'static str,
            expected: Option<&'static str>,
        }

        let tests = vec![
            TestCase {
                // TC0: already normalised
                input: "BTCUSDT",
                expected: Some("BTCUSDT"),
            },
            TestCase {
                // TC1: lowercase with whitespace is normalised
                input: "  solusdt ",
                expected: Some("SOLUSDT"),
            },
            TestCase {
                // TC2: too short even after normalisation
                input: "abc",
                expected: None,
            },
            TestCase {
                // TC3: separators are not allowed
                input: "BTC/USDT",
                expected: None,
            },
            TestCase {
                // TC4: 16 characters is too long
                input: "ABCDEFGHIJKLMNOP",
                expected: None,
            },
            TestCase {
                // TC5: digits are fine
                input: "1000PEPEUSDT",
                expected: Some("1000PEPEUSDT"),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = Symbol::parse(test.input).ok();
            assert_eq!(
                actual.as_ref().map(Symbol::as_str),
                test.expected,
                "TC{} failed",
                index
            );
        }
    }

    #[test]
    fn test_timeframe_round_trip_and_unknown() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
        assert!(matches!(
            "2m".parse::<Timeframe>(),
            Err(WatchError::UnknownTimeframe(_))
        ));
        assert_eq!(Timeframe::default(), Timeframe::M1);
    }

    #[test]
    fn test_bar_helpers() {
        let bar = Bar { t: 1_700_000_059_999, o: 10.0, h: 12.0, l: 9.0, c: 11.0, v: 5.0 };
        assert_eq!(bar.time_secs(), 1_700_000_059);
        assert!((bar.typical_price() - 32.0 / 3.0).abs() < 1e-12);
        assert!(bar.is_up());
        assert!((bar.range_ratio() - 3.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_connection_status_labels() {
        assert_eq!(ConnectionStatus::Connected.label(), "WS: connected");
        assert_eq!(ConnectionStatus::Disconnected.label(), "WS: disconnected");
    }
}
