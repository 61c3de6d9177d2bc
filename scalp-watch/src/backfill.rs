//! REST kline bootstrap
//!
//! Fetches the most recent closed and in-progress bars for one symbol so the
//! history has something to draw before the live feed catches up.

use crate::{
    error::{Result, WatchError},
    types::{Bar, FeedEvent, Symbol, Timeframe},
};
use serde_json::Value;
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Pull source for historical klines
#[derive(Debug, Clone)]
pub struct KlineSource {
    client: reqwest::Client,
    base_url: String,
}

impl KlineSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// eg/ `https://api.binance.com/api/v3/klines?symbol=BTCUSDT&interval=1m&limit=500`
    pub fn klines_url(&self, symbol: &Symbol, timeframe: Timeframe, limit: usize) -> Result<Url> {
        let endpoint = format!("{}/api/v3/klines", self.base_url.trim_end_matches('/'));
        let url = Url::parse_with_params(
            &endpoint,
            &[
                ("symbol", symbol.as_str()),
                ("interval", timeframe.as_str()),
                ("limit", &limit.to_string()),
            ],
        )?;
        Ok(url)
    }

    /// Fetch up to `limit` bars, oldest first
    pub async fn fetch_klines(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>> {
        let url = self.klines_url(symbol, timeframe, limit)?;
        let response = self
            .client
            .get(url.clone())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WatchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let rows: Vec<Vec<Value>> = response.json().await?;
        Ok(parse_kline_rows(&rows))
    }

    /// Fetch in the background and report the outcome as a [`FeedEvent`]
    pub fn spawn_bootstrap(
        &self,
        symbol: Symbol,
        timeframe: Timeframe,
        limit: usize,
        event_tx: mpsc::Sender<FeedEvent>,
    ) -> JoinHandle<()> {
        let source = self.clone();

        tokio::spawn(async move {
            let event = match source.fetch_klines(&symbol, timeframe, limit).await {
                Ok(bars) => {
                    debug!(%symbol, %timeframe, bars = bars.len(), "bootstrap fetched");
                    FeedEvent::Bootstrap {
                        symbol,
                        timeframe,
                        bars,
                    }
                }
                Err(error) => {
                    warn!(%symbol, %timeframe, %error, "bootstrap failed");
                    FeedEvent::BootstrapFailed {
                        symbol,
                        timeframe,
                        error: error.to_string(),
                    }
                }
            };

            if event_tx.send(event).await.is_err() {
                debug!("event receiver dropped, discarding bootstrap");
            }
        })
    }
}

/// Map `[openTime, open, high, low, close, volume, ...]` rows to bars.
///
/// Rows with fewer than six fields or values that do not coerce are skipped.
pub fn parse_kline_rows(rows: &[Vec<Value>]) -> Vec<Bar> {
    rows.iter()
        .filter_map(|row| {
            let [t, o, h, l, c, v, ..] = row.as_slice() else {
                return None;
            };
            Some(Bar {
                t: coerce_i64(t)?,
                o: coerce_f64(o)?,
                h: coerce_f64(h)?,
                l: coerce_f64(l)?,
                c: coerce_f64(c)?,
                v: coerce_f64(v)?,
            })
        })
        .collect()
}

/// Number from either a JSON number or a decimal string
pub(crate) fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

pub(crate) fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_klines_url() {
        let source = KlineSource::new("https://api.binance.com/");
        let symbol = Symbol::parse("solusdt").unwrap();
        let url = source.klines_url(&symbol, Timeframe::M15, 500).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.binance.com/api/v3/klines?symbol=SOLUSDT&interval=15m&limit=500"
        );
    }

    #[test]
    fn test_parse_kline_rows() {
        struct TestCase {
            row: Value,
            expected: Option<Bar>,
        }

        let tests = vec![
            TestCase {
                // TC0: exchange format, strings for prices
                row: json!([
                    1_700_000_000_000i64,
                    "10.0",
                    "11.0",
                    "9.0",
                    "10.5",
                    "100.25",
                    1_700_000_059_999i64,
                    "1050.0",
                    42,
                    "50.0",
                    "525.0",
                    "0"
                ]),
                expected: Some(Bar { t: 1_700_000_000_000, o: 10.0, h: 11.0, l: 9.0, c: 10.5, v: 100.25 }),
            },
            TestCase {
                // TC1: plain numbers are coerced too
                row: json!([60_000, 1, 2, 0.5, 1.5, 3]),
                expected: Some(Bar { t: 60_000, o: 1.0, h: 2.0, l: 0.5, c: 1.5, v: 3.0 }),
            },
            TestCase {
                // TC2: unparsable price
                row: json!([0, "abc", "1", "1", "1", "1"]),
                expected: None,
            },
            TestCase {
                // TC3: too few fields
                row: json!([0, "1", "1", "1", "1"]),
                expected: None,
            },
            TestCase {
                // TC4: null volume
                row: json!([0, "1", "1", "1", "1", null]),
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let row: Vec<Value> = serde_json::from_value(test.row).unwrap();
            let actual = parse_kline_rows(&[row]).into_iter().next();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_bad_rows_are_skipped_not_fatal() {
        let rows: Vec<Vec<Value>> = serde_json::from_value(json!([
            [0, "1", "2", "0.5", "1.5", "10"],
            [60_000, "NaN", "2", "0.5", "1.5", "10"],
            [120_000, "1.5", "2.5", "1", "2", "12"]
        ]))
        .unwrap();

        let bars = parse_kline_rows(&rows);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].t, 120_000);
    }
}
