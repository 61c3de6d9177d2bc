//! Live kline feed over the exchange WebSocket
//!
//! Provides automatic reconnection, keepalive pings and kline parsing. One
//! feed task serves the whole watchlist for a single timeframe; changing either
//! means dropping the [`FeedHandle`] and starting a new feed.

use crate::{
    backfill::{coerce_f64, coerce_i64},
    config::WatchConfig,
    error::Result,
    types::{Bar, ConnectionStatus, FeedEvent, Symbol, Timeframe},
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Subscription for one watchlist and timeframe
#[derive(Debug, Clone)]
pub struct KlineFeed {
    url: String,
    symbols: Vec<Symbol>,
    timeframe: Timeframe,
    ping_interval: Duration,
    reconnect_delay: Duration,
}

/// Owns a background producer task; dropping it aborts the task
#[derive(Debug)]
pub struct FeedHandle {
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub(crate) fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl KlineFeed {
    pub fn new(config: &WatchConfig, symbols: Vec<Symbol>, timeframe: Timeframe) -> Self {
        Self {
            url: config.ws_url.clone(),
            symbols,
            timeframe,
            ping_interval: config.ping_interval,
            reconnect_delay: config.reconnect_delay,
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Start the feed, reporting klines and status changes through `event_tx`
    pub fn start(self, event_tx: mpsc::Sender<FeedEvent>) -> FeedHandle {
        FeedHandle::new(tokio::spawn(run_feed_loop(self, event_tx)))
    }
}

/// `SUBSCRIBE` payload, eg/ `{"method":"SUBSCRIBE","params":["btcusdt@kline_1m","btcusdt@trade"],"id":1}`
pub fn subscribe_message(symbols: &[Symbol], timeframe: Timeframe, id: i64) -> String {
    let params: Vec<String> = symbols
        .iter()
        .flat_map(|symbol| {
            let stream = symbol.stream_name();
            [
                format!("{stream}@kline_{timeframe}"),
                format!("{stream}@trade"),
            ]
        })
        .collect();

    serde_json::json!({
        "method": "SUBSCRIBE",
        "params": params,
        "id": id,
    })
    .to_string()
}

#[derive(Debug, Deserialize)]
struct KlineMessage {
    #[serde(rename = "e")]
    event: String,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "k")]
    kline: KlinePayload,
}

#[derive(Debug, Deserialize)]
struct KlinePayload {
    #[serde(rename = "t", deserialize_with = "de_timestamp")]
    open_time: i64,
    #[serde(rename = "i")]
    interval: String,
    #[serde(rename = "o", deserialize_with = "de_number")]
    open: f64,
    #[serde(rename = "h", deserialize_with = "de_number")]
    high: f64,
    #[serde(rename = "l", deserialize_with = "de_number")]
    low: f64,
    #[serde(rename = "c", deserialize_with = "de_number")]
    close: f64,
    #[serde(rename = "v", deserialize_with = "de_number")]
    volume: f64,
}

fn de_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    coerce_f64(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected numeric value, got {value}")))
}

fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    coerce_i64(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected timestamp, got {value}")))
}

/// Parse one inbound text frame.
///
/// Returns `None` for anything that is not a well-formed kline for `timeframe`.
pub fn parse_kline_message(text: &str, timeframe: Timeframe) -> Option<(Symbol, Bar)> {
    let message: KlineMessage = serde_json::from_str(text).ok()?;
    if message.event != "kline" || message.kline.interval != timeframe.as_str() {
        return None;
    }

    let k = message.kline;
    Some((
        Symbol::from_exchange(&message.symbol),
        Bar {
            t: k.open_time,
            o: k.open,
            h: k.high,
            l: k.low,
            c: k.close,
            v: k.volume,
        },
    ))
}

/// How a connected session ended without a transport error
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Closed,
    ReceiverDropped,
}

/// Connection loop with auto-reconnect
async fn run_feed_loop(feed: KlineFeed, event_tx: mpsc::Sender<FeedEvent>) {
    info!(url = %feed.url, symbols = feed.symbols.len(), timeframe = %feed.timeframe, "starting kline feed");

    loop {
        if event_tx
            .send(FeedEvent::Status(ConnectionStatus::Reconnecting))
            .await
            .is_err()
        {
            return;
        }

        match run_session(&feed, &event_tx).await {
            Ok(SessionEnd::ReceiverDropped) => {
                warn!("Event receiver dropped, stopping feed");
                return;
            }
            Ok(SessionEnd::Closed) => info!("Server closed connection"),
            Err(error) => warn!(%error, url = %feed.url, "kline feed connection failed"),
        }

        if event_tx
            .send(FeedEvent::Status(ConnectionStatus::Disconnected))
            .await
            .is_err()
        {
            return;
        }

        debug!("Waiting {:?} before reconnecting...", feed.reconnect_delay);
        tokio::time::sleep(feed.reconnect_delay).await;
    }
}

/// One connection: subscribe, then forward klines until the socket ends
async fn run_session(feed: &KlineFeed, event_tx: &mpsc::Sender<FeedEvent>) -> Result<SessionEnd> {
    let (ws_stream, _) = connect_async(feed.url.as_str()).await?;
    info!("Connected to WebSocket server at {}", feed.url);
    let (mut write, mut read) = ws_stream.split();

    let subscribe = subscribe_message(
        &feed.symbols,
        feed.timeframe,
        chrono::Utc::now().timestamp_millis(),
    );
    write.send(Message::Text(subscribe.into())).await?;

    if event_tx
        .send(FeedEvent::Status(ConnectionStatus::Connected))
        .await
        .is_err()
    {
        return Ok(SessionEnd::ReceiverDropped);
    }

    let mut ping = tokio::time::interval(feed.ping_interval);
    // first tick completes immediately
    ping.tick().await;

    loop {
        tokio::select! {
            _ = ping.tick() => {
                write.send(Message::Ping(vec![].into())).await?;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match parse_kline_message(text.as_str(), feed.timeframe) {
                        Some((symbol, bar)) => {
                            let event = FeedEvent::Kline {
                                symbol,
                                timeframe: feed.timeframe,
                                bar,
                            };
                            if event_tx.send(event).await.is_err() {
                                return Ok(SessionEnd::ReceiverDropped);
                            }
                        }
                        None => debug!("dropping non-kline message"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                Some(Ok(_)) => {
                    // ping/pong handled by tungstenite
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}
