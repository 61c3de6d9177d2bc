//! Per-redraw chart payload and the sink that consumes it
//!
//! A [`ChartFrame`] is rebuilt from the active symbol's full history on every
//! update; the renderer never sees partial or incremental series.
use crate::{
    indicators::{closes, ema, rsi, vwap, RSI_PERIOD},
    types::{Bar, Symbol, Timeframe},
};
use std::time::{Duration, Instant};

/// EMA periods overlaid on the price chart
pub const EMA_PERIODS: [usize; 3] = [9, 21, 50];

/// RSI value emitted while the oscillator is still warming up
pub const RSI_NEUTRAL: f64 = 50.0;

/// One candlestick, time in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandlePoint {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Volume histogram column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumePoint {
    pub time: i64,
    pub value: f64,
    /// Close at or above open
    pub up: bool,
}

/// One indicator sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePoint {
    pub time: i64,
    pub value: f64,
}

/// Everything the renderer needs to redraw the active symbol
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartFrame {
    pub symbol: Option<Symbol>,
    pub timeframe: Timeframe,
    pub candles: Vec<CandlePoint>,
    pub volume: Vec<VolumePoint>,
    pub ema9: Vec<LinePoint>,
    pub ema21: Vec<LinePoint>,
    pub ema50: Vec<LinePoint>,
    pub vwap: Vec<LinePoint>,
    pub rsi: Vec<LinePoint>,
}

impl ChartFrame {
    /// Recompute every series from `bars`
    pub fn from_bars(symbol: &Symbol, timeframe: Timeframe, bars: &[Bar]) -> Self {
        let closes = closes(bars);
        let [p9, p21, p50] = EMA_PERIODS;

        Self {
            symbol: Some(symbol.clone()),
            timeframe,
            candles: bars
                .iter()
                .map(|bar| CandlePoint {
                    time: bar.time_secs(),
                    open: bar.o,
                    high: bar.h,
                    low: bar.l,
                    close: bar.c,
                })
                .collect(),
            volume: bars
                .iter()
                .map(|bar| VolumePoint {
                    time: bar.time_secs(),
                    value: bar.v,
                    up: bar.is_up(),
                })
                .collect(),
            ema9: line_series(bars, ema(&closes, p9)),
            ema21: line_series(bars, ema(&closes, p21)),
            ema50: line_series(bars, ema(&closes, p50)),
            vwap: line_series(bars, vwap(bars)),
            rsi: line_series(
                bars,
                rsi(&closes, RSI_PERIOD)
                    .into_iter()
                    .map(|value| value.unwrap_or(RSI_NEUTRAL)),
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last_candle(&self) -> Option<&CandlePoint> {
        self.candles.last()
    }
}

fn line_series(bars: &[Bar], values: impl IntoIterator<Item = f64>) -> Vec<LinePoint> {
    bars.iter()
        .zip(values)
        .map(|(bar, value)| LinePoint {
            time: bar.time_secs(),
            value,
        })
        .collect()
}

/// Transient message shown over the chart
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: &'static str,
    pub message: String,
    pub expires_at: Instant,
}

impl Notification {
    pub fn new(title: &'static str, message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            title,
            message: message.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Chart renderer fed by the dashboard
pub trait PresentationSink {
    /// Replace every series with the contents of `frame`
    fn redraw(&mut self, frame: &ChartFrame);

    /// Show a transient popup
    fn notify(&mut self, notification: Notification);
}

/// Sink that keeps the latest frame and popup, eg/ for headless use and tests
#[derive(Debug, Clone, Default)]
pub struct FrameRecorder {
    pub frames: Vec<ChartFrame>,
    pub notifications: Vec<Notification>,
}

impl FrameRecorder {
    pub fn last_frame(&self) -> Option<&ChartFrame> {
        self.frames.last()
    }
}

impl PresentationSink for FrameRecorder {
    fn redraw(&mut self, frame: &ChartFrame) {
        self.frames.push(frame.clone());
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}
