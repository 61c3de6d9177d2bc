//! scalp-watch
//!
//! Terminal market watcher for Binance spot symbols. Keeps a bounded bar
//! history per watched symbol, merging a REST bootstrap with the live kline
//! stream, and recomputes EMA, RSI and VWAP overlays plus a toy trend signal on
//! every update of the active symbol.
//!
//! The library holds the whole pipeline; the `scalp-watch` binary is only the
//! terminal front-end.

pub mod backfill;
pub mod config;
pub mod error;
pub mod frame;
pub mod history;
pub mod indicators;
pub mod prefs;
pub mod runtime;
pub mod signal;
pub mod state;
pub mod telegram;
pub mod types;
pub mod watchlist;
pub mod websocket;

pub use backfill::KlineSource;
pub use config::WatchConfig;
pub use error::{Result, WatchError};
pub use frame::{ChartFrame, FrameRecorder, Notification, PresentationSink};
pub use history::{BarHistory, HistoryStore, LiveUpdate, MAX_BARS};
pub use prefs::{JsonFileStore, KeyValueStore, MemoryStore, Preferences, Settings};
pub use runtime::Runtime;
pub use signal::{MarketPulse, Signal, SignalSide};
pub use state::{Command, Dashboard};
pub use telegram::TelegramBridge;
pub use types::{Bar, ConnectionStatus, FeedEvent, Symbol, Timeframe};
pub use watchlist::Watchlist;
pub use websocket::{FeedHandle, KlineFeed};
