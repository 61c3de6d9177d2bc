//! Dashboard controller
//!
//! Single owner of all mutable application state. Producers never touch it
//! directly: they send [`FeedEvent`]s, and user actions call the operations
//! below. Anything that needs I/O comes back as a [`Command`] for the runtime.

use crate::{
    config::WatchConfig,
    error::Result,
    frame::{ChartFrame, Notification, PresentationSink},
    history::HistoryStore,
    prefs::{KeyValueStore, Preferences, Settings},
    signal::{MarketPulse, Signal},
    types::{ConnectionStatus, FeedEvent, Symbol, Timeframe},
    watchlist::Watchlist,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Header text before the feed reports anything
pub const STATUS_PENDING: &str = "WS: —";

/// Signal line before the first evaluation
pub const SIGNAL_WAITING: &str = "AI SIGNAL: waiting…";

pub const SIGNAL_POPUP_TITLE: &str = "AI Signal";
pub const TELEGRAM_POPUP_TITLE: &str = "Telegram";

/// Side effects requested by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch historical bars for one symbol
    Bootstrap { symbol: Symbol, timeframe: Timeframe },
    /// Replace the live subscription
    Resubscribe {
        symbols: Vec<Symbol>,
        timeframe: Timeframe,
    },
    /// (Re)start the Telegram bridge with this token
    StartTelegram { token: String },
    StopTelegram,
}

/// Application state for one dashboard session
#[derive(Debug)]
pub struct Dashboard<S> {
    prefs: Preferences<S>,
    watchlist: Watchlist,
    active: Symbol,
    timeframe: Timeframe,
    settings: Settings,
    history: HistoryStore,
    status: Option<ConnectionStatus>,
    pulse: MarketPulse,
    signal: Option<Signal>,
    frame: ChartFrame,
    signal_popup: Duration,
    telegram_popup: Duration,
}

impl<S: KeyValueStore> Dashboard<S> {
    /// Restore the session from `prefs`
    pub fn new(prefs: Preferences<S>, config: &WatchConfig) -> Self {
        let watchlist = prefs.load_watchlist();
        let default_active = watchlist.default_active();
        // a persisted active symbol outside the watchlist would never be bootstrapped
        let active = prefs
            .load_active()
            .filter(|symbol| watchlist.contains(symbol) || *symbol == default_active)
            .unwrap_or(default_active);
        let timeframe = prefs.load_timeframe();
        let settings = prefs.load_settings();

        info!(symbols = watchlist.len(), %active, %timeframe, "dashboard restored");

        Self {
            prefs,
            watchlist,
            active,
            timeframe,
            settings,
            history: HistoryStore::new(),
            status: None,
            pulse: MarketPulse::default(),
            signal: None,
            frame: ChartFrame::default(),
            signal_popup: config.signal_popup,
            telegram_popup: config.telegram_popup,
        }
    }

    /// Commands that bring a fresh session online
    pub fn startup_commands(&self) -> Vec<Command> {
        let mut commands = self.bootstrap_all();
        commands.push(self.resubscribe());
        if let Some(token) = self.settings.telegram_token() {
            commands.push(Command::StartTelegram {
                token: token.to_string(),
            });
        }
        commands
    }

    /// Symbols that are bootstrapped and streamed: the watchlist, or the
    /// fallback active symbol when the watchlist is empty
    pub fn tracked_symbols(&self) -> Vec<Symbol> {
        if self.watchlist.is_empty() {
            vec![self.watchlist.default_active()]
        } else {
            self.watchlist.to_vec()
        }
    }

    fn is_tracked(&self, symbol: &Symbol) -> bool {
        self.watchlist.contains(symbol)
            || (self.watchlist.is_empty() && *symbol == self.watchlist.default_active())
    }

    fn bootstrap_all(&self) -> Vec<Command> {
        self.tracked_symbols()
            .into_iter()
            .map(|symbol| Command::Bootstrap {
                symbol,
                timeframe: self.timeframe,
            })
            .collect()
    }

    fn resubscribe(&self) -> Command {
        Command::Resubscribe {
            symbols: self.tracked_symbols(),
            timeframe: self.timeframe,
        }
    }

    /// Dispatch one producer event
    pub fn apply_event(
        &mut self,
        event: FeedEvent,
        sink: &mut impl PresentationSink,
    ) -> Vec<Command> {
        match event {
            FeedEvent::Status(status) => {
                self.status = Some(status);
                Vec::new()
            }
            FeedEvent::Kline {
                symbol,
                timeframe,
                bar,
            } => {
                if timeframe != self.timeframe || !self.is_tracked(&symbol) {
                    debug!(%symbol, %timeframe, "ignoring kline for untracked stream");
                    return Vec::new();
                }
                let outcome = self.history.apply_live_bar(&symbol, bar);
                if outcome.is_mutation() && symbol == self.active {
                    self.refresh(sink);
                }
                Vec::new()
            }
            FeedEvent::Bootstrap {
                symbol,
                timeframe,
                bars,
            } => {
                if timeframe != self.timeframe {
                    debug!(%symbol, %timeframe, current = %self.timeframe, "ignoring stale bootstrap");
                    return Vec::new();
                }
                self.history.bootstrap(&symbol, bars);
                if symbol == self.active {
                    self.refresh(sink);
                }
                Vec::new()
            }
            FeedEvent::BootstrapFailed {
                symbol,
                timeframe,
                error,
            } => {
                debug!(%symbol, %timeframe, %error, "bootstrap failed, keeping existing bars");
                Vec::new()
            }
            FeedEvent::TelegramSymbols(symbols) => {
                let mut commands = Vec::new();
                for raw in symbols {
                    let Ok(symbol) = Symbol::parse(&raw) else {
                        continue;
                    };
                    if self.watchlist.contains(&symbol) {
                        continue;
                    }
                    commands.extend(self.add_symbol(symbol.as_str()));
                    sink.notify(Notification::new(
                        TELEGRAM_POPUP_TITLE,
                        format!("⚡️ TG signal: {symbol}"),
                        self.telegram_popup,
                    ));
                }
                commands
            }
        }
    }

    /// Rebuild the active chart, the market pulse and the signal
    pub fn refresh(&mut self, sink: &mut impl PresentationSink) {
        let bars = self.history.bars(&self.active);
        self.frame = ChartFrame::from_bars(&self.active, self.timeframe, bars);
        sink.redraw(&self.frame);

        self.pulse = MarketPulse::from_last_bars(
            self.watchlist
                .iter()
                .map(|symbol| self.history.last_bar(symbol)),
        );

        if let Some(signal) = Signal::evaluate(&self.active, bars) {
            sink.notify(Notification::new(
                SIGNAL_POPUP_TITLE,
                signal.to_string(),
                self.signal_popup,
            ));
            self.signal = Some(signal);
        }
    }

    /// Validate and append a symbol. Invalid or duplicate input is a no-op.
    pub fn add_symbol(&mut self, raw: &str) -> Vec<Command> {
        let symbol = match self.watchlist.add(raw) {
            Ok(Some(symbol)) => symbol,
            Ok(None) => {
                debug!(raw, "symbol already watched");
                return Vec::new();
            }
            Err(error) => {
                debug!(%error, "rejected symbol");
                return Vec::new();
            }
        };

        info!(%symbol, "added to watchlist");
        log_persist(self.prefs.save_watchlist(&self.watchlist), "watchlist");

        vec![
            Command::Bootstrap {
                symbol,
                timeframe: self.timeframe,
            },
            self.resubscribe(),
        ]
    }

    /// Remove a symbol; if it was active, fall back to the first entry
    pub fn remove_symbol(
        &mut self,
        symbol: &Symbol,
        sink: &mut impl PresentationSink,
    ) -> Vec<Command> {
        if !self.watchlist.remove(symbol) {
            return Vec::new();
        }

        info!(%symbol, "removed from watchlist");
        log_persist(self.prefs.save_watchlist(&self.watchlist), "watchlist");

        let tracked = self.tracked_symbols();
        self.history.retain(&tracked);

        let mut commands = Vec::new();
        if *symbol == self.active {
            self.active = self.watchlist.default_active();
            log_persist(self.prefs.save_active(&self.active), "active symbol");

            if self.history.bars(&self.active).is_empty() {
                commands.push(Command::Bootstrap {
                    symbol: self.active.clone(),
                    timeframe: self.timeframe,
                });
            }
        }
        self.refresh(sink);

        commands.push(self.resubscribe());
        commands
    }

    /// Switch the charted symbol; redraws from the existing history
    pub fn set_active(&mut self, symbol: &Symbol, sink: &mut impl PresentationSink) {
        if !self.is_tracked(symbol) {
            debug!(%symbol, "cannot activate unwatched symbol");
            return;
        }
        self.active = symbol.clone();
        log_persist(self.prefs.save_active(&self.active), "active symbol");
        self.refresh(sink);
    }

    /// Switch timeframe, discarding every history
    pub fn set_timeframe(
        &mut self,
        timeframe: Timeframe,
        sink: &mut impl PresentationSink,
    ) -> Vec<Command> {
        if timeframe == self.timeframe {
            return Vec::new();
        }

        info!(from = %self.timeframe, to = %timeframe, "switching timeframe");
        self.timeframe = timeframe;
        log_persist(self.prefs.save_timeframe(timeframe), "timeframe");

        self.history.clear();
        self.refresh(sink);

        let mut commands = self.bootstrap_all();
        commands.push(self.resubscribe());
        commands
    }

    /// Persist settings and start or stop the Telegram bridge accordingly
    pub fn save_settings(&mut self, settings: Settings) -> Vec<Command> {
        self.settings = settings;
        log_persist(self.prefs.save_settings(&self.settings), "settings");

        match self.settings.telegram_token() {
            Some(token) => vec![Command::StartTelegram {
                token: token.to_string(),
            }],
            None => vec![Command::StopTelegram],
        }
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    pub fn active(&self) -> &Symbol {
        &self.active
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn frame(&self) -> &ChartFrame {
        &self.frame
    }

    pub fn pulse(&self) -> MarketPulse {
        self.pulse
    }

    pub fn signal(&self) -> Option<&Signal> {
        self.signal.as_ref()
    }

    pub fn status(&self) -> Option<ConnectionStatus> {
        self.status
    }

    /// Feed status line, eg/ "WS: connected"
    pub fn status_label(&self) -> &'static str {
        self.status
            .map(|status| status.label())
            .unwrap_or(STATUS_PENDING)
    }

    /// Persistent signal line
    pub fn signal_text(&self) -> String {
        self.signal
            .as_ref()
            .map(Signal::to_string)
            .unwrap_or_else(|| SIGNAL_WAITING.to_string())
    }
}

fn log_persist(result: Result<()>, what: &str) {
    if let Err(error) = result {
        warn!(%error, "failed to persist {}", what);
    }
}
