//! Bounded per-symbol bar history
//!
//! Merges the REST bootstrap with streaming kline updates. The in-progress
//! candle is replaced tick by tick; a new bucket start appends; the oldest bars
//! are evicted once the cap is exceeded.

use crate::types::{Bar, Symbol};
use fnv::FnvHashMap;
use tracing::debug;

/// Maximum number of bars kept per symbol
pub const MAX_BARS: usize = 600;

/// What a live update did to the history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveUpdate {
    /// Same bucket as the last bar: last bar overwritten
    Replaced,
    /// New bucket: bar appended (oldest possibly evicted)
    Appended,
    /// Bucket older than the last bar: ignored
    Rejected,
}

impl LiveUpdate {
    /// Whether the history changed
    pub fn is_mutation(&self) -> bool {
        !matches!(self, LiveUpdate::Rejected)
    }
}

/// Time-ordered bars for one (symbol, timeframe) pair
#[derive(Debug, Clone, PartialEq)]
pub struct BarHistory {
    bars: Vec<Bar>,
    max_size: usize,
}

impl BarHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            bars: Vec::with_capacity(max_size),
            max_size,
        }
    }

    /// Replace everything with `bars`, keeping the newest `max_size`
    pub fn reset(&mut self, mut bars: Vec<Bar>) {
        let excess = bars.len().saturating_sub(self.max_size);
        bars.drain(..excess);
        self.bars = bars;
    }

    /// Replace-or-append a streaming bar
    pub fn apply_live(&mut self, bar: Bar) -> LiveUpdate {
        let outcome = match self.bars.last_mut() {
            Some(last) if last.t == bar.t => {
                *last = bar;
                LiveUpdate::Replaced
            }
            Some(last) if bar.t < last.t => LiveUpdate::Rejected,
            _ => {
                self.bars.push(bar);
                LiveUpdate::Appended
            }
        };
        self.evict();
        outcome
    }

    fn evict(&mut self) {
        let excess = self.bars.len().saturating_sub(self.max_size);
        if excess > 0 {
            self.bars.drain(..excess);
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

impl Default for BarHistory {
    fn default() -> Self {
        Self::new(MAX_BARS)
    }
}

/// Bar histories for every watched symbol
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    histories: FnvHashMap<Symbol, BarHistory>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole history for `symbol` with bootstrap data
    pub fn bootstrap(&mut self, symbol: &Symbol, bars: Vec<Bar>) {
        debug!(%symbol, bars = bars.len(), "bootstrapping history");
        self.histories
            .entry(symbol.clone())
            .or_default()
            .reset(bars);
    }

    /// Merge one streaming bar into the history for `symbol`
    pub fn apply_live_bar(&mut self, symbol: &Symbol, bar: Bar) -> LiveUpdate {
        let outcome = self
            .histories
            .entry(symbol.clone())
            .or_default()
            .apply_live(bar);

        if outcome == LiveUpdate::Rejected {
            debug!(%symbol, t = bar.t, "rejected out-of-order live bar");
        }
        outcome
    }

    /// Ordered bars for `symbol`, empty if unknown
    pub fn bars(&self, symbol: &Symbol) -> &[Bar] {
        self.histories
            .get(symbol)
            .map(BarHistory::bars)
            .unwrap_or(&[])
    }

    pub fn last_bar(&self, symbol: &Symbol) -> Option<&Bar> {
        self.histories.get(symbol).and_then(BarHistory::last)
    }

    /// Percent change of the last close against the close `lookback` bars
    /// earlier, or against the oldest bar when the history is shorter.
    ///
    /// `None` for an unknown or empty history; `0.0` when the reference close is zero.
    pub fn change_pct(&self, symbol: &Symbol, lookback: usize) -> Option<f64> {
        let bars = self.bars(symbol);
        let last = bars.last()?;
        let first = &bars[bars.len().saturating_sub(lookback + 1)];

        if first.c == 0.0 {
            return Some(0.0);
        }
        Some((last.c / first.c - 1.0) * 100.0)
    }

    /// Drop every history (timeframe switch)
    pub fn clear(&mut self) {
        self.histories.clear();
    }

    /// Drop histories for symbols that are no longer watched
    pub fn retain<'a>(&mut self, watched: impl IntoIterator<Item = &'a Symbol>) {
        let watched: Vec<&Symbol> = watched.into_iter().collect();
        self.histories.retain(|symbol, _| watched.contains(&symbol));
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}
