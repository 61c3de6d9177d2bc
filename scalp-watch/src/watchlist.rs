//! Ordered, duplicate-free set of watched symbols

use crate::{error::WatchError, types::Symbol};
use indexmap::IndexSet;

/// Symbols seeded when nothing usable is persisted
pub const DEFAULT_WATCHLIST: [&str; 4] = ["SOLUSDT", "PEPEUSDT", "BONKUSDT", "BTCUSDT"];

/// Fallback active symbol when the watchlist is empty
pub const FALLBACK_SYMBOL: &str = "BTCUSDT";

/// Insertion-ordered watchlist; insertion order is display order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watchlist {
    symbols: IndexSet<Symbol>,
}

impl Watchlist {
    pub fn new(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            symbols: symbols.into_iter().collect(),
        }
    }

    /// The default seed list
    pub fn seeded() -> Self {
        Self::new(DEFAULT_WATCHLIST.iter().filter_map(|s| Symbol::parse(s).ok()))
    }

    /// Validate and append `raw`.
    ///
    /// Returns `Ok(None)` when the symbol is already watched.
    pub fn add(&mut self, raw: &str) -> Result<Option<Symbol>, WatchError> {
        let symbol = Symbol::parse(raw)?;
        Ok(self.symbols.insert(symbol.clone()).then_some(symbol))
    }

    /// Remove `symbol`, preserving the order of the rest
    pub fn remove(&mut self, symbol: &Symbol) -> bool {
        self.symbols.shift_remove(symbol)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn first(&self) -> Option<&Symbol> {
        self.symbols.first()
    }

    pub fn get(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get_index(index)
    }

    pub fn position(&self, symbol: &Symbol) -> Option<usize> {
        self.symbols.get_index_of(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn to_vec(&self) -> Vec<Symbol> {
        self.symbols.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// First entry, or `BTCUSDT` when empty
    pub fn default_active(&self) -> Symbol {
        self.first()
            .cloned()
            .unwrap_or_else(|| Symbol::from_exchange(FALLBACK_SYMBOL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_rejects_invalid() {
        let mut watchlist = Watchlist::default();
        assert!(matches!(watchlist.add("abc"), Err(WatchError::InvalidSymbol(_))));
        assert!(watchlist.is_empty());
    }

    #[test]
    fn test_add_is_unique() {
        let mut watchlist = Watchlist::default();
        assert!(watchlist.add("BTCUSDT").unwrap().is_some());
        assert!(watchlist.add("btcusdt").unwrap().is_none());
        assert_eq!(watchlist.len(), 1);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut watchlist = Watchlist::seeded();
        let pepe = Symbol::parse("PEPEUSDT").unwrap();

        assert!(watchlist.remove(&pepe));
        assert!(!watchlist.remove(&pepe));

        let order: Vec<&str> = watchlist.iter().map(Symbol::as_str).collect();
        assert_eq!(order, vec!["SOLUSDT", "BONKUSDT", "BTCUSDT"]);
    }

    #[test]
    fn test_default_active() {
        assert_eq!(Watchlist::seeded().default_active().as_str(), "SOLUSDT");
        assert_eq!(Watchlist::default().default_active().as_str(), FALLBACK_SYMBOL);
    }
}
