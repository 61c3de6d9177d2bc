//! Persisted user preferences
//!
//! Reads never fail: missing or corrupt values fall back to defaults.

use crate::{
    error::Result,
    types::{Symbol, Timeframe},
    watchlist::Watchlist,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const KEY_WATCHLIST: &str = "scalp.v1.wl";
pub const KEY_ACTIVE: &str = "scalp.v1.active";
pub const KEY_TIMEFRAME: &str = "scalp.v1.tf";
pub const KEY_SETTINGS: &str = "scalp.v1.settings";

/// String key-value persistence
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String) -> Result<()>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store persisted as one flat JSON object on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Load `path`. Returns an empty store if the file is missing or corrupt.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                warn!(path = %path.display(), %error, "corrupt preferences file, using defaults");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };

        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

/// Optional user credentials, stored verbatim and never sent anywhere the user
/// did not configure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tg_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tg_chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_key: Option<String>,
}

impl Settings {
    /// Telegram token, if set and non-blank
    pub fn telegram_token(&self) -> Option<&str> {
        self.tg_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Typed access to the persisted preferences
#[derive(Debug, Clone)]
pub struct Preferences<S> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persisted watchlist; invalid entries are dropped, and an empty or
    /// unreadable list yields the default seed.
    pub fn load_watchlist(&self) -> Watchlist {
        let stored = self
            .store
            .get(KEY_WATCHLIST)
            .and_then(|raw| match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(list) => Some(list),
                Err(error) => {
                    warn!(%error, "corrupt watchlist preference, using defaults");
                    None
                }
            })
            .unwrap_or_default();

        let watchlist = Watchlist::new(stored.iter().filter_map(|s| Symbol::parse(s).ok()));
        if watchlist.is_empty() {
            Watchlist::seeded()
        } else {
            watchlist
        }
    }

    pub fn save_watchlist(&mut self, watchlist: &Watchlist) -> Result<()> {
        let list: Vec<&str> = watchlist.iter().map(Symbol::as_str).collect();
        self.store.set(KEY_WATCHLIST, serde_json::to_string(&list)?)
    }

    pub fn load_active(&self) -> Option<Symbol> {
        self.store
            .get(KEY_ACTIVE)
            .and_then(|raw| Symbol::parse(&raw).ok())
    }

    pub fn save_active(&mut self, symbol: &Symbol) -> Result<()> {
        self.store.set(KEY_ACTIVE, symbol.to_string())
    }

    pub fn load_timeframe(&self) -> Timeframe {
        self.store
            .get(KEY_TIMEFRAME)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub fn save_timeframe(&mut self, timeframe: Timeframe) -> Result<()> {
        self.store.set(KEY_TIMEFRAME, timeframe.to_string())
    }

    pub fn load_settings(&self) -> Settings {
        self.store
            .get(KEY_SETTINGS)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(settings) => Some(settings),
                Err(error) => {
                    warn!(%error, "corrupt settings preference, using defaults");
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        self.store.set(KEY_SETTINGS, serde_json::to_string(settings)?)
    }
}
