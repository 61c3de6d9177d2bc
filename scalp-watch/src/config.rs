//! Runtime configuration for the dashboard
//!
//! Defaults point at the public Binance spot endpoints. Every field can be
//! overridden through the builder methods or from `SCALP_*` environment variables.
use std::{path::PathBuf, time::Duration};

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    /// REST base URL for the kline bootstrap
    pub rest_url: String,
    /// WebSocket URL for the live kline feed
    pub ws_url: String,
    /// Where preferences are persisted
    pub prefs_path: PathBuf,
    /// Number of bars requested per bootstrap
    pub bootstrap_limit: usize,
    /// Ping interval to keep the feed alive
    pub ping_interval: Duration,
    /// Reconnection delay after the feed drops
    pub reconnect_delay: Duration,
    /// Capacity of the controller event channel
    pub channel_buffer_size: usize,
    /// Telegram Bot API base URL
    pub telegram_api_url: String,
    /// Poll interval for the Telegram bridge
    pub telegram_poll_interval: Duration,
    /// How long a signal popup stays up
    pub signal_popup: Duration,
    /// How long a Telegram popup stays up
    pub telegram_popup: Duration,
    /// Log file written by the binary
    pub log_file: PathBuf,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            rest_url: "https://api.binance.com".to_string(),
            ws_url: "wss://stream.binance.com:9443/ws".to_string(),
            prefs_path: default_prefs_path(),
            bootstrap_limit: 500,
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(2),
            channel_buffer_size: 10_000,
            telegram_api_url: "https://api.telegram.org".to_string(),
            telegram_poll_interval: Duration::from_secs(35),
            signal_popup: Duration::from_millis(2600),
            telegram_popup: Duration::from_millis(2400),
            log_file: PathBuf::from("scalp-watch.log"),
        }
    }
}

impl WatchConfig {
    /// Defaults overridden by any `SCALP_*` variables that are present and parse
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = env_string("SCALP_REST_URL") {
            config.rest_url = url;
        }
        if let Some(url) = env_string("SCALP_WS_URL") {
            config.ws_url = url;
        }
        if let Some(path) = env_string("SCALP_PREFS_PATH") {
            config.prefs_path = PathBuf::from(path);
        }
        if let Some(limit) = env_parse("SCALP_BOOTSTRAP_LIMIT") {
            config.bootstrap_limit = limit;
        }
        if let Some(secs) = env_parse("SCALP_RECONNECT_SECS") {
            config.reconnect_delay = Duration::from_secs(secs);
        }
        if let Some(url) = env_string("SCALP_TELEGRAM_API_URL") {
            config.telegram_api_url = url;
        }
        if let Some(secs) = env_parse("SCALP_TELEGRAM_POLL_SECS") {
            config.telegram_poll_interval = Duration::from_secs(secs);
        }
        if let Some(path) = env_string("SCALP_LOG_FILE") {
            config.log_file = PathBuf::from(path);
        }

        config
    }

    /// Set REST base URL
    pub fn with_rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = url.into();
        self
    }

    /// Set WebSocket URL
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Set preferences file
    pub fn with_prefs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.prefs_path = path.into();
        self
    }

    /// Set ping interval
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set channel buffer size
    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    /// Set Telegram Bot API base URL
    pub fn with_telegram_api_url(mut self, url: impl Into<String>) -> Self {
        self.telegram_api_url = url.into();
        self
    }

    /// Set Telegram poll interval
    pub fn with_telegram_poll_interval(mut self, interval: Duration) -> Self {
        self.telegram_poll_interval = interval;
        self
    }

    /// Set bootstrap bar count
    pub fn with_bootstrap_limit(mut self, limit: usize) -> Self {
        self.bootstrap_limit = limit;
        self
    }
}

fn default_prefs_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scalp-watch")
        .join("prefs.json")
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = WatchConfig::default()
            .with_rest_url("http://127.0.0.1:8080")
            .with_ws_url("ws://127.0.0.1:9001")
            .with_prefs_path("/tmp/prefs.json")
            .with_ping_interval(Duration::from_secs(15))
            .with_reconnect_delay(Duration::from_secs(5))
            .with_channel_buffer_size(500)
            .with_bootstrap_limit(100);

        assert_eq!(config.rest_url, "http://127.0.0.1:8080");
        assert_eq!(config.ws_url, "ws://127.0.0.1:9001");
        assert_eq!(config.prefs_path, PathBuf::from("/tmp/prefs.json"));
        assert_eq!(config.ping_interval, Duration::from_secs(15));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.channel_buffer_size, 500);
        assert_eq!(config.bootstrap_limit, 100);
    }

    #[test]
    fn test_default_config() {
        let config = WatchConfig::default();
        assert_eq!(config.rest_url, "https://api.binance.com");
        assert_eq!(config.ws_url, "wss://stream.binance.com:9443/ws");
        assert_eq!(config.bootstrap_limit, 500);
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.telegram_poll_interval, Duration::from_secs(35));
        assert_eq!(config.signal_popup, Duration::from_millis(2600));
        assert!(config.prefs_path.ends_with("scalp-watch/prefs.json"));
    }
}
