//! Optional Telegram bridge
//!
//! Polls a user-configured bot for new messages and forwards any `...USDT`
//! symbols they mention to the dashboard.

use crate::{
    config::WatchConfig,
    error::{Result, WatchError},
    types::FeedEvent,
    websocket::FeedHandle,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const QUOTE: &str = "USDT";
const MIN_BASE_LEN: usize = 3;

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<UpdateMessage>,
}

#[derive(Debug, Deserialize)]
struct UpdateMessage {
    #[serde(default)]
    text: Option<String>,
}

/// Whole words made of three or more uppercase letters followed by `USDT`,
/// deduplicated in order of appearance
pub fn extract_usdt_symbols(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    for word in text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
        let matches = word.len() >= MIN_BASE_LEN + QUOTE.len()
            && word.ends_with(QUOTE)
            && word.bytes().all(|b| b.is_ascii_uppercase());

        if matches && !found.iter().any(|s| s == word) {
            found.push(word.to_string());
        }
    }

    found
}

/// Bot API poller for one token
#[derive(Debug, Clone)]
pub struct TelegramBridge {
    client: reqwest::Client,
    api_url: String,
    token: String,
    poll_interval: Duration,
}

impl TelegramBridge {
    pub fn new(config: &WatchConfig, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.telegram_api_url.clone(),
            token: token.into(),
            poll_interval: config.telegram_poll_interval,
        }
    }

    /// eg/ `https://api.telegram.org/bot<token>/getUpdates?offset=7`
    pub fn updates_url(&self, offset: Option<i64>) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/bot{}/getUpdates",
            self.api_url.trim_end_matches('/'),
            self.token
        ))?;
        if let Some(offset) = offset {
            url.query_pairs_mut()
                .append_pair("offset", &offset.to_string());
        }
        Ok(url)
    }

    /// Fetch pending updates once.
    ///
    /// Returns the symbols mentioned and the offset to use for the next poll.
    pub async fn poll_once(&self, offset: Option<i64>) -> Result<(Vec<String>, Option<i64>)> {
        let url = self.updates_url(offset)?;
        let response = self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !response.status().is_success() {
            // the URL carries the bot token and is kept out of every error
            return Err(WatchError::Status {
                status: response.status().as_u16(),
                url: format!("{}/bot<redacted>/getUpdates", self.api_url),
            });
        }

        let body: UpdatesResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;
        scan_updates(body, offset)
    }

    /// Poll every `poll_interval` until the handle is dropped
    pub fn start(self, event_tx: mpsc::Sender<FeedEvent>) -> FeedHandle {
        FeedHandle::new(tokio::spawn(async move {
            info!(interval = ?self.poll_interval, "starting Telegram bridge");
            let start = tokio::time::Instant::now() + self.poll_interval;
            let mut interval = tokio::time::interval_at(start, self.poll_interval);
            let mut offset = None;

            loop {
                interval.tick().await;

                match self.poll_once(offset).await {
                    Ok((symbols, next_offset)) => {
                        offset = next_offset;
                        if symbols.is_empty() {
                            continue;
                        }
                        debug!(?symbols, "symbols received from Telegram");
                        if event_tx
                            .send(FeedEvent::TelegramSymbols(symbols))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(error) => warn!(%error, "Telegram poll failed"),
                }
            }
        }))
    }
}

fn scan_updates(body: UpdatesResponse, offset: Option<i64>) -> Result<(Vec<String>, Option<i64>)> {
    if !body.ok {
        return Err(WatchError::TelegramRejected);
    }

    let mut symbols: Vec<String> = Vec::new();
    let mut next_offset = offset;

    for update in body.result {
        next_offset = next_offset.max(Some(update.update_id + 1));

        let text = update.message.and_then(|m| m.text).unwrap_or_default();
        for symbol in extract_usdt_symbols(&text) {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
    }

    Ok((symbols, next_offset))
}
