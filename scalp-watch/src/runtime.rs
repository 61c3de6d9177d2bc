//! Executes controller commands against the network producers

use crate::{
    backfill::KlineSource,
    config::WatchConfig,
    state::Command,
    telegram::TelegramBridge,
    types::FeedEvent,
    websocket::{FeedHandle, KlineFeed},
};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Owns the event sender and every running producer task
#[derive(Debug)]
pub struct Runtime {
    config: WatchConfig,
    source: KlineSource,
    event_tx: mpsc::Sender<FeedEvent>,
    feed: Option<FeedHandle>,
    telegram: Option<FeedHandle>,
}

impl Runtime {
    /// Create the runtime and the receiving end of the event channel
    pub fn new(config: WatchConfig) -> (Self, mpsc::Receiver<FeedEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.channel_buffer_size);
        let source = KlineSource::new(config.rest_url.clone());

        let runtime = Self {
            config,
            source,
            event_tx,
            feed: None,
            telegram: None,
        };
        (runtime, event_rx)
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Sender for additional producers
    pub fn event_sender(&self) -> mpsc::Sender<FeedEvent> {
        self.event_tx.clone()
    }

    pub fn execute(&mut self, commands: impl IntoIterator<Item = Command>) {
        for command in commands {
            self.execute_one(command);
        }
    }

    fn execute_one(&mut self, command: Command) {
        match command {
            Command::Bootstrap { symbol, timeframe } => {
                debug!(%symbol, %timeframe, "spawning bootstrap");
                // fire and forget: the result arrives as a FeedEvent
                drop(self.source.spawn_bootstrap(
                    symbol,
                    timeframe,
                    self.config.bootstrap_limit,
                    self.event_tx.clone(),
                ));
            }
            Command::Resubscribe { symbols, timeframe } => {
                info!(symbols = symbols.len(), %timeframe, "resubscribing feed");
                // the old subscription is aborted before the new one opens
                self.feed = None;
                let feed = KlineFeed::new(&self.config, symbols, timeframe);
                self.feed = Some(feed.start(self.event_tx.clone()));
            }
            Command::StartTelegram { token } => {
                self.telegram = None;
                let bridge = TelegramBridge::new(&self.config, token);
                self.telegram = Some(bridge.start(self.event_tx.clone()));
            }
            Command::StopTelegram => {
                if self.telegram.take().is_some() {
                    info!("Telegram bridge stopped");
                }
            }
        }
    }

    pub fn is_feed_running(&self) -> bool {
        self.feed.as_ref().is_some_and(|feed| !feed.is_finished())
    }

    pub fn is_telegram_running(&self) -> bool {
        self.telegram
            .as_ref()
            .is_some_and(|bridge| !bridge.is_finished())
    }
}
