use thiserror::Error;

/// All errors generated in `scalp-watch`.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {status} for {url}")]
    Status { status: u16, url: String },

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    Socket(String),

    #[error("invalid symbol: {0:?} (expected 5-15 uppercase alphanumerics)")]
    InvalidSymbol(String),

    #[error("unknown timeframe: {0:?}")]
    UnknownTimeframe(String),

    #[error("Telegram API responded with ok=false")]
    TelegramRejected,
}

impl WatchError {
    /// Determine if an error is a transport failure (as opposed to bad input or bad data).
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_transport(&self) -> bool {
        match self {
            WatchError::Http(_)
            | WatchError::Status { .. }
            | WatchError::Socket(_)
            | WatchError::Io(_) => true,
            _ => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for WatchError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_error_is_transport() {
        struct TestCase {
            input: WatchError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: non-success status is a transport failure
                input: WatchError::Status {
                    status: 500,
                    url: "https://api.binance.com/api/v3/klines".to_string(),
                },
                expected: true,
            },
            TestCase {
                // TC1: socket failure
                input: WatchError::Socket("Connection reset without closing handshake".to_string()),
                expected: true,
            },
            TestCase {
                // TC2: bad user input is not
                input: WatchError::InvalidSymbol("abc".to_string()),
                expected: false,
            },
            TestCase {
                // TC3: unknown timeframe is not
                input: WatchError::UnknownTimeframe("2m".to_string()),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_transport();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_tungstenite_error_maps_to_socket() {
        let error = WatchError::from(tokio_tungstenite::tungstenite::Error::ConnectionClosed);
        assert!(matches!(error, WatchError::Socket(_)));
        assert!(error.is_transport());
    }
}
