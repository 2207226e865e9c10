use crate::error::{AppError, Result};

pub const FEED_URL: &str = "http://cloud.feedly.com/v3/streams/contents";

/// Stream id template; the ticker symbol is appended.
pub const STREAM_ID_PREFIX: &str = "feed/http://finance.yahoo.com/rss/headline?s=";

/// Upper bound of items requested per page. The feed may return fewer.
pub const PAGE_SIZE: u32 = 1000;

/// Rows per INSERT statement. 100 rows x 9 columns stays under SQLite's
/// default bound-parameter limit.
pub const INSERT_CHUNK_SIZE: usize = 100;

pub const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub feed_url: String,
    pub log_level: String,
    pub db_path: String,
    /// Symbol to harvest (first CLI argument, or TICKER)
    pub ticker: String,
    /// Continuation token to resume from (CONTINUATION). Empty starts at the newest item.
    pub continuation: String,
    /// Items requested per page (PAGE_SIZE)
    pub page_size: u32,
    /// Per-request timeout for feed calls (HTTP_TIMEOUT_SECS)
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), std::env::args().nth(1))
    }

    fn from_lookup<F>(var: F, ticker_arg: Option<String>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ticker = ticker_arg
            .or_else(|| var("TICKER"))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Config("ticker must be given as first argument or TICKER".to_string())
            })?;

        Ok(Self {
            feed_url: var("FEED_URL").unwrap_or_else(|| FEED_URL.to_string()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            db_path: var("DB_PATH").unwrap_or_else(|| "news.db".to_string()),
            ticker,
            continuation: var("CONTINUATION").unwrap_or_default(),
            page_size: match var("PAGE_SIZE") {
                Some(v) => v
                    .parse::<u32>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| AppError::Config("PAGE_SIZE must be a positive integer".to_string()))?,
                None => PAGE_SIZE,
            },
            http_timeout_secs: var("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(HTTP_TIMEOUT_SECS),
        })
    }
}

/// Feed stream id for a ticker's headline feed.
pub fn stream_id(ticker: &str) -> String {
    format!("{STREAM_ID_PREFIX}{ticker}")
}
