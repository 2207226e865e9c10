use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NewsRecord
// ---------------------------------------------------------------------------

/// One normalized news item. `(ticker, id)` is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub ticker: String,
    pub id: i64,
    /// Seconds since the Unix epoch, UTC.
    pub published_at: i64,
    pub source: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub engagement: Option<i64>,
    /// Title carried the paywall marker.
    pub premium: bool,
}

impl NewsRecord {
    pub fn published_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.published_at, 0)
    }
}

// ---------------------------------------------------------------------------
// Pagination state
// ---------------------------------------------------------------------------

/// Cursor state of a scrape. `Running` holds the continuation to send next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeState {
    Running(String),
    Done,
}

impl ScrapeState {
    /// Next state after a page: an absent continuation ends the scrape.
    pub fn from_continuation(continuation: Option<String>) -> Self {
        match continuation {
            Some(c) => ScrapeState::Running(c),
            None => ScrapeState::Done,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ScrapeState::Done)
    }
}

/// Progress of one page step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub total_extracted: usize,
    pub page_items: usize,
    /// `None` when the page was empty.
    pub oldest: Option<DateTime<Utc>>,
    pub continuation: Option<String>,
    pub inserted: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: usize,
    pub extracted: usize,
    pub inserted: u64,
}

/// Result of one atomic batch write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// INSERT statements executed.
    pub chunks: usize,
    /// Rows actually written; duplicates are ignored and not counted.
    pub inserted: u64,
}
