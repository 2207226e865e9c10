use tracing::info;

use crate::config::{stream_id, FEED_URL, PAGE_SIZE};
use crate::db::NewsStore;
use crate::error::Result;
use crate::feed::{normalize, FeedClient, FeedPage, FeedQuery};
use crate::types::{NewsRecord, RunSummary, ScrapeState, StepReport};

/// Where and how much to request per page.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub endpoint: String,
    pub page_size: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            endpoint: FEED_URL.to_string(),
            page_size: PAGE_SIZE,
        }
    }
}

/// Walks one ticker's feed from the newest item backwards, one page per
/// step, until the feed stops returning a continuation.
///
/// Pages are strictly sequential since each request carries the previous
/// page's cursor. Fetch and normalization errors are not retried; rerunning
/// a scrape from the start is always safe because writes ignore existing rows.
pub struct Scraper<C, S> {
    client: C,
    store: S,
    ticker: String,
    stream_id: String,
    settings: FeedSettings,
    state: ScrapeState,
    extracted: usize,
}

impl<C: FeedClient, S: NewsStore> Scraper<C, S> {
    pub fn new(client: C, store: S, ticker: impl Into<String>, settings: FeedSettings) -> Self {
        let ticker = ticker.into();
        Self {
            client,
            store,
            stream_id: stream_id(&ticker),
            ticker,
            settings,
            state: ScrapeState::Running(String::new()),
            extracted: 0,
        }
    }

    /// Resume from a continuation token of an earlier scrape.
    #[must_use]
    pub fn with_continuation(mut self, continuation: impl Into<String>) -> Self {
        self.state = ScrapeState::Running(continuation.into());
        self
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    #[cfg(test)]
    pub fn state(&self) -> &ScrapeState {
        &self.state
    }

    /// Items extracted so far across all steps.
    pub fn extracted(&self) -> usize {
        self.extracted
    }

    /// Steps until the feed is exhausted.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        while !self.state.is_done() {
            let report = self.step().await?;
            summary.pages += 1;
            summary.inserted += report.inserted;
        }
        summary.extracted = self.extracted;
        info!(
            ticker = %self.ticker,
            pages = summary.pages,
            extracted = summary.extracted,
            inserted = summary.inserted,
            "scrape complete"
        );
        Ok(summary)
    }

    /// Fetches, normalizes and stores one page. A single malformed item fails
    /// the whole step before anything from the page is written.
    ///
    /// Once the scrape is done this fetches nothing and reports an empty page.
    pub async fn step(&mut self) -> Result<StepReport> {
        let continuation = match &self.state {
            ScrapeState::Running(c) => c.clone(),
            ScrapeState::Done => {
                return Ok(StepReport {
                    total_extracted: self.extracted,
                    page_items: 0,
                    oldest: None,
                    continuation: None,
                    inserted: 0,
                })
            }
        };

        let page = self.fetch(&continuation).await?;

        let news = page
            .items
            .iter()
            .map(|item| normalize(&self.ticker, item))
            .collect::<std::result::Result<Vec<NewsRecord>, _>>()?;

        self.state = ScrapeState::from_continuation(page.continuation.clone());
        self.extracted += news.len();

        let mut report = StepReport {
            total_extracted: self.extracted,
            page_items: news.len(),
            oldest: news
                .iter()
                .map(|n| n.published_at)
                .min()
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0)),
            continuation: page.continuation,
            inserted: 0,
        };
        log_progress(&self.ticker, &report);

        report.inserted = self.store.upsert_batch(&news).await?.inserted;
        Ok(report)
    }

    async fn fetch(&self, continuation: &str) -> Result<FeedPage> {
        let query = FeedQuery {
            stream_id: &self.stream_id,
            count: self.settings.page_size,
            continuation,
        };
        let body = self.client.get(&self.settings.endpoint, &query).await?;
        FeedPage::from_value(body)
    }
}

fn log_progress(ticker: &str, report: &StepReport) {
    let oldest = report
        .oldest
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "n/a".to_string());
    info!(
        ticker,
        extracted = report.total_extracted,
        page_items = report.page_items,
        oldest = %oldest,
        continuation = ?report.continuation,
        "Extracted {} (+{}) news, oldest: {}",
        report.total_extracted,
        report.page_items,
        oldest,
    );
}
