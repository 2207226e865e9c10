mod config;
mod db;
mod error;
mod feed;
mod scraper;
mod types;

use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::{NewsStore, SqliteNewsStore};
use crate::error::Result;
use crate::feed::HttpFeedClient;
use crate::scraper::{FeedSettings, Scraper};
use crate::types::NewsRecord;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            eprintln!("usage: harvester <TICKER>");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        let kind = if e.is_transport() {
            "transport"
        } else if e.is_store() {
            "store"
        } else {
            "other"
        };
        // Writes ignore existing rows, so rerunning from scratch is always safe.
        error!(kind, "Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let store = SqliteNewsStore::open(&cfg.db_path).await?;
    store.create_schema_if_absent().await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Scrape ---
    let client = HttpFeedClient::new(Duration::from_secs(cfg.http_timeout_secs))?;
    let settings = FeedSettings {
        endpoint: cfg.feed_url.clone(),
        page_size: cfg.page_size,
    };
    if !cfg.continuation.is_empty() {
        info!("Resuming {} from continuation {}", cfg.ticker, cfg.continuation);
    }
    let mut scraper = Scraper::new(client, store.clone(), cfg.ticker.clone(), settings)
        .with_continuation(cfg.continuation.clone());
    scraper.run().await?;

    // --- Summary ---
    let stored = store.count_for_ticker(scraper.ticker()).await?;
    info!(
        "{} stored news for {} ({} extracted this run)",
        stored,
        scraper.ticker(),
        scraper.extracted()
    );
    if let Some(newest) = store.latest_for_ticker(scraper.ticker(), 1).await?.pop() {
        let newest = NewsRecord::from(newest);
        let published = newest
            .published_at_utc()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        info!("Newest: [{}] {}", published, newest.title);
    }

    Ok(())
}
