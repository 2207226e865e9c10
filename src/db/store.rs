use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::config::INSERT_CHUNK_SIZE;
use crate::db::models::NewsRow;
use crate::error::Result;
use crate::types::{BatchOutcome, NewsRecord};

/// Persistence seam for normalized news.
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Creates the `news` table and its index. Safe to call on an existing store.
    async fn create_schema_if_absent(&self) -> Result<()>;

    /// Writes `records` in one transaction, chunked into multi-row
    /// `INSERT OR IGNORE` statements. Existing `(ticker, id)` rows are left
    /// untouched. Any failure rolls back the whole batch.
    async fn upsert_batch(&self, records: &[NewsRecord]) -> Result<BatchOutcome>;
}

#[derive(Debug, Clone)]
pub struct SqliteNewsStore {
    pool: SqlitePool,
}

impl SqliteNewsStore {
    pub async fn open(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    pub async fn count_for_ticker(&self, ticker: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news WHERE ticker = ?")
            .bind(ticker)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Newest first.
    pub async fn latest_for_ticker(&self, ticker: &str, limit: i64) -> Result<Vec<NewsRow>> {
        let rows = sqlx::query_as::<_, NewsRow>(
            r#"
            SELECT ticker, id, published_at, source, title, description, url, engagement, premium
            FROM news
            WHERE ticker = ?
            ORDER BY published_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(ticker)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl NewsStore for SqliteNewsStore {
    async fn create_schema_if_absent(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn upsert_batch(&self, records: &[NewsRecord]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        if records.is_empty() {
            return Ok(outcome);
        }

        // Dropping `tx` on an early return rolls back every chunk of this batch.
        let mut tx = self.pool.begin().await?;

        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO news \
                 (ticker, id, published_at, source, title, description, url, engagement, premium) ",
            );
            qb.push_values(chunk, |mut row, r| {
                row.push_bind(r.ticker.as_str())
                    .push_bind(r.id)
                    .push_bind(r.published_at)
                    .push_bind(r.source.as_deref())
                    .push_bind(r.title.as_str())
                    .push_bind(r.description.as_deref())
                    .push_bind(r.url.as_deref())
                    .push_bind(r.engagement)
                    .push_bind(r.premium);
            });

            let result = qb.build().execute(&mut *tx).await?;
            outcome.chunks += 1;
            outcome.inserted += result.rows_affected();
        }

        tx.commit().await?;
        debug!(
            records = records.len(),
            chunks = outcome.chunks,
            inserted = outcome.inserted,
            "news batch committed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
impl SqliteNewsStore {
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Single-connection in-memory store with the schema applied.
    pub(crate) async fn in_memory() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let store = Self { pool };
        store.create_schema_if_absent().await.expect("schema");
        store
    }
}
