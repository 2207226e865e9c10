//! Row type of the `news` table (see migrations/0001_news.sql).
//! Used by sqlx for typed reads.

use crate::types::NewsRecord;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct NewsRow {
    pub ticker: String,
    pub id: i64,
    pub published_at: i64,
    pub source: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub engagement: Option<i64>,
    pub premium: bool,
}

impl From<NewsRow> for NewsRecord {
    fn from(row: NewsRow) -> Self {
        NewsRecord {
            ticker: row.ticker,
            id: row.id,
            published_at: row.published_at,
            source: row.source,
            title: row.title,
            description: row.description,
            url: row.url,
            engagement: row.engagement,
            premium: row.premium,
        }
    }
}
