use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, Result};

/// Query parameters of one `streams/contents` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedQuery<'a> {
    #[serde(rename = "streamId")]
    pub stream_id: &'a str,
    pub count: u32,
    /// Empty on the first request.
    pub continuation: &'a str,
}

/// Transport seam for the feed API.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn get(&self, endpoint: &str, query: &FeedQuery<'_>) -> Result<Value>;
}

/// reqwest-backed client. One instance can serve many scrapers.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    http: reqwest::Client,
}

impl HttpFeedClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn get(&self, endpoint: &str, query: &FeedQuery<'_>) -> Result<Value> {
        debug!(
            stream_id = query.stream_id,
            continuation = query.continuation,
            "fetching feed page"
        );
        let resp = self
            .http
            .get(endpoint)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

/// One page of the feed: raw items plus the cursor for the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub items: Vec<Value>,
    pub continuation: Option<String>,
}

impl FeedPage {
    /// Checks the `{ items: [...], continuation?: string }` shape.
    pub fn from_value(mut v: Value) -> Result<Self> {
        let items = match v.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(AppError::FeedShape(
                    "`items` is not an array".to_string(),
                ))
            }
            None => return Err(AppError::FeedShape("missing `items`".to_string())),
        };

        let continuation = match v.get("continuation") {
            None | Some(Value::Null) => None,
            Some(Value::String(c)) => Some(c.clone()),
            Some(other) => {
                return Err(AppError::FeedShape(format!(
                    "`continuation` is not a string: {other}"
                )))
            }
        };

        Ok(Self { items, continuation })
    }
}
