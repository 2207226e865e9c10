use thiserror::Error;

/// A feed item that is missing structure the normalizer cannot do without.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedItem {
    #[error("missing or invalid field `{0}`")]
    MissingField(&'static str),

    #[error("origin id {0:?} does not start with the expected prefix")]
    MissingIdPrefix(String),

    #[error("origin id {0:?} is not numeric")]
    InvalidId(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected feed response: {0}")]
    FeedShape(String),

    #[error("Malformed feed item: {0}")]
    MalformedItem(#[from] MalformedItem),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Feed request failed or the response did not look like a feed page.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Http(_) | AppError::FeedShape(_))
    }

    pub fn is_store(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Migration(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
