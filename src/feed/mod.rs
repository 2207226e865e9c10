pub mod client;
pub mod normalize;

pub use client::{FeedClient, FeedPage, FeedQuery, HttpFeedClient};
pub use normalize::normalize;
