//! Reddit adapter: OAuth client implementing the `SourceReader` and `Poster`
//! contracts from `replyguard-core`.

mod client;
mod error;
mod helpers;
mod poster;
mod source;
mod types;

pub use client::{RedditClient, RedditConfig, MAX_LISTING_LIMIT};
pub use error::RedditError;
pub use helpers::normalize_permalink;
