//! Wire types for the subset of the Reddit API this crate touches.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub(crate) data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub(crate) children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thing {
    pub(crate) kind: String,
    pub(crate) data: ThingData,
}

/// Fields shared by comments (`t1`) and links (`t3`).
#[derive(Debug, Deserialize)]
pub(crate) struct ThingData {
    pub(crate) id: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) subreddit: Option<String>,
    pub(crate) body: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) selftext: Option<String>,
    pub(crate) permalink: Option<String>,
    pub(crate) created_utc: Option<f64>,
}

/// Envelope returned by `POST /api/comment` with `api_type=json`.
#[derive(Debug, Deserialize)]
pub(crate) struct CommentPostResponse {
    pub(crate) json: CommentPostJson,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentPostJson {
    #[serde(default)]
    pub(crate) errors: Vec<Vec<serde_json::Value>>,
}
