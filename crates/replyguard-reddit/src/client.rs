//! OAuth client for the Reddit API.
//!
//! Holds a cached bearer token obtained with the `refresh_token` grant when a
//! user token is configured (required for replying), otherwise with the
//! application-only `client_credentials` grant (read-only).

use std::time::Duration;

use replyguard_core::{AppConfig, Item, NaturalId, TimeWindow};
use reqwest::{Client, Response, Url};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::RedditError;
use crate::helpers::to_item;
use crate::types::{CommentPostResponse, Listing, TokenResponse};

const DEFAULT_AUTH_BASE: &str = "https://www.reddit.com";
const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";
const DEFAULT_TOKEN_TTL_SECS: u64 = 3_600;
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Largest page the listing endpoints accept.
pub const MAX_LISTING_LIMIT: usize = 100;

#[derive(Clone)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub refresh_token: Option<String>,
    pub timeout: Duration,
}

impl RedditConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            client_id: config.reddit_client_id.clone(),
            client_secret: config.reddit_client_secret.clone(),
            user_agent: config.reddit_user_agent.clone(),
            refresh_token: config.reddit_refresh_token.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl std::fmt::Debug for RedditConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Reddit API client. Use [`RedditClient::new`] for production or
/// [`RedditClient::with_base_urls`] to point at a mock server in tests.
pub struct RedditClient {
    client: Client,
    config: RedditConfig,
    auth_base: Url,
    api_base: Url,
    token: Mutex<Option<CachedToken>>,
}

fn parse_base(url: &str) -> Result<Url, RedditError> {
    let normalised = format!("{}/", url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| RedditError::InvalidBaseUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

impl RedditClient {
    /// # Errors
    ///
    /// Returns [`RedditError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: RedditConfig) -> Result<Self, RedditError> {
        Self::with_base_urls(config, DEFAULT_AUTH_BASE, DEFAULT_API_BASE)
    }

    /// # Errors
    ///
    /// Returns [`RedditError::Http`] if the HTTP client cannot be constructed,
    /// or [`RedditError::InvalidBaseUrl`] if either URL does not parse.
    pub fn with_base_urls(
        config: RedditConfig,
        auth_base: &str,
        api_base: &str,
    ) -> Result<Self, RedditError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            auth_base: parse_base(auth_base)?,
            api_base: parse_base(api_base)?,
            config,
            token: Mutex::new(None),
        })
    }

    /// Whether a user-scoped token is configured, which replying requires.
    #[must_use]
    pub fn can_post(&self) -> bool {
        self.config.refresh_token.is_some()
    }

    async fn access_token(&self) -> Result<String, RedditError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn fetch_token(&self) -> Result<CachedToken, RedditError> {
        let url = self.auth_base.join("api/v1/access_token").map_err(|e| {
            RedditError::InvalidBaseUrl {
                url: self.auth_base.to_string(),
                reason: e.to_string(),
            }
        })?;

        let form: Vec<(&str, &str)> = match self.config.refresh_token.as_deref() {
            Some(refresh) => vec![("grant_type", "refresh_token"), ("refresh_token", refresh)],
            None => vec![("grant_type", "client_credentials")],
        };

        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if matches!(status.as_u16(), 400 | 401 | 403) {
            return Err(RedditError::Auth(format!(
                "token exchange failed with status {status}"
            )));
        }
        let response = error_for_status(response).await?;

        let body = response.text().await?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| RedditError::Deserialize {
                context: "access_token".to_string(),
                source: e,
            })?;

        let ttl = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS));
        tracing::debug!(
            grant = if self.can_post() { "refresh_token" } else { "client_credentials" },
            ttl_secs = ttl.as_secs(),
            "obtained Reddit access token"
        );

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_MARGIN),
        })
    }

    fn api_url(&self, path: &str) -> Result<Url, RedditError> {
        self.api_base
            .join(path.trim_start_matches('/'))
            .map_err(|e| RedditError::InvalidBaseUrl {
                url: self.api_base.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get_listing(
        &self,
        path: &str,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<Listing, RedditError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.api_url(path)?)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;

        if response.status().as_u16() == 401 {
            self.invalidate_token().await;
            return Err(RedditError::TokenRejected);
        }
        let response = error_for_status(response).await?;
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| RedditError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    /// Newest comments in `subreddit`, at most `limit` (capped at 100).
    ///
    /// # Errors
    ///
    /// Returns [`RedditError`] on transport, status, auth or decoding failures.
    pub async fn list_new_comments(
        &self,
        subreddit: &str,
        limit: usize,
    ) -> Result<Vec<Item>, RedditError> {
        let params = [
            ("limit", limit.clamp(1, MAX_LISTING_LIMIT).to_string()),
            ("raw_json", "1".to_string()),
        ];
        let listing = self
            .get_listing(
                &format!("r/{subreddit}/comments"),
                &params,
                &format!("r/{subreddit}/comments"),
            )
            .await?;

        Ok(collect_items(&listing, subreddit))
    }

    /// Search posts in `subreddit` within `window`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RedditError`] on transport, status, auth or decoding failures.
    pub async fn search_posts(
        &self,
        query: &str,
        subreddit: &str,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<Item>, RedditError> {
        let params = [
            ("q", query.to_string()),
            ("restrict_sr", "true".to_string()),
            ("sort", "new".to_string()),
            ("t", window.as_str().to_string()),
            ("limit", limit.clamp(1, MAX_LISTING_LIMIT).to_string()),
            ("type", "link".to_string()),
            ("raw_json", "1".to_string()),
        ];
        let listing = self
            .get_listing(
                &format!("r/{subreddit}/search"),
                &params,
                &format!("r/{subreddit}/search"),
            )
            .await?;

        Ok(collect_items(&listing, subreddit))
    }

    /// Reply to the comment identified by `natural_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RedditError::PostingDisabled`] without a refresh token,
    /// [`RedditError::Rejected`] if Reddit answers with an error list, or
    /// another [`RedditError`] on transport failures.
    pub async fn reply(&self, natural_id: &NaturalId, text: &str) -> Result<(), RedditError> {
        if !self.can_post() {
            return Err(RedditError::PostingDisabled);
        }

        let token = self.access_token().await?;
        let thing_id = natural_id.comment_fullname();
        let response = self
            .client
            .post(self.api_url("api/comment")?)
            .bearer_auth(token)
            .form(&[
                ("api_type", "json"),
                ("thing_id", thing_id.as_str()),
                ("text", text),
            ])
            .send()
            .await?;

        if response.status().as_u16() == 401 {
            self.invalidate_token().await;
            return Err(RedditError::TokenRejected);
        }
        let response = error_for_status(response).await?;
        let body = response.text().await?;
        let parsed: CommentPostResponse =
            serde_json::from_str(&body).map_err(|e| RedditError::Deserialize {
                context: "api/comment".to_string(),
                source: e,
            })?;

        if !parsed.json.errors.is_empty() {
            let detail = parsed
                .json
                .errors
                .iter()
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(": ")
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RedditError::Rejected(detail));
        }

        tracing::info!(thing_id = %thing_id, "posted reply");
        Ok(())
    }
}

fn collect_items(listing: &Listing, subreddit: &str) -> Vec<Item> {
    let total = listing.data.children.len();
    let items: Vec<Item> = listing
        .data
        .children
        .iter()
        .filter_map(|thing| to_item(thing, subreddit))
        .collect();

    if items.len() < total {
        tracing::debug!(
            subreddit,
            skipped = total - items.len(),
            "skipped removed or malformed listing children"
        );
    }
    items
}

async fn error_for_status(response: Response) -> Result<Response, RedditError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RedditError::Status {
        status: status.as_u16(),
        body,
    })
}
