use async_trait::async_trait;
use chrono::{DateTime, Utc};
use replyguard_core::{ExternalError, Item, SourceReader, TimeWindow};

use crate::client::RedditClient;

#[async_trait]
impl SourceReader for RedditClient {
    async fn fetch_recent(
        &self,
        source: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Item>, ExternalError> {
        let items = self.list_new_comments(source, limit).await?;
        let fetched = items.len();
        let fresh: Vec<Item> = items
            .into_iter()
            .filter(|item| item.created_at > since)
            .collect();

        tracing::debug!(
            subreddit = source,
            fetched,
            fresh = fresh.len(),
            "fetched recent comments"
        );
        Ok(fresh)
    }

    async fn search(
        &self,
        query: &str,
        source: &str,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<Item>, ExternalError> {
        Ok(self.search_posts(query, source, window, limit).await?)
    }
}
