use async_trait::async_trait;
use replyguard_core::{ExternalError, NaturalId, Poster};

use crate::client::RedditClient;

#[async_trait]
impl Poster for RedditClient {
    async fn post_reply(&self, natural_id: &NaturalId, text: &str) -> Result<(), ExternalError> {
        Ok(self.reply(natural_id, text).await?)
    }
}
