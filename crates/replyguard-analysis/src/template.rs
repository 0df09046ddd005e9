use async_trait::async_trait;
use replyguard_core::{ExternalError, Item, ResponseDrafter, FALLBACK_RESPONSE};

/// Drafter that never calls out: greets the author and appends the
/// boilerplate reply.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateDrafter;

impl TemplateDrafter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn render(item: &Item) -> String {
        let author = item.author.trim();
        if author.is_empty() || author == "[deleted]" {
            FALLBACK_RESPONSE.to_string()
        } else {
            format!("Hi u/{author}, {FALLBACK_RESPONSE}")
        }
    }
}

#[async_trait]
impl ResponseDrafter for TemplateDrafter {
    async fn draft(&self, item: &Item) -> Result<String, ExternalError> {
        Ok(Self::render(item))
    }
}
