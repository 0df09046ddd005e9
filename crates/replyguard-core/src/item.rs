use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::NaturalId;

/// A single fetched post or comment. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub natural_id: NaturalId,
    /// Channel the item was fetched from (a subreddit name).
    pub source: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub permalink: String,
}

impl Item {
    /// Case-insensitive substring match of `term` against the body.
    #[must_use]
    pub fn mentions(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        !needle.is_empty() && self.body.to_lowercase().contains(&needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(body: &str) -> Item {
        Item {
            natural_id: NaturalId::parse("abc123").unwrap(),
            source: "smallbusiness".to_string(),
            author: "someone".to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
            permalink: "https://www.reddit.com/r/smallbusiness/comments/x/y/abc123/".to_string(),
        }
    }

    #[test]
    fn mentions_is_case_insensitive() {
        assert!(item("I tried ACME Widgets last week").mentions("acme"));
        assert!(item("acme rocks").mentions("  Acme "));
    }

    #[test]
    fn mentions_rejects_missing_or_blank_term() {
        assert!(!item("nothing relevant").mentions("acme"));
        assert!(!item("acme").mentions("   "));
    }
}
