//! Conversion from Reddit listing children into domain [`Item`]s.

use chrono::{DateTime, Utc};
use replyguard_core::{Item, NaturalId};

use crate::types::Thing;

const REDDIT_ORIGIN: &str = "https://www.reddit.com";
const SEARCH_SNIPPET_CHARS: usize = 2_000;

/// Prefix relative permalinks with the site origin.
pub fn normalize_permalink(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else if permalink.starts_with('/') {
        format!("{REDDIT_ORIGIN}{permalink}")
    } else {
        format!("{REDDIT_ORIGIN}/{permalink}")
    }
}

fn is_removed(text: &str) -> bool {
    matches!(text.trim(), "" | "[deleted]" | "[removed]")
}

#[allow(clippy::cast_possible_truncation)]
fn from_epoch(created_utc: f64) -> Option<DateTime<Utc>> {
    if !created_utc.is_finite() {
        return None;
    }
    DateTime::from_timestamp(created_utc.trunc() as i64, 0)
}

/// Convert a comment (`t1`) or link (`t3`) into an [`Item`].
///
/// Returns `None` for removed content, unknown kinds, and children missing an
/// id, timestamp or permalink; callers log and skip those.
pub(crate) fn to_item(thing: &Thing, fallback_source: &str) -> Option<Item> {
    let data = &thing.data;
    let natural_id = NaturalId::parse(data.id.as_deref()?).ok()?;
    let created_at = from_epoch(data.created_utc?)?;
    let permalink = normalize_permalink(data.permalink.as_deref()?);

    let body = match thing.kind.as_str() {
        "t1" => {
            let body = data.body.as_deref()?;
            if is_removed(body) {
                return None;
            }
            body.trim().to_string()
        }
        "t3" => {
            let title = data.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
            match data.selftext.as_deref() {
                Some(text) if !is_removed(text) => {
                    let snippet: String = text.trim().chars().take(SEARCH_SNIPPET_CHARS).collect();
                    format!("{title}\n\n{snippet}")
                }
                _ => title.to_string(),
            }
        }
        _ => return None,
    };

    Some(Item {
        natural_id,
        source: data
            .subreddit
            .clone()
            .unwrap_or_else(|| fallback_source.to_string()),
        author: data
            .author
            .clone()
            .unwrap_or_else(|| "[deleted]".to_string()),
        body,
        created_at,
        permalink,
    })
}
