//! Database operations for the `comments` table.

use chrono::{DateTime, Utc};
use replyguard_core::{
    AspectResult, CommentRecord, CommentStatus, NaturalId, NewComment, PostStatus, RecordFilter,
};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const COMMENT_COLUMNS: &str = "id, natural_id, source, author, body, created_at, permalink, \
     tracked_term, sentiment, confidence, explanation, aspects, draft_response, final_response, \
     status, email_sent, email_recipient, post_status, post_error, inserted_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `comments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub natural_id: String,
    pub source: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub permalink: String,
    pub tracked_term: String,
    pub sentiment: String,
    pub confidence: f64,
    pub explanation: String,
    pub aspects: Value,
    pub draft_response: Option<String>,
    pub final_response: Option<String>,
    pub status: String,
    pub email_sent: bool,
    pub email_recipient: Option<String>,
    pub post_status: String,
    pub post_error: Option<String>,
    pub inserted_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for CommentRecord {
    type Error = DbError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        let decode = |e: replyguard_core::CoreError| DbError::Decode(e.to_string());
        let aspects: Vec<AspectResult> = serde_json::from_value(row.aspects)?;

        Ok(CommentRecord {
            id: row.id,
            natural_id: NaturalId::parse(&row.natural_id).map_err(decode)?,
            source: row.source,
            author: row.author,
            body: row.body,
            created_at: row.created_at,
            permalink: row.permalink,
            tracked_term: row.tracked_term,
            sentiment: row.sentiment.parse().map_err(decode)?,
            confidence: row.confidence,
            explanation: row.explanation,
            aspects,
            draft_response: row.draft_response,
            final_response: row.final_response,
            status: row.status.parse().map_err(decode)?,
            email_sent: row.email_sent,
            email_recipient: row.email_recipient,
            post_status: row.post_status.parse().map_err(decode)?,
            post_error: row.post_error,
            inserted_at: row.inserted_at,
        })
    }
}

/// Statuses from which a move to `next` is allowed.
fn statuses_allowing(next: CommentStatus) -> Vec<String> {
    [
        CommentStatus::New,
        CommentStatus::PendingApproval,
        CommentStatus::Approved,
        CommentStatus::Rejected,
    ]
    .into_iter()
    .filter(|current| current.can_transition_to(next))
    .map(|s| s.as_str().to_string())
    .collect()
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Whether a row exists for the canonical id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn comment_exists(pool: &PgPool, natural_id: &NaturalId) -> Result<bool, DbError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM comments WHERE natural_id = $1)")
            .bind(natural_id.as_str())
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

/// Insert a comment, or update the mutable analysis fields of the existing row.
///
/// A stored `approved`/`rejected` status is never overwritten, and
/// `pending_approval` is never moved back to `new`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_comment(pool: &PgPool, comment: &NewComment) -> Result<CommentRecord, DbError> {
    let item = &comment.item;
    let aspects = serde_json::to_value(&comment.analysis.aspects)?;

    let sql = format!(
        "INSERT INTO comments \
             (id, natural_id, source, author, body, created_at, permalink, tracked_term, \
              sentiment, confidence, explanation, aspects, draft_response, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (natural_id) DO UPDATE SET \
             tracked_term   = EXCLUDED.tracked_term, \
             sentiment      = EXCLUDED.sentiment, \
             confidence     = EXCLUDED.confidence, \
             explanation    = EXCLUDED.explanation, \
             aspects        = EXCLUDED.aspects, \
             draft_response = EXCLUDED.draft_response, \
             status = CASE \
                 WHEN comments.status IN ('approved', 'rejected') THEN comments.status \
                 WHEN comments.status = 'pending_approval' AND EXCLUDED.status = 'new' \
                     THEN comments.status \
                 ELSE EXCLUDED.status \
             END, \
             updated_at = NOW() \
         RETURNING {COMMENT_COLUMNS}"
    );

    let row = sqlx::query_as::<_, CommentRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(item.natural_id.as_str())
        .bind(&item.source)
        .bind(&item.author)
        .bind(&item.body)
        .bind(item.created_at)
        .bind(&item.permalink)
        .bind(&comment.tracked_term)
        .bind(comment.analysis.sentiment.as_str())
        .bind(comment.analysis.confidence)
        .bind(&comment.analysis.explanation)
        .bind(aspects)
        .bind(comment.draft_response.as_deref())
        .bind(comment.status.as_str())
        .fetch_one(pool)
        .await?;

    CommentRecord::try_from(row)
}

/// Fetch a single comment by canonical id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] if
/// the stored row holds an unknown enum value.
pub async fn get_comment(
    pool: &PgPool,
    natural_id: &NaturalId,
) -> Result<Option<CommentRecord>, DbError> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE natural_id = $1");
    let row = sqlx::query_as::<_, CommentRow>(&sql)
        .bind(natural_id.as_str())
        .fetch_optional(pool)
        .await?;

    row.map(CommentRecord::try_from).transpose()
}

/// Move a comment to `status` if the transition is monotone.
///
/// Returns `false` when no row exists or the transition is refused.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_status(
    pool: &PgPool,
    natural_id: &NaturalId,
    status: CommentStatus,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE comments SET status = $2, updated_at = NOW() \
         WHERE natural_id = $1 AND status = ANY($3)",
    )
    .bind(natural_id.as_str())
    .bind(status.as_str())
    .bind(statuses_allowing(status))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Record the human decision. Rejection clears `final_response`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_approval(
    pool: &PgPool,
    natural_id: &NaturalId,
    approved: bool,
    final_response: Option<&str>,
) -> Result<bool, DbError> {
    let status = if approved {
        CommentStatus::Approved
    } else {
        CommentStatus::Rejected
    };
    let final_response = if approved { final_response } else { None };

    let result = sqlx::query(
        "UPDATE comments SET status = $2, final_response = $3, updated_at = NOW() \
         WHERE natural_id = $1 AND status = ANY($4)",
    )
    .bind(natural_id.as_str())
    .bind(status.as_str())
    .bind(final_response)
    .bind(statuses_allowing(status))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_email_sent(
    pool: &PgPool,
    natural_id: &NaturalId,
    recipient: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE comments SET email_sent = true, email_recipient = $2, updated_at = NOW() \
         WHERE natural_id = $1",
    )
    .bind(natural_id.as_str())
    .bind(recipient)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_post_status(
    pool: &PgPool,
    natural_id: &NaturalId,
    status: PostStatus,
    error: Option<&str>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE comments SET post_status = $2, post_error = $3, updated_at = NOW() \
         WHERE natural_id = $1",
    )
    .bind(natural_id.as_str())
    .bind(status.as_str())
    .bind(error)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// List comments matching `filter`, newest first (failed posts oldest first).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_comments(
    pool: &PgPool,
    filter: &RecordFilter,
    limit: i64,
) -> Result<Vec<CommentRecord>, DbError> {
    let rows = match filter {
        RecordFilter::Status(status) => {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE status = $1 \
                 ORDER BY inserted_at DESC, id DESC LIMIT $2"
            );
            sqlx::query_as::<_, CommentRow>(&sql)
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        RecordFilter::Sentiment(sentiment) => {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE sentiment = $1 \
                 ORDER BY inserted_at DESC, id DESC LIMIT $2"
            );
            sqlx::query_as::<_, CommentRow>(&sql)
                .bind(sentiment.as_str())
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        RecordFilter::Term(term) => {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE lower(tracked_term) = lower($1) \
                 ORDER BY inserted_at DESC, id DESC LIMIT $2"
            );
            sqlx::query_as::<_, CommentRow>(&sql)
                .bind(term)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        RecordFilter::FailedPosts => {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments \
                 WHERE post_status = 'failed' AND status = 'approved' \
                 ORDER BY inserted_at ASC, id ASC LIMIT $1"
            );
            sqlx::query_as::<_, CommentRow>(&sql)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        RecordFilter::Recent => {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments \
                 ORDER BY inserted_at DESC, id DESC LIMIT $1"
            );
            sqlx::query_as::<_, CommentRow>(&sql)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
    };

    rows.into_iter().map(CommentRecord::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_is_allowed_from_open_statuses_only() {
        let allowed = statuses_allowing(CommentStatus::Approved);
        assert!(allowed.contains(&"new".to_string()));
        assert!(allowed.contains(&"pending_approval".to_string()));
        assert!(allowed.contains(&"approved".to_string()));
        assert!(!allowed.contains(&"rejected".to_string()));
    }

    #[test]
    fn nothing_moves_back_to_new() {
        assert_eq!(statuses_allowing(CommentStatus::New), vec!["new".to_string()]);
    }
}
