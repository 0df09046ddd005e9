//! Approval and query commands.

use replyguard_core::{CommentStatus, NaturalId, RecordFilter, RecordStore, Sentiment};
use replyguard_engine::{ApprovalDecision, ResolveOutcome, Workflow};

const PREVIEW_CHARS: usize = 60;

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS - 1).collect();
    format!("{cut}…")
}

fn print_resolution(outcome: &ResolveOutcome) {
    let verdict = if outcome.approved { "approved" } else { "rejected" };
    println!("{}: {verdict}", outcome.natural_id);
    if let Some(text) = outcome.final_response.as_deref() {
        println!("reply: {text}");
    }
    match (outcome.posted, outcome.post_error.as_deref()) {
        (Some(true), _) => println!("reply posted"),
        (Some(false), Some(error)) => {
            println!("post failed: {error}; retry with `replyguard-cli retry-posts`");
        }
        (Some(false), None) => println!("post failed"),
        (None, _) => {}
    }
}

/// # Errors
///
/// Returns an error for a malformed id, when nothing is pending for it, or on
/// storage failure.
pub(crate) async fn approve(
    workflow: &Workflow,
    raw_id: &str,
    edited_response: Option<String>,
) -> anyhow::Result<()> {
    let natural_id = NaturalId::parse(raw_id)?;
    let outcome = workflow
        .resolve(&natural_id, ApprovalDecision::approve(edited_response))
        .await?;
    print_resolution(&outcome);
    Ok(())
}

/// # Errors
///
/// See [`approve`].
pub(crate) async fn reject(workflow: &Workflow, raw_id: &str) -> anyhow::Result<()> {
    let natural_id = NaturalId::parse(raw_id)?;
    let outcome = workflow
        .resolve(&natural_id, ApprovalDecision::reject())
        .await?;
    print_resolution(&outcome);
    Ok(())
}

/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn list(
    workflow: &Workflow,
    status: Option<CommentStatus>,
    sentiment: Option<Sentiment>,
    term: Option<String>,
    limit: i64,
) -> anyhow::Result<()> {
    let filter = match (status, sentiment, term) {
        (Some(status), _, _) => RecordFilter::Status(status),
        (None, Some(sentiment), _) => RecordFilter::Sentiment(sentiment),
        (None, None, Some(term)) => RecordFilter::Term(term),
        (None, None, None) => RecordFilter::Recent,
    };
    let records = workflow.records().list(&filter, limit.max(1)).await?;

    if records.is_empty() {
        println!("no comments found");
        return Ok(());
    }

    println!(
        "{:<12}{:<18}{:<10}{:<18}{:<10}BODY",
        "ID", "CREATED", "SENTIMENT", "STATUS", "POST"
    );
    for record in &records {
        println!(
            "{:<12}{:<18}{:<10}{:<18}{:<10}{}",
            record.natural_id.as_str(),
            record.created_at.format("%Y-%m-%d %H:%M").to_string(),
            record.sentiment.as_str(),
            record.status.as_str(),
            record.post_status.as_str(),
            preview(&record.body)
        );
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the snapshot store cannot be read.
pub(crate) async fn pending(workflow: &Workflow) -> anyhow::Result<()> {
    let pending = workflow.pending().await?;
    if pending.is_empty() {
        println!("nothing awaiting approval");
        return Ok(());
    }

    for state in &pending {
        println!(
            "{} [{}] u/{} in r/{}",
            state.natural_id, state.tracked_term, state.item.author, state.item.source
        );
        println!("  comment: {}", preview(&state.item.body));
        println!(
            "  draft:   {}",
            state.draft_response.as_deref().map(preview).unwrap_or_default()
        );
        println!("  link:    {}", state.item.permalink);
    }
    println!("{} awaiting approval", pending.len());
    Ok(())
}

/// # Errors
///
/// Returns an error if the failed posts cannot be listed.
pub(crate) async fn retry_posts(workflow: &Workflow, limit: i64) -> anyhow::Result<()> {
    let summary = workflow.retry_failed_posts(limit.max(1)).await?;
    println!(
        "retried {} post(s): {} posted, {} failed",
        summary.attempted, summary.posted, summary.failed
    );
    Ok(())
}
