//! Persistence for the draft lifecycle.
//!
//! A (user, thread) pair has at most one row in `DRAFT` status. Saving
//! again updates that row in place; finalizing moves it to `SENT` and
//! drops the context snapshot. Sent rows are kept as history.

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, types::Type};
use tokio_rusqlite::{Connection, params};

use super::models::{DraftRecord, DraftStatus, FinalizeOutcome, reply_recipient};
use crate::context::ThreadContext;
use crate::core::PipelineError;

fn draft_from_row(row: &Row) -> Result<DraftRecord, rusqlite::Error> {
    let status: String = row.get(7)?;
    let status = status
        .parse::<DraftStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.into()))?;

    Ok(DraftRecord {
        id: row.get(0)?,
        user_email: row.get(1)?,
        thread_id: row.get(2)?,
        recipient_email: row.get(3)?,
        subject: row.get(4)?,
        draft_body: row.get(5)?,
        thread_context: row.get(6)?,
        status,
        provider_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Create or update the open draft for a thread, returning its id.
/// Recipient and subject come from the initiating message.
pub async fn save_draft(
    db: &Connection,
    user_email: &str,
    thread_id: &str,
    context: &ThreadContext,
    draft_body: &str,
) -> Result<i64, PipelineError> {
    let recipient = reply_recipient(context, user_email).ok_or_else(|| {
        PipelineError::Validation(format!("Thread {} has no messages", thread_id))
    })?;
    let subject = context
        .initiating()
        .map(|m| m.subject.clone())
        .unwrap_or_default();
    let snapshot = serde_json::to_string(context).map_err(anyhow::Error::from)?;

    let user_email = user_email.to_string();
    let thread_id = thread_id.to_string();
    let draft_body = draft_body.to_string();
    let now = Utc::now().to_rfc3339();

    let id = db
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM draft WHERE user_email = ?1 AND thread_id = ?2 AND status = ?3",
                    params![user_email, thread_id, DraftStatus::Draft.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let id = match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE draft
                         SET thread_context = ?1, draft_body = ?2, recipient_email = ?3,
                             subject = ?4, updated_at = ?5
                         WHERE id = ?6",
                        params![snapshot, draft_body, recipient, subject, now, id],
                    )?;
                    id
                }
                None => {
                    tx.execute(
                        "INSERT INTO draft (user_email, thread_id, recipient_email, subject,
                                            draft_body, thread_context, status, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                        params![
                            user_email,
                            thread_id,
                            recipient,
                            subject,
                            draft_body,
                            snapshot,
                            DraftStatus::Draft.as_str(),
                            now
                        ],
                    )?;
                    tx.last_insert_rowid()
                }
            };
            tx.commit()?;
            Ok(id)
        })
        .await?;

    tracing::debug!("Saved draft {}", id);
    Ok(id)
}

/// Mark the open draft for a thread as sent. A thread without an open
/// draft is reported as `FinalizeOutcome::NotFound`.
pub async fn finalize_draft(
    db: &Connection,
    user_email: &str,
    thread_id: &str,
    provider_id: Option<&str>,
) -> Result<FinalizeOutcome, PipelineError> {
    let user_email = user_email.to_string();
    let thread_id = thread_id.to_string();
    let provider_id = provider_id.map(str::to_string);
    let now = Utc::now().to_rfc3339();

    let updated = db
        .call(move |conn| {
            let count = conn.execute(
                "UPDATE draft
                 SET thread_context = NULL, status = ?1, provider_id = ?2, updated_at = ?3
                 WHERE user_email = ?4 AND thread_id = ?5 AND status = ?6",
                params![
                    DraftStatus::Sent.as_str(),
                    provider_id,
                    now,
                    user_email,
                    thread_id,
                    DraftStatus::Draft.as_str()
                ],
            )?;
            Ok(count)
        })
        .await?;

    if updated == 0 {
        Ok(FinalizeOutcome::NotFound)
    } else {
        Ok(FinalizeOutcome::Finalized)
    }
}

/// The context snapshot of the open draft, if there is one.
pub async fn load_context(
    db: &Connection,
    user_email: &str,
    thread_id: &str,
) -> Result<Option<ThreadContext>, PipelineError> {
    let user_email = user_email.to_string();
    let thread_id = thread_id.to_string();

    let snapshot: Option<String> = db
        .call(move |conn| {
            let snapshot: Option<Option<String>> = conn
                .query_row(
                    "SELECT thread_context FROM draft
                     WHERE user_email = ?1 AND thread_id = ?2 AND status = ?3",
                    params![user_email, thread_id, DraftStatus::Draft.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(snapshot.flatten())
        })
        .await?;

    let Some(snapshot) = snapshot else {
        return Ok(None);
    };

    match serde_json::from_str(&snapshot) {
        Ok(context) => Ok(Some(context)),
        Err(e) => {
            tracing::warn!("Ignoring unreadable context snapshot: {}", e);
            Ok(None)
        }
    }
}

/// The most recent draft record for a thread, open or sent.
pub async fn find_draft(
    db: &Connection,
    user_email: &str,
    thread_id: &str,
) -> Result<Option<DraftRecord>, PipelineError> {
    let user_email = user_email.to_string();
    let thread_id = thread_id.to_string();

    let record = db
        .call(move |conn| {
            let record = conn
                .query_row(
                    "SELECT id, user_email, thread_id, recipient_email, subject, draft_body,
                            thread_context, status, provider_id, created_at, updated_at
                     FROM draft
                     WHERE user_email = ?1 AND thread_id = ?2
                     ORDER BY id DESC
                     LIMIT 1",
                    params![user_email, thread_id],
                    draft_from_row,
                )
                .optional()?;
            Ok(record)
        })
        .await?;

    Ok(record)
}
