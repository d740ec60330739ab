use anyhow::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::{Connection, params};
use uuid::Uuid;

use crate::core::PipelineError;

/// Issue a new token for the user, replacing any previous session.
pub async fn create_session(db: &Connection, email: &str, ttl_hours: i64) -> Result<String, Error> {
    let token = Uuid::new_v4().to_string();
    let expires_at = (Utc::now() + Duration::hours(ttl_hours)).to_rfc3339();
    let email = email.to_string();
    let session_token = token.clone();

    db.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM user_session WHERE user_email = ?1", [&email])?;
        tx.execute(
            "INSERT INTO user_session (token, user_email, expires_at) VALUES (?1, ?2, ?3)",
            params![session_token, email, expires_at],
        )?;
        tx.commit()?;
        Ok(())
    })
    .await?;

    Ok(token)
}

/// Returns the email of the session's owner.
pub async fn validate_session(db: &Connection, token: &str) -> Result<String, PipelineError> {
    let lookup = token.to_string();
    let row: Option<(String, String)> = db
        .call(move |conn| {
            let row = conn
                .query_row(
                    "SELECT user_email, expires_at FROM user_session WHERE token = ?1",
                    [&lookup],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(row)
        })
        .await?;

    let Some((email, expires_at)) = row else {
        return Err(PipelineError::Unauthenticated(String::from("Invalid session")));
    };

    // An unparseable expiry is treated as expired
    let expired = DateTime::parse_from_rfc3339(&expires_at)
        .map(|expiry| expiry.with_timezone(&Utc) <= Utc::now())
        .unwrap_or(true);

    if expired {
        delete_session(db, token).await?;
        return Err(PipelineError::Unauthenticated(String::from(
            "Session expired. Please log in again.",
        )));
    }

    Ok(email)
}

pub async fn delete_session(db: &Connection, token: &str) -> Result<(), Error> {
    let token = token.to_string();
    db.call(move |conn| {
        conn.execute("DELETE FROM user_session WHERE token = ?1", [&token])?;
        Ok(())
    })
    .await?;
    Ok(())
}
