use anyhow::{Error, Result};
use rusqlite::OptionalExtension;
use tokio_rusqlite::{Connection, params};

/// Register a user or replace their refresh token. The stored style
/// preference is kept.
pub async fn upsert_user(db: &Connection, email: &str, refresh_token: &str) -> Result<(), Error> {
    let email = email.to_string();
    let refresh_token = refresh_token.to_string();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO users (email, refresh_token) VALUES (?1, ?2)
             ON CONFLICT(email) DO UPDATE SET refresh_token = excluded.refresh_token",
            params![email, refresh_token],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}

pub async fn find_refresh_token(db: &Connection, email: &str) -> Result<Option<String>, Error> {
    let email = email.to_string();
    let token = db
        .call(move |conn| {
            let token = conn
                .query_row(
                    "SELECT refresh_token FROM users WHERE email = ?1",
                    [&email],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(token)
        })
        .await?;
    Ok(token)
}

pub async fn get_preferred_style(db: &Connection, email: &str) -> Result<Option<String>, Error> {
    let email = email.to_string();
    let style = db
        .call(move |conn| {
            let style: Option<Option<String>> = conn
                .query_row(
                    "SELECT preferred_style FROM users WHERE email = ?1",
                    [&email],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(style.flatten())
        })
        .await?;
    Ok(style)
}

/// Returns false if the user doesn't exist.
pub async fn set_preferred_style(db: &Connection, email: &str, style: &str) -> Result<bool, Error> {
    let email = email.to_string();
    let style = style.to_string();
    let updated = db
        .call(move |conn| {
            let count = conn.execute(
                "UPDATE users SET preferred_style = ?1 WHERE email = ?2",
                params![style, email],
            )?;
            Ok(count > 0)
        })
        .await?;
    Ok(updated)
}

pub async fn find_all_user_emails(db: &Connection) -> Result<Vec<String>, Error> {
    let emails = db
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT email FROM users ORDER BY email")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .filter_map(Result::ok)
                .collect::<Vec<String>>();
            Ok(rows)
        })
        .await?;
    Ok(emails)
}
