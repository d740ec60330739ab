//! SQLite connection handling and schema migrations.
//!
//! The connection is opened once at process start and passed around
//! explicitly. Every query goes through `Connection::call` which runs
//! on the connection's own thread, so each lifecycle operation gets
//! its own short unit of work.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection as SyncConnection;
use tokio_rusqlite::Connection;

const DB_FILE_NAME: &str = "draftly.sqlite";

// Each entry is applied once, in order, and bumps `user_version`.
const MIGRATIONS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS users (
        email TEXT PRIMARY KEY,
        refresh_token TEXT NOT NULL,
        preferred_style TEXT
    );

    CREATE TABLE IF NOT EXISTS user_session (
        token TEXT PRIMARY KEY,
        user_email TEXT NOT NULL,
        expires_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS user_session_email_idx ON user_session(user_email);
    ",
    r"
    CREATE TABLE IF NOT EXISTS draft (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_email TEXT NOT NULL,
        thread_id TEXT NOT NULL,
        recipient_email TEXT NOT NULL,
        subject TEXT NOT NULL,
        draft_body TEXT NOT NULL,
        thread_context TEXT,
        status TEXT NOT NULL,
        provider_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS draft_one_open_per_thread
        ON draft(user_email, thread_id) WHERE status = 'DRAFT';
    ",
];

/// Open the database stored under `db_path`, creating the file if needed.
pub async fn async_db(db_path: &str) -> Result<Connection> {
    let file = Path::new(db_path).join(DB_FILE_NAME);
    let db = Connection::open(&file)
        .await
        .with_context(|| format!("Failed to open database at {}", file.display()))?;
    Ok(db)
}

/// Create the schema from scratch. Safe to call on an existing database.
pub fn initialize_db(conn: &mut SyncConnection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    migrate_db(conn)
}

/// Apply any migrations newer than the database's `user_version`.
pub fn migrate_db(conn: &mut SyncConnection) -> Result<(), rusqlite::Error> {
    let current: usize = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (idx, migration) in MIGRATIONS.iter().enumerate().skip(current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration)?;
        tx.pragma_update(None, "user_version", idx + 1)?;
        tx.commit()?;
        tracing::info!("Applied db migration {}", idx + 1);
    }

    Ok(())
}
