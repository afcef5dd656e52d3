//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use arrowbot_core::error::{ArrowError, Result};

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ArrowError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ArrowError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: conversation_log");
    }

    Ok(())
}

/// Version 1: exchanges and feedback.
///
/// `seq` orders rows written within the same millisecond. Feedback has no
/// foreign key to exchanges.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS exchanges (
            seq             INTEGER PRIMARY KEY AUTOINCREMENT,
            id              TEXT NOT NULL UNIQUE,
            user_message    TEXT NOT NULL,
            bot_response    TEXT NOT NULL,
            session_id      TEXT NOT NULL,
            timestamp_ms    INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_exchanges_session
            ON exchanges (session_id, timestamp_ms DESC, seq DESC);

        CREATE INDEX IF NOT EXISTS idx_exchanges_timestamp
            ON exchanges (timestamp_ms DESC, seq DESC);

        CREATE TABLE IF NOT EXISTS feedback (
            seq             INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id      TEXT,
            rating          REAL NOT NULL,
            feedback_text   TEXT NOT NULL DEFAULT '',
            timestamp_ms    INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feedback_message
            ON feedback (message_id);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'conversation_log');
        ",
    )
    .map_err(|e| ArrowError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}
