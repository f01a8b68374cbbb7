//! Database schema migrations.
//!
//! The schema is a single key/value table: one row per conversation key,
//! holding the full serialized message history. Writing the whole history
//! in one upsert keeps every mutation untorn.

use rusqlite::Connection;
use tracing::info;

use huddle_core::error::HuddleError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), HuddleError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| HuddleError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| HuddleError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: conversations");
    }

    Ok(())
}

/// Version 1: the conversations key/value table.
fn apply_v1(conn: &Connection) -> Result<(), HuddleError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS conversations (
            key         TEXT PRIMARY KEY NOT NULL,
            history     TEXT NOT NULL DEFAULT '[]',
            updated_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'conversations');
        ",
    )
    .map_err(|e| HuddleError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}
