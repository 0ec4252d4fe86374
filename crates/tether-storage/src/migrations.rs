//! Database migrations
//!
//! Schema: settings, profiles, session_slots

use crate::Result;
use rusqlite::Connection;

const SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<i32, _> =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        });

    match result {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(rusqlite::Error::SqliteFailure(_, _)) => {
            // Table doesn't exist yet
            conn.execute(
                "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
                [],
            )?;
            conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])?;
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v1: Initial schema");

    // Key/value settings, also home of persistent counters
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#,
    )?;

    // Profiles that own on-disk data. Incognito profiles never appear here.
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            name TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );
    "#,
    )?;

    // Session-restore slots addressed by persistence id
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS session_slots (
            profile_name TEXT NOT NULL,
            persistence_id TEXT NOT NULL,
            key_digest TEXT,
            payload BLOB NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (profile_name, persistence_id)
        );

        CREATE INDEX IF NOT EXISTS idx_session_slots_profile ON session_slots(profile_name);
    "#,
    )?;

    Ok(())
}
