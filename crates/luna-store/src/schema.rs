use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Non-fatal: in-memory databases have no WAL to checkpoint.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::debug!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS memories (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            kind               TEXT NOT NULL DEFAULT 'experience',
            content            TEXT NOT NULL,
            language           TEXT NOT NULL,
            importance         REAL NOT NULL,
            created_at         TEXT NOT NULL,
            last_accessed_at   TEXT NOT NULL,
            emotional_snapshot TEXT NOT NULL,
            cultural_context   TEXT
        );

        CREATE TABLE IF NOT EXISTS associations (
            memory_id     INTEGER NOT NULL REFERENCES memories(id),
            associated_id INTEGER NOT NULL REFERENCES memories(id),
            PRIMARY KEY (memory_id, associated_id)
        );

        CREATE INDEX IF NOT EXISTS idx_mem_importance ON memories(importance);
        ",
    )?;

    match get_schema_version(conn)? {
        Some(found) if found > SCHEMA_VERSION => {
            return Err(StoreError::InvalidData(format!(
                "database schema version {found} is newer than supported version {SCHEMA_VERSION}"
            )));
        }
        _ => {}
    }

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    tracing::debug!(version = SCHEMA_VERSION, "schema initialized");
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .optional()?;
    Ok(version)
}
