//! Forward-only schema upgrades.
//!
//! `schema_meta.schema_version` records the last applied step. Each step in
//! [`MIGRATIONS`] runs in its own transaction together with the version bump,
//! so an interrupted upgrade resumes from the last committed step.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, warn};

/// One upgrade step: the version it produces and the SQL that gets there.
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Ordered upgrade steps. Version 1 is the base schema from `init_schema`.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 2,
    name: "index embeddings by model",
    sql: "CREATE INDEX IF NOT EXISTS idx_embeddings_model ON embeddings(model_id, feature_id);",
}];

/// Schema version this build writes.
pub const CURRENT_SCHEMA_VERSION: u32 = MIGRATIONS[MIGRATIONS.len() - 1].version;

/// Stored schema version. A missing or unparseable value reads as 0.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(stored.and_then(|v| v.parse().ok()).unwrap_or(0))
}

/// Apply every step newer than the stored version.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    let stored = get_schema_version(conn)?;
    if stored > CURRENT_SCHEMA_VERSION {
        warn!(stored, known = CURRENT_SCHEMA_VERSION, "database schema is newer than this build");
        return Ok(());
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > stored).collect();
    debug!(stored, pending = pending.len(), "checking migrations");

    for step in pending {
        info!(version = step.version, name = step.name, "applying migration");
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.execute(
            "INSERT OR REPLACE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
            [step.version.to_string()],
        )?;
        tx.commit()?;
    }
    Ok(())
}
