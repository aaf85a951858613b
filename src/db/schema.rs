//! SQL DDL for all dictionary tables.
//!
//! Defines `entries`, `features`, `embeddings` and `schema_meta`. Vectors are
//! stored as plain BLOBs in sqlite-vec's float32 encoding and compared with
//! `vec_distance_cosine`, so one table can hold vectors of any dimension for
//! any model. All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Dictionary entries; (text, definition) identifies an entry
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    definition TEXT NOT NULL,
    example TEXT NOT NULL DEFAULT '',
    author TEXT,
    created_at TEXT NOT NULL,
    UNIQUE(text, definition)
);

-- Independently embedded sub-phrases of an entry
CREATE TABLE IF NOT EXISTS features (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    phrase TEXT NOT NULL CHECK(length(phrase) > 0),
    autogenerated INTEGER NOT NULL DEFAULT 0 CHECK(autogenerated IN (0, 1)),
    UNIQUE(entry_id, phrase)
);

CREATE INDEX IF NOT EXISTS idx_features_entry ON features(entry_id);

-- Latest vector per feature per model
CREATE TABLE IF NOT EXISTS embeddings (
    feature_id INTEGER NOT NULL REFERENCES features(id) ON DELETE CASCADE,
    model_id INTEGER NOT NULL,
    vector BLOB NOT NULL CHECK(length(vector) > 0 AND length(vector) % 4 = 0),
    updated_at TEXT NOT NULL,
    PRIMARY KEY (feature_id, model_id)
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
