//! Write path: entry dedup, feature upsert, embedding upsert.
//!
//! [`add_entry`] is the single entry point. It runs the whole pipeline inside one
//! transaction: reuse or insert the entry by `(text, definition)`, reuse or
//! insert each feature by `(entry, phrase)`, then insert-or-replace every
//! `(feature, model)` vector. Any failure drops the transaction, which rolls
//! back every row written by the call.

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;

use crate::dictionary::types::{Entry, Feature, Model, NewEntry, Vector};
use crate::error::{Error, Result, StoreContext};

/// Result returned from [`add_entry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddEntryResult {
    /// Row id of the stored (or already present) entry.
    pub entry_id: i64,
    /// `false` when an entry with the same text and definition already existed.
    pub created: bool,
    /// Number of features inserted by this call; existing phrases are not counted.
    pub features_added: usize,
    /// Number of `(feature, model)` vectors inserted or replaced.
    pub embeddings_written: usize,
}

/// Full write path: entry lookup/insert → feature lookup/insert → embedding upsert.
///
/// All operations run inside a transaction for atomicity.
pub fn add_entry(conn: &mut Connection, new_entry: &NewEntry) -> Result<AddEntryResult> {
    let tx = conn.transaction().store_context("beginning transaction")?;

    // 1. Entry dedup gate
    let (entry_id, created) = match find_entry(&tx, &new_entry.entry)? {
        Some(id) => (id, false),
        None => (insert_entry(&tx, &new_entry.entry)?, true),
    };

    // 2. Features, then their vectors
    let mut features_added = 0;
    let mut embeddings_written = 0;
    for feature in &new_entry.features {
        let (feature_id, inserted) = upsert_feature(&tx, entry_id, feature)?;
        if inserted {
            features_added += 1;
        }

        for (model, vector) in &feature.embeddings {
            upsert_embedding(&tx, feature_id, *model, vector)?;
            embeddings_written += 1;
        }
    }

    tx.commit().store_context("committing transaction")?;

    tracing::debug!(
        entry_id,
        created,
        features_added,
        embeddings_written,
        "entry stored"
    );

    Ok(AddEntryResult {
        entry_id,
        created,
        features_added,
        embeddings_written,
    })
}

fn find_entry(tx: &Transaction, entry: &Entry) -> Result<Option<i64>> {
    tx.query_row(
        "SELECT id FROM entries WHERE text = ?1 AND definition = ?2",
        params![entry.text, entry.definition],
        |row| row.get(0),
    )
    .optional()
    .store_context("querying entry")
}

fn insert_entry(tx: &Transaction, entry: &Entry) -> Result<i64> {
    let now = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO entries (text, definition, example, author, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![entry.text, entry.definition, entry.example, entry.author, now],
    )
    .store_context("inserting entry")?;

    Ok(tx.last_insert_rowid())
}

/// Reuse the feature id for `(entry_id, phrase)` if present, else insert it.
/// Returns `(feature_id, inserted)`.
fn upsert_feature(tx: &Transaction, entry_id: i64, feature: &Feature) -> Result<(i64, bool)> {
    if feature.phrase.trim().is_empty() {
        return Err(Error::InvalidInput(format!(
            "entry {entry_id} has a feature with an empty phrase"
        )));
    }

    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM features WHERE entry_id = ?1 AND phrase = ?2",
            params![entry_id, feature.phrase],
            |row| row.get(0),
        )
        .optional()
        .store_context("querying existing feature")?;

    if let Some(id) = existing {
        return Ok((id, false));
    }

    tx.execute(
        "INSERT INTO features (entry_id, phrase, autogenerated) VALUES (?1, ?2, ?3)",
        params![entry_id, feature.phrase, feature.autogenerated],
    )
    .store_context("inserting feature")?;

    Ok((tx.last_insert_rowid(), true))
}

/// Insert a vector, replacing any earlier one for the same feature and model.
fn upsert_embedding(tx: &Transaction, feature_id: i64, model: Model, vector: &Vector) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let mut stmt = tx
        .prepare_cached(
            "INSERT INTO embeddings (feature_id, model_id, vector, updated_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(feature_id, model_id) DO UPDATE SET \
                 vector = excluded.vector, \
                 updated_at = excluded.updated_at",
        )
        .store_context("preparing embedding upsert")?;

    stmt.execute(params![feature_id, model, vector, now])
        .store_context("inserting embedding")?;
    Ok(())
}
