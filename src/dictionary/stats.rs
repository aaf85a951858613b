use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::dictionary::types::Model;
use crate::error::{Result, StoreContext};

/// Response from [`dictionary_stats`].
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_entries: u64,
    pub total_features: u64,
    pub verbatim_features: u64,
    pub autogenerated_features: u64,
    /// Stored vectors per model. Every known model is present, possibly with 0.
    pub embeddings_by_model: BTreeMap<Model, u64>,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_entry: Option<String>,
}

/// Compute dictionary statistics.
///
/// `db_path` is used for file size calculation; pass None for in-memory databases.
pub fn dictionary_stats(conn: &Connection, db_path: Option<&Path>) -> Result<StatsResponse> {
    let total_entries: i64 = conn
        .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
        .store_context("counting entries")?;

    let (total_features, autogenerated): (i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), COALESCE(SUM(autogenerated), 0) FROM features",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .store_context("counting features")?;

    let embeddings_by_model = count_by_model(conn)?;

    let (oldest_entry, newest_entry): (Option<String>, Option<String>) = conn
        .query_row("SELECT MIN(created_at), MAX(created_at) FROM entries", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .store_context("reading entry time range")?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StatsResponse {
        total_entries: total_entries as u64,
        total_features: total_features as u64,
        verbatim_features: (total_features - autogenerated) as u64,
        autogenerated_features: autogenerated as u64,
        embeddings_by_model,
        db_size_bytes,
        oldest_entry,
        newest_entry,
    })
}

fn count_by_model(conn: &Connection) -> Result<BTreeMap<Model, u64>> {
    let mut map: BTreeMap<Model, u64> = Model::ALL.into_iter().map(|m| (m, 0)).collect();

    let mut stmt = conn
        .prepare("SELECT model_id, COUNT(*) FROM embeddings GROUP BY model_id")
        .store_context("preparing embedding count")?;
    let rows: Vec<(i64, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .store_context("counting embeddings")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .store_context("scanning embedding counts")?;

    for (model_id, count) in rows {
        map.insert(Model::from_id(model_id)?, count as u64);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::dictionary::store::add_entry;
    use crate::dictionary::types::{Entry, Feature, NewEntry};

    #[test]
    fn empty_store_has_zero_counts() {
        let conn = db::open_memory_database().unwrap();
        let stats = dictionary_stats(&conn, None).unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_features, 0);
        assert_eq!(stats.embeddings_by_model.len(), Model::ALL.len());
        assert!(stats.embeddings_by_model.values().all(|&c| c == 0));
        assert!(stats.oldest_entry.is_none());
    }

    #[test]
    fn counts_features_and_vectors_per_model() {
        let mut conn = db::open_memory_database().unwrap();
        add_entry(
            &mut conn,
            &NewEntry {
                entry: Entry {
                    text: "w".into(),
                    definition: "one\ntwo".into(),
                    example: String::new(),
                    author: None,
                },
                features: vec![
                    Feature::new("one", true)
                        .with_embedding(Model::Qwen3Embedding8B4BitDwq, vec![1.0f32, 0.0])
                        .with_embedding(Model::OpenAiTextEmbedding3Large, vec![1.0f32, 0.0]),
                    Feature::new("w verbatim", false)
                        .with_embedding(Model::Qwen3Embedding8B4BitDwq, vec![0.0f32, 1.0]),
                ],
            },
        )
        .unwrap();

        let stats = dictionary_stats(&conn, None).unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_features, 2);
        assert_eq!(stats.autogenerated_features, 1);
        assert_eq!(stats.verbatim_features, 1);
        assert_eq!(stats.embeddings_by_model[&Model::Qwen3Embedding8B4BitDwq], 2);
        assert_eq!(stats.embeddings_by_model[&Model::OpenAiTextEmbedding3Large], 1);
        assert_eq!(stats.embeddings_by_model[&Model::AppleNlContextualEmbedding], 0);
    }
}
