//! Nearest-neighbor ranking over stored embeddings.
//!
//! An entry ranks by its single closest feature under the query model. Vectors
//! from other models are never compared.

use rusqlite::{params, Connection};

use crate::dictionary::types::{Entry, Model, SimilarEntry, Vector};
use crate::error::{Result, StoreContext};

/// Best-feature-per-entry ranking. Every feature embedded under the model is
/// scored against the query; each entry keeps only its closest feature
/// (`rn = 1`). Equal distances fall back to the lowest feature id within an
/// entry and the lowest entry id across entries.
const RELATED_ENTRIES_SQL: &str = r#"
WITH scored AS (
    SELECT
        f.id AS feature_id,
        f.entry_id,
        vec_distance_cosine(e.vector, ?1) AS distance
    FROM embeddings e
    JOIN features f ON f.id = e.feature_id
    WHERE e.model_id = ?2
),
best AS (
    SELECT
        feature_id,
        entry_id,
        distance,
        ROW_NUMBER() OVER (
            PARTITION BY entry_id
            ORDER BY distance ASC, feature_id ASC
        ) AS rn
    FROM scored
)
SELECT en.text, en.definition, en.example, en.author, f.phrase, best.distance
FROM best
JOIN entries en ON en.id = best.entry_id
JOIN features f ON f.id = best.feature_id
WHERE best.rn = 1
ORDER BY best.distance ASC, en.id ASC
LIMIT ?3
"#;

/// Entries whose closest feature under `model` is nearest to `query`, closest first.
///
/// Only vectors tagged with `model` are considered. Returns an empty list when
/// the model has no stored vectors.
pub fn related_entries(
    conn: &Connection,
    model: Model,
    query: &Vector,
    limit: usize,
) -> Result<Vec<SimilarEntry>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn
        .prepare_cached(RELATED_ENTRIES_SQL)
        .store_context("preparing ranking query")?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let results = stmt
        .query_map(params![query, model, limit], |row| {
            Ok(SimilarEntry {
                entry: Entry {
                    text: row.get(0)?,
                    definition: row.get(1)?,
                    example: row.get(2)?,
                    author: row.get(3)?,
                },
                phrase: row.get(4)?,
                distance: row.get(5)?,
            })
        })
        .store_context("running ranking query")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .store_context("scanning ranking rows")?;

    tracing::debug!(model = %model, results = results.len(), "related entries ranked");
    Ok(results)
}

/// Cosine distance between two vectors, computed by sqlite-vec.
pub fn compare_embeddings(conn: &Connection, a: &Vector, b: &Vector) -> Result<f64> {
    conn.query_row("SELECT vec_distance_cosine(?1, ?2)", params![a, b], |row| row.get(0))
        .store_context("comparing embeddings")
}
