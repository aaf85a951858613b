//! Read utilities: random sampling, full-table iteration and feature readback.

use std::collections::{BTreeMap, VecDeque};
use std::iter::FusedIterator;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::dictionary::types::{Entry, Feature, Model, StoredEntry, Vector};
use crate::error::{Result, StoreContext};

/// Rows fetched per round trip by [`Entries`].
pub const ENTRY_PAGE_SIZE: usize = 64;

fn stored_entry_from_row(row: &Row<'_>) -> rusqlite::Result<StoredEntry> {
    Ok(StoredEntry {
        id: row.get(0)?,
        entry: Entry {
            text: row.get(1)?,
            definition: row.get(2)?,
            example: row.get(3)?,
            author: row.get(4)?,
        },
    })
}

/// A uniformly sampled entry, or `None` when the store is empty.
pub fn random_entry(conn: &Connection) -> Result<Option<StoredEntry>> {
    conn.query_row(
        "SELECT id, text, definition, example, author FROM entries ORDER BY RANDOM() LIMIT 1",
        [],
        stored_entry_from_row,
    )
    .optional()
    .store_context("querying random entry")
}

pub fn entry_by_id(conn: &Connection, id: i64) -> Result<Option<StoredEntry>> {
    conn.query_row(
        "SELECT id, text, definition, example, author FROM entries WHERE id = ?1",
        params![id],
        stored_entry_from_row,
    )
    .optional()
    .store_context("querying entry by id")
}

/// Every entry in id order, fetched lazily one page at a time.
pub fn all_entries(conn: &Connection) -> Entries<'_> {
    Entries::with_page_size(conn, ENTRY_PAGE_SIZE)
}

/// Single-pass iterator over the `entries` table.
///
/// Pages are fetched by keyset (`id > last seen`) only when the buffer runs
/// dry, so dropping the iterator early leaves the remaining rows unread. A read
/// failure is yielded once as `Some(Err(_))`, after which the iterator is
/// exhausted.
pub struct Entries<'conn> {
    conn: &'conn Connection,
    page_size: usize,
    after_id: i64,
    buffered: VecDeque<StoredEntry>,
    exhausted: bool,
}

impl<'conn> Entries<'conn> {
    pub fn with_page_size(conn: &'conn Connection, page_size: usize) -> Self {
        Self {
            conn,
            page_size: page_size.max(1),
            after_id: 0,
            buffered: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fetch_page(&mut self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT id, text, definition, example, author FROM entries WHERE id > ?1 ORDER BY id LIMIT ?2",
            )
            .store_context("preparing entry scan")?;

        let page = stmt
            .query_map(params![self.after_id, self.page_size as i64], stored_entry_from_row)
            .store_context("scanning entries")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .store_context("reading entry row")?;

        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.after_id = last.id;
        }
        self.buffered.extend(page);
        Ok(())
    }
}

impl Iterator for Entries<'_> {
    type Item = Result<StoredEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffered.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffered.pop_front().map(Ok)
    }
}

impl FusedIterator for Entries<'_> {}

/// All features of an entry with their stored vectors, in insertion order.
pub fn entry_features(conn: &Connection, entry_id: i64) -> Result<Vec<Feature>> {
    let mut features_stmt = conn
        .prepare_cached("SELECT id, phrase, autogenerated FROM features WHERE entry_id = ?1 ORDER BY id")
        .store_context("preparing feature query")?;

    let rows: Vec<(i64, String, bool)> = features_stmt
        .query_map(params![entry_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .store_context("querying features")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .store_context("scanning feature rows")?;

    let mut embeddings_stmt = conn
        .prepare_cached(
            "SELECT model_id, vector FROM embeddings WHERE feature_id = ?1 ORDER BY model_id",
        )
        .store_context("preparing embeddings query")?;

    let mut features = Vec::with_capacity(rows.len());
    for (feature_id, phrase, autogenerated) in rows {
        let stored: Vec<(i64, Vector)> = embeddings_stmt
            .query_map(params![feature_id], |row| {
                let bytes: Vec<u8> = row.get(1)?;
                let vector = Vector::from_bytes(&bytes).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        Type::Blob,
                        format!("vector blob of {} bytes is not float32", bytes.len()).into(),
                    )
                })?;
                Ok((row.get(0)?, vector))
            })
            .store_context("querying feature embeddings")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .store_context("scanning embedding rows")?;

        let mut embeddings = BTreeMap::new();
        for (model_id, vector) in stored {
            embeddings.insert(Model::from_id(model_id)?, vector);
        }

        features.push(Feature {
            phrase,
            autogenerated,
            embeddings,
        });
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::dictionary::store::add_entry;
    use crate::dictionary::types::NewEntry;

    fn seed(conn: &mut Connection, texts: &[&str]) {
        for text in texts {
            add_entry(
                conn,
                &NewEntry {
                    entry: Entry {
                        text: text.to_string(),
                        definition: format!("meaning of {text}"),
                        example: String::new(),
                        author: None,
                    },
                    features: vec![],
                },
            )
            .unwrap();
        }
    }

    #[test]
    fn random_entry_on_empty_store_is_none() {
        let conn = db::open_memory_database().unwrap();
        assert!(random_entry(&conn).unwrap().is_none());
    }

    #[test]
    fn random_entry_returns_a_stored_entry() {
        let mut conn = db::open_memory_database().unwrap();
        seed(&mut conn, &["alpha", "beta"]);
        let picked = random_entry(&conn).unwrap().unwrap();
        assert!(["alpha", "beta"].contains(&picked.entry.text.as_str()));
    }

    #[test]
    fn all_entries_spans_pages_in_id_order() {
        let mut conn = db::open_memory_database().unwrap();
        seed(&mut conn, &["a", "b", "c", "d", "e"]);

        let texts: Vec<String> = Entries::with_page_size(&conn, 2)
            .map(|e| e.unwrap().entry.text)
            .collect();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn all_entries_supports_early_termination() {
        let mut conn = db::open_memory_database().unwrap();
        seed(&mut conn, &["a", "b", "c"]);

        let mut iter = Entries::with_page_size(&conn, 1);
        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.entry.text, "a");
        // Only the first page has been read.
        assert!(iter.buffered.is_empty());
        assert_eq!(iter.after_id, first.id);
    }

    #[test]
    fn all_entries_on_empty_store_is_empty() {
        let conn = db::open_memory_database().unwrap();
        assert_eq!(all_entries(&conn).count(), 0);
    }

    #[test]
    fn scan_error_is_terminal_element() {
        let conn = db::open_memory_database().unwrap();
        conn.execute_batch("DROP TABLE embeddings; DROP TABLE features; DROP TABLE entries;")
            .unwrap();

        let mut iter = all_entries(&conn);
        assert!(matches!(iter.next(), Some(Err(_))));
        assert!(iter.next().is_none());
    }
}
