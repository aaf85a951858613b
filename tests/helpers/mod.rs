#![allow(dead_code)]

use async_trait::async_trait;
use revdict::db;
use revdict::dictionary::store::{add_entry, AddEntryResult};
use revdict::dictionary::types::{Entry, Feature, Model, NewEntry, Vector};
use revdict::embedding::{Completer, Embedder};
use revdict::error::{Error, Result};
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// A 2-d unit vector whose cosine distance from `[1, 0]` is exactly `distance`.
pub fn at_distance(distance: f32) -> Vec<f32> {
    let cos = 1.0 - distance;
    vec![cos, (1.0 - cos * cos).max(0.0).sqrt()]
}

/// The reference query vector for [`at_distance`].
pub fn query_vector() -> Vector {
    Vector::new(vec![1.0, 0.0])
}

/// Deterministic `dim`-dimensional embedding with a spike at position `seed`.
pub fn spike(dim: usize, seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    v[seed % dim] = 1.0;
    v
}

pub fn entry(text: &str, definition: &str) -> Entry {
    Entry {
        text: text.into(),
        definition: definition.into(),
        example: String::new(),
        author: None,
    }
}

/// Store `text` with one verbatim feature per `(phrase, vector)` under `model`.
pub fn insert_entry(
    conn: &mut Connection,
    text: &str,
    model: Model,
    features: &[(&str, Vec<f32>)],
) -> AddEntryResult {
    let definition = features
        .iter()
        .map(|(phrase, _)| *phrase)
        .collect::<Vec<_>>()
        .join("\n");
    add_entry(
        conn,
        &NewEntry {
            entry: entry(text, &definition),
            features: features
                .iter()
                .map(|(phrase, v)| Feature::new(*phrase, false).with_embedding(model, v.clone()))
                .collect(),
        },
    )
    .unwrap()
}

/// Embeds a phrase as a bag of keywords: one dimension per keyword, set when the
/// phrase mentions it, plus a small constant so no vector is all zeros.
pub struct KeywordEmbedder {
    pub model: Model,
    pub keywords: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(model: Model, keywords: &[&'static str]) -> Self {
        Self {
            model,
            keywords: keywords.to_vec(),
        }
    }

    pub fn vector(&self, phrase: &str) -> Vector {
        let lower = phrase.to_lowercase();
        let mut v: Vec<f32> = self
            .keywords
            .iter()
            .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
            .collect();
        v.push(0.01);
        Vector::new(v)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn model(&self) -> Model {
        self.model
    }

    async fn embed(&self, _cancel: &CancellationToken, phrases: &[String]) -> Result<Vec<Vector>> {
        Ok(phrases.iter().map(|p| self.vector(p)).collect())
    }
}

/// Always fails with a provider error.
pub struct BrokenEmbedder(pub Model);

#[async_trait]
impl Embedder for BrokenEmbedder {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn model(&self) -> Model {
        self.0
    }

    async fn embed(&self, _cancel: &CancellationToken, _phrases: &[String]) -> Result<Vec<Vector>> {
        Err(Error::provider("broken", "status 503 Service Unavailable"))
    }
}

/// Replies with a fixed completion.
pub struct CannedCompleter(pub &'static str);

#[async_trait]
impl Completer for CannedCompleter {
    async fn complete(
        &self,
        _cancel: &CancellationToken,
        _system_prompt: &str,
        _user_content: &str,
    ) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}
