//! Core dictionary type definitions.
//!
//! Defines [`Model`] (the embedding backends), [`Vector`] (a single-precision
//! embedding), [`Entry`] (a word and its definition), [`Feature`] (an
//! independently embedded sub-phrase) and the row shapes returned by queries.

use std::collections::BTreeMap;
use std::ops::Deref;

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Embedding backends. Vectors from different models are never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Model {
    /// Qwen3 8B embedding model served by the local swama server.
    Qwen3Embedding8B4BitDwq,
    /// Apple's NL contextual embedding.
    AppleNlContextualEmbedding,
    /// OpenAI `text-embedding-3-large`.
    OpenAiTextEmbedding3Large,
}

impl Model {
    pub const ALL: [Model; 3] = [
        Model::Qwen3Embedding8B4BitDwq,
        Model::AppleNlContextualEmbedding,
        Model::OpenAiTextEmbedding3Large,
    ];

    /// Stable numeric identifier stored in `embeddings.model_id`.
    pub fn id(self) -> i64 {
        match self {
            Self::Qwen3Embedding8B4BitDwq => 1,
            Self::AppleNlContextualEmbedding => 2,
            Self::OpenAiTextEmbedding3Large => 3,
        }
    }

    pub fn from_id(id: i64) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|model| model.id() == id)
            .ok_or_else(|| Error::UnknownModel(id.to_string()))
    }

    /// Canonical model name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qwen3Embedding8B4BitDwq => "mlx-community/Qwen3-Embedding-8B-4bit-DWQ",
            Self::AppleNlContextualEmbedding => "apple/nlcontextualembedding",
            Self::OpenAiTextEmbedding3Large => "openai/text-embedding-3-large",
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| Error::UnknownModel(s.to_string()))
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for Model {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.id()))
    }
}

/// A single-precision embedding vector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector(Vec<f32>);

impl Vector {
    pub fn new(components: Vec<f32>) -> Self {
        Self(components)
    }

    /// Narrow double-precision provider output to `f32`.
    pub fn from_f64(components: &[f64]) -> Self {
        Self(components.iter().map(|&v| v as f32).collect())
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Raw native-endian f32 bytes, the encoding sqlite-vec reads for float32 vectors.
    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(
                self.0.as_ptr() as *const u8,
                self.0.len() * std::mem::size_of::<f32>(),
            )
        }
    }
}

impl Vector {
    /// Decode native-endian f32 bytes as written by [`Vector::as_bytes`].
    /// `None` unless the length is a multiple of four.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % 4 != 0 {
            return None;
        }
        Some(Self(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ))
    }
}

impl Deref for Vector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for Vector {
    fn from(components: Vec<f32>) -> Self {
        Self(components)
    }
}

impl From<Vec<f64>> for Vector {
    fn from(components: Vec<f64>) -> Self {
        Self::from_f64(&components)
    }
}

impl ToSql for Vector {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Blob(self.as_bytes())))
    }
}

/// A dictionary entry. Identity is `(text, definition)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The word or phrase being defined.
    #[serde(alias = "word")]
    pub text: String,
    /// Full definition text, possibly multi-line.
    pub definition: String,
    /// Usage example. Empty when the source had none.
    #[serde(default)]
    pub example: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// An entry as stored, with its row identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: i64,
    #[serde(flatten)]
    pub entry: Entry,
}

/// A sub-phrase of an entry, embedded independently under each model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub phrase: String,
    /// `true` when derived mechanically (split or rephrased) rather than supplied verbatim.
    #[serde(default)]
    pub autogenerated: bool,
    #[serde(default)]
    pub embeddings: BTreeMap<Model, Vector>,
}

impl Feature {
    pub fn new(phrase: impl Into<String>, autogenerated: bool) -> Self {
        Self {
            phrase: phrase.into(),
            autogenerated,
            embeddings: BTreeMap::new(),
        }
    }

    pub fn with_embedding(mut self, model: Model, vector: impl Into<Vector>) -> Self {
        self.embeddings.insert(model, vector.into());
        self
    }
}

/// Input to the write path: an entry plus all of its features and their vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    #[serde(flatten)]
    pub entry: Entry,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// One row of a nearest-neighbour ranking: the entry, the sub-phrase that
/// matched best, and its cosine distance from the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarEntry {
    #[serde(flatten)]
    pub entry: Entry,
    pub phrase: String,
    pub distance: f64,
}
