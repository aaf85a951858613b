//! Error taxonomy shared by the embedding providers and the entry store.
//!
//! Providers and the store never retry. Every failure is wrapped with enough
//! context to tell which provider or which SQL operation produced it, and
//! [`Error::is_not_found`] separates "nothing matched" from hard faults.

use thiserror::Error;

use crate::dictionary::types::Model;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The provider could not be reached (connect failure, timeout, broken body).
    #[error("{provider} transport error: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered, but with something unusable.
    #[error("{provider} returned an unusable response: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("store error while {context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no definitions found in rephrased output")]
    NoDefinitionsExtracted,

    #[error("no embedding returned for the query by model {0}")]
    EmptyEmbedding(Model),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// `true` for conditions a caller may treat as an empty result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Attach an operation label to a raw `rusqlite` failure.
pub trait StoreContext<T> {
    fn store_context(self, context: &'static str) -> Result<T>;
}

impl<T> StoreContext<T> for rusqlite::Result<T> {
    fn store_context(self, context: &'static str) -> Result<T> {
        self.map_err(|source| Error::Store { context, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_context_wraps_sqlite_errors() {
        let raw: rusqlite::Result<()> = Err(rusqlite::Error::QueryReturnedNoRows);
        let err = raw.store_context("looking up entry").unwrap_err();
        assert!(matches!(err, Error::Store { context: "looking up entry", .. }));
        assert!(err.to_string().contains("looking up entry"));
    }

    #[test]
    fn not_found_is_soft() {
        assert!(Error::NotFound("no matching definitions".into()).is_not_found());
        assert!(!Error::Cancelled.is_not_found());
        assert!(!Error::provider("swama", "empty").is_not_found());
    }
}
