//! Search and ingest over the embedder registry and the entry store.

use std::collections::{BTreeMap, HashSet};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::dictionary::split::definition_features;
use crate::dictionary::store::AddEntryResult;
use crate::dictionary::types::{Entry, Feature, Model, NewEntry, SimilarEntry, StoredEntry, Vector};
use crate::dictionary::EntryStore;
use crate::embedding::{Completer, Embedders};
use crate::error::{Error, Result};
use crate::rephrase::rephrase_definition;

/// Per-model ranked matches for one query.
pub type SearchResults = BTreeMap<Model, Vec<SimilarEntry>>;

#[derive(Clone)]
pub struct ReverseDictionary {
    embedders: Embedders,
    store: EntryStore,
    search: SearchConfig,
}

impl ReverseDictionary {
    pub fn new(embedders: Embedders, store: EntryStore, search: SearchConfig) -> Self {
        Self {
            embedders,
            store,
            search,
        }
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn embedders(&self) -> &Embedders {
        &self.embedders
    }

    /// Rank entries against `query` under every registered model.
    ///
    /// Models with no matches map to an empty list. Fails with `NotFound` only
    /// when no model matched anything.
    pub async fn search(
        &self,
        cancel: &CancellationToken,
        query: &str,
        limit: Option<usize>,
    ) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query is empty".into()));
        }
        let limit = self.search.clamp_limit(limit);

        let embedded = self.embedders.embed(cancel, &[query.to_string()]).await?;

        let mut results = SearchResults::new();
        for (model, vectors) in embedded {
            let vector = first_vector(model, vectors)?;
            let matches = self
                .store
                .related_entries(cancel, model, vector, limit)
                .await?;
            debug!(model = %model, matches = matches.len(), "ranked entries");
            results.insert(model, matches);
        }

        if results.values().all(Vec::is_empty) {
            return Err(Error::NotFound(format!("no entries match {query:?}")));
        }
        Ok(results)
    }

    /// Split, optionally rephrase, embed and store one entry.
    pub async fn ingest(
        &self,
        cancel: &CancellationToken,
        entry: Entry,
        completer: Option<&dyn Completer>,
    ) -> Result<AddEntryResult> {
        if entry.text.trim().is_empty() {
            return Err(Error::InvalidInput("entry text is empty".into()));
        }
        if entry.definition.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "definition of {:?} is empty",
                entry.text
            )));
        }

        let mut features = definition_features(&entry.definition);
        if let Some(completer) = completer {
            let sentences = rephrase_definition(completer, cancel, &entry).await?;
            features.extend(sentences.into_iter().map(|s| Feature::new(s, true)));
        }
        let mut features = dedup_features(features);

        let phrases: Vec<String> = features.iter().map(|f| f.phrase.clone()).collect();
        let embedded = self.embedders.embed(cancel, &phrases).await?;
        // The registry has already checked one vector per phrase.
        for (model, vectors) in embedded {
            for (feature, vector) in features.iter_mut().zip(vectors) {
                feature.embeddings.insert(model, vector);
            }
        }

        let text = entry.text.clone();
        let result = self
            .store
            .add_entry(cancel, NewEntry { entry, features })
            .await?;
        info!(
            word = %text,
            entry_id = result.entry_id,
            created = result.created,
            features_added = result.features_added,
            "ingested entry"
        );
        Ok(result)
    }

    /// Embed one phrase under every model.
    pub async fn embed_phrase(
        &self,
        cancel: &CancellationToken,
        phrase: &str,
    ) -> Result<BTreeMap<Model, Vector>> {
        let embedded = self.embedders.embed(cancel, &[phrase.to_string()]).await?;
        embedded
            .into_iter()
            .map(|(model, vectors)| Ok((model, first_vector(model, vectors)?)))
            .collect()
    }

    /// Cosine distance between two phrases under every model.
    pub async fn compare(
        &self,
        cancel: &CancellationToken,
        a: &str,
        b: &str,
    ) -> Result<BTreeMap<Model, f64>> {
        let embedded = self
            .embedders
            .embed(cancel, &[a.to_string(), b.to_string()])
            .await?;

        let mut distances = BTreeMap::new();
        for (model, vectors) in embedded {
            let mut vectors = vectors.into_iter();
            let (Some(va), Some(vb)) = (vectors.next(), vectors.next()) else {
                return Err(Error::EmptyEmbedding(model));
            };
            let distance = self.store.compare_embeddings(cancel, va, vb).await?;
            distances.insert(model, distance);
        }
        Ok(distances)
    }

    /// A random stored entry, or `NotFound` when the store is empty.
    pub async fn random_entry(&self, cancel: &CancellationToken) -> Result<StoredEntry> {
        self.store
            .random_entry(cancel)
            .await?
            .ok_or_else(|| Error::NotFound("dictionary is empty".into()))
    }
}

fn first_vector(model: Model, vectors: Vec<Vector>) -> Result<Vector> {
    vectors
        .into_iter()
        .next()
        .filter(|v| !v.is_empty())
        .ok_or(Error::EmptyEmbedding(model))
}

/// Drop repeated phrases, keeping the first occurrence.
fn dedup_features(features: Vec<Feature>) -> Vec<Feature> {
    let mut seen = HashSet::new();
    features
        .into_iter()
        .filter(|f| seen.insert(f.phrase.clone()))
        .collect()
}
