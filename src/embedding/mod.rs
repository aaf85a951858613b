//! Text-to-vector embedding providers.
//!
//! Provides the [`Embedder`] trait (one backend, one [`Model`]), the
//! [`Completer`] trait used for rephrasing, and the [`Embedders`] registry that
//! fans a phrase set out to every configured backend. Providers are resolved
//! once from configuration via [`create_embedders`] and [`create_completer`].

pub mod openai;
pub mod ratelimit;
pub mod swama;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cancel::or_cancelled;
use crate::config::RevdictConfig;
use crate::dictionary::types::{Model, Vector};
use crate::error::{Error, Result};

/// One embedding backend.
///
/// `embed` returns exactly one vector per phrase, in input order. Zero phrases
/// or an empty phrase is a caller error.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name used in errors and logs.
    fn name(&self) -> &'static str;

    fn model(&self) -> Model;

    async fn embed(&self, cancel: &CancellationToken, phrases: &[String]) -> Result<Vec<Vector>>;
}

/// Chat-style text completion, used to paraphrase definitions.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        cancel: &CancellationToken,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String>;
}

/// Reject requests a provider must never see.
pub(crate) fn ensure_phrases(phrases: &[String]) -> Result<()> {
    if phrases.is_empty() {
        return Err(Error::InvalidInput("no phrases to embed".into()));
    }
    if let Some(i) = phrases.iter().position(|p| p.trim().is_empty()) {
        return Err(Error::InvalidInput(format!("phrase {i} is empty")));
    }
    Ok(())
}

/// Check that a provider answered one vector per phrase.
pub(crate) fn ensure_count(provider: &'static str, expected: usize, got: usize) -> Result<()> {
    if got == 0 {
        return Err(Error::provider(provider, "response contained no embeddings"));
    }
    if got != expected {
        return Err(Error::provider(
            provider,
            format!("expected {expected} embeddings, got {got}"),
        ));
    }
    Ok(())
}

/// Send a prepared request and decode a JSON response, racing `cancel`.
///
/// Connection failures and timeouts are `Transport`; non-success statuses and
/// undecodable bodies are `Provider`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &'static str,
    cancel: &CancellationToken,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    or_cancelled(cancel, async {
        let response = request
            .send()
            .await
            .map_err(|source| Error::Transport { provider, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(provider, format!("status {status}: {body}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| Error::Transport { provider, source })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::provider(provider, format!("undecodable response: {e}")))
    })
    .await
}

/// Registry of embedding backends keyed by the model they produce.
#[derive(Clone, Default)]
pub struct Embedders {
    providers: BTreeMap<Model, Arc<dyn Embedder>>,
}

impl Embedders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `embedder` under its model, replacing any previous one.
    pub fn insert(&mut self, embedder: Arc<dyn Embedder>) {
        self.providers.insert(embedder.model(), embedder);
    }

    pub fn with(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.insert(embedder);
        self
    }

    pub fn get(&self, model: Model) -> Option<&Arc<dyn Embedder>> {
        self.providers.get(&model)
    }

    pub fn models(&self) -> impl Iterator<Item = Model> + '_ {
        self.providers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Embed `phrases` with every registered backend in parallel.
    ///
    /// All-or-nothing: the first provider failure fails the whole call and the
    /// remaining requests are aborted.
    pub async fn embed(
        &self,
        cancel: &CancellationToken,
        phrases: &[String],
    ) -> Result<BTreeMap<Model, Vec<Vector>>> {
        ensure_phrases(phrases)?;

        let phrases: Arc<[String]> = phrases.into();
        let mut tasks = JoinSet::new();
        for (&model, embedder) in &self.providers {
            let embedder = Arc::clone(embedder);
            let phrases = Arc::clone(&phrases);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let vectors = embedder.embed(&cancel, &phrases).await?;
                ensure_count(embedder.name(), phrases.len(), vectors.len())?;
                Ok::<_, Error>((model, vectors))
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (model, vectors) = match joined {
                Ok(result) => result?,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => return Err(Error::Cancelled),
            };
            debug!(model = %model, count = vectors.len(), "embedded phrases");
            results.insert(model, vectors);
        }
        Ok(results)
    }
}

/// Build the registry from config. Disabled providers are skipped.
pub fn create_embedders(config: &RevdictConfig) -> anyhow::Result<Embedders> {
    let mut embedders = Embedders::new();

    if config.swama.enabled {
        let client = Arc::new(swama::SwamaClient::new(&config.swama)?);
        embedders.insert(Arc::new(swama::SwamaEmbedder::new(
            client,
            Model::Qwen3Embedding8B4BitDwq,
        )));
    }

    if config.openai.enabled {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            anyhow::anyhow!("openai provider is enabled but OPENAI_API_KEY is not set")
        })?;
        embedders.insert(Arc::new(openai::OpenAiEmbedder::new(&config.openai, api_key)?));
    }

    anyhow::ensure!(
        !embedders.is_empty(),
        "no embedding providers enabled; enable [swama] or [openai] in the config"
    );

    let models: Vec<String> = embedders.models().map(|m| m.to_string()).collect();
    info!(models = ?models, "embedding providers ready");
    Ok(embedders)
}

/// The completion backend for rephrasing, if one is configured.
pub fn create_completer(config: &RevdictConfig) -> anyhow::Result<Option<Arc<dyn Completer>>> {
    if !config.swama.enabled {
        return Ok(None);
    }
    let client = swama::SwamaClient::new(&config.swama)?;
    Ok(Some(Arc::new(client)))
}
