//! Local inference server provider (swama).
//!
//! Speaks the OpenAI-compatible `/v1/embeddings` and `/v1/chat/completions`
//! routes. One [`SwamaClient`] holds the HTTP client and is shared by the
//! embedder and the completer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ensure_count, ensure_phrases, send_json, Completer, Embedder};
use crate::config::SwamaConfig;
use crate::dictionary::types::{Model, Vector};
use crate::error::{Error, Result};

const PROVIDER: &str = "swama";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// HTTP client for one swama server.
pub struct SwamaClient {
    http: reqwest::Client,
    endpoint: String,
    completion_model: String,
    temperature: f32,
    max_tokens: u32,
}

impl SwamaClient {
    pub fn new(config: &SwamaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| Error::Transport {
                provider: PROVIDER,
                source,
            })?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            completion_model: config.completion_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.endpoint)
    }

    async fn embeddings(
        &self,
        cancel: &CancellationToken,
        model: Model,
        phrases: &[String],
    ) -> Result<Vec<Vector>> {
        ensure_phrases(phrases)?;

        let request = EmbeddingRequest {
            model: model.as_str(),
            input: phrases,
        };
        debug!(model = %model, count = phrases.len(), "swama embedding request");

        let response: EmbeddingResponse = send_json(
            PROVIDER,
            cancel,
            self.http.post(self.url("/v1/embeddings")).json(&request),
        )
        .await?;

        ensure_count(PROVIDER, phrases.len(), response.data.len())?;
        if let Some(usage) = &response.usage {
            debug!(tokens = usage.total_tokens, "swama embedding usage");
        }

        Ok(response
            .data
            .into_iter()
            .map(|d| Vector::from_f64(&d.embedding))
            .collect())
    }
}

#[async_trait]
impl Completer for SwamaClient {
    async fn complete(
        &self,
        cancel: &CancellationToken,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String> {
        let request = CompletionRequest {
            model: &self.completion_model,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system_prompt.into(),
                },
                Message {
                    role: "user".into(),
                    content: user_content.into(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(model = %self.completion_model, "swama completion request");

        let response: CompletionResponse = send_json(
            PROVIDER,
            cancel,
            self.http
                .post(self.url("/v1/chat/completions"))
                .json(&request),
        )
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::provider(PROVIDER, "completion returned no choices"))
    }
}

/// Embeds through a shared [`SwamaClient`] with one served model.
pub struct SwamaEmbedder {
    client: Arc<SwamaClient>,
    model: Model,
}

impl SwamaEmbedder {
    pub fn new(client: Arc<SwamaClient>, model: Model) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl Embedder for SwamaEmbedder {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> Model {
        self.model
    }

    async fn embed(&self, cancel: &CancellationToken, phrases: &[String]) -> Result<Vec<Vector>> {
        self.client.embeddings(cancel, self.model, phrases).await
    }
}
