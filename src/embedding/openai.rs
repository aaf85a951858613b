//! OpenAI embeddings provider.
//!
//! Every request first takes a slot from a [`RateLimiter`], so bursts degrade
//! to the configured rate instead of tripping the API's 429s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ratelimit::RateLimiter;
use super::{ensure_count, ensure_phrases, send_json, Embedder};
use crate::config::OpenAiConfig;
use crate::dictionary::types::{Model, Vector};
use crate::error::{Error, Result};

const PROVIDER: &str = "openai";

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    input: &'a [String],
    model: &'a str,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f64>,
    #[serde(default)]
    index: usize,
}

pub struct OpenAiEmbedder {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    limiter: RateLimiter,
}

impl OpenAiEmbedder {
    pub fn new(config: &OpenAiConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::InvalidInput("OpenAI API key is required".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| Error::Transport {
                provider: PROVIDER,
                source,
            })?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            limiter: RateLimiter::new(config.rate_interval(), config.burst),
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> Model {
        Model::OpenAiTextEmbedding3Large
    }

    async fn embed(&self, cancel: &CancellationToken, phrases: &[String]) -> Result<Vec<Vector>> {
        ensure_phrases(phrases)?;
        self.limiter.wait(cancel).await?;

        let request = OpenAiRequest {
            input: phrases,
            model: &self.model,
            encoding_format: "float",
        };
        debug!(model = %self.model, count = phrases.len(), "openai embedding request");

        let mut response: OpenAiResponse = send_json(
            PROVIDER,
            cancel,
            self.http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request),
        )
        .await?;

        ensure_count(PROVIDER, phrases.len(), response.data.len())?;
        response.data.sort_by_key(|d| d.index);

        Ok(response
            .data
            .into_iter()
            .map(|d| Vector::from_f64(&d.embedding))
            .collect())
    }
}
