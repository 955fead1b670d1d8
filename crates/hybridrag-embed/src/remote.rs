//! HTTP embedding client for Voyage-compatible `/v1/embeddings` endpoints.
//!
//! One POST per chunk of at most `batch_size` texts (hard-capped at
//! [`MAX_BATCH`]). No retries: a failed chunk fails the whole call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use hybridrag_core::config::EmbeddingSettings;
use hybridrag_core::{Embedder, Error, Result};

/// Per-request input cap accepted by the provider.
pub const MAX_BATCH: usize = 1000;

const PROVIDER: &str = "voyage";

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
}

impl RemoteEmbedder {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>, batch_size: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            batch_size: batch_size.clamp(1, MAX_BATCH),
        })
    }

    /// Reads the API key from the environment variable named in the settings.
    /// A missing key is not an error until the first `embed` call.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).ok();
        Self::new(
            settings.base_url.clone(),
            settings.model.clone(),
            api_key,
            settings.batch_size,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn batch_size(&self) -> usize { self.batch_size }

    async fn embed_chunk(&self, api_key: &str, chunk: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&EmbedRequest { model: &self.model, input: chunk })
            .send()
            .await
            .map_err(|e| Error::Transport(format!("embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(PROVIDER, Some(status.as_u16()), body));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("invalid embedding response: {e}")))?;

        let mut data = parsed.data;
        if data.len() != chunk.len() {
            return Err(Error::provider(
                PROVIDER,
                Some(status.as_u16()),
                format!("expected {} embeddings, got {}", chunk.len(), data.len()),
            ));
        }
        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn model_id(&self) -> &str { &self.model }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("embedding API key is not set".to_string()))?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(texts.len());
        for (i, chunk) in texts.chunks(self.batch_size).enumerate() {
            debug!(chunk = i, size = chunk.len(), model = %self.model, "embedding request");
            out.extend(self.embed_chunk(api_key, chunk).await?);
        }
        Ok(out)
    }
}
